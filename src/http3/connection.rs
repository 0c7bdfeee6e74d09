//! The HTTP/3 connection (spec §4.4): opens the local control stream,
//! validates the peer's, and multiplexes request streams over the opaque
//! QUIC provider. Grounded in the HTTP/2 `Http2Connection` for shape
//! (reader task, `is_closing`/`connected` flags, `accept_stream` channel)
//! but far lighter — QUIC owns flow control and stream admission, so this
//! layer only owns framing, QPACK, and the control-stream protocol.

use super::frame::{self, H3Frame};
use super::quic::QuicConnectionProvider;
use super::stream::Http3StreamHandle;
use crate::error::{Error, Result};
use crate::spi::{Connection, Stream};
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

pub struct Http3Connection {
    quic: Arc<dyn QuicConnectionProvider>,
    is_closing: AtomicBool,
    next_stream_id: AtomicU64,
    local_control: Mutex<Box<dyn super::quic::QuicStream>>,
}

impl std::fmt::Debug for Http3Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http3Connection").finish()
    }
}

impl Http3Connection {
    pub async fn establish(quic: Arc<dyn QuicConnectionProvider>, role: Role) -> Result<Arc<dyn Connection>> {
        let mut local_control = quic.open_uni_stream().await?;
        let mut header = BytesMut::new();
        header.put_u8(frame::STREAM_TYPE_CONTROL as u8);
        local_control.write(&header).await?;
        local_control.write(&H3Frame::new(frame::FRAME_SETTINGS, frame::encode_settings_payload(&[])).encode()).await?;

        let conn = Arc::new(Http3Connection {
            quic: quic.clone(),
            is_closing: AtomicBool::new(false),
            next_stream_id: AtomicU64::new(if role == Role::Client { 0 } else { 1 }),
            local_control: Mutex::new(local_control),
        });

        spawn_control_stream_reader(conn.clone());
        Ok(conn)
    }
}

fn spawn_control_stream_reader(conn: Arc<Http3Connection>) {
    tokio::spawn(async move {
        let mut control = match conn.quic.accept_uni_stream().await {
            Ok(Some(stream)) => stream,
            _ => return,
        };
        let mut buf = BytesMut::new();
        let mut settings_checked = false;
        loop {
            match H3Frame::try_decode(&buf) {
                Ok(Some((h3, consumed))) => {
                    buf = buf.split_off(consumed);
                    if !settings_checked {
                        if frame::require_settings_first(&h3).is_err() {
                            conn.is_closing.store(true, Ordering::SeqCst);
                            return;
                        }
                        settings_checked = true;
                        continue;
                    }
                    match h3.frame_type {
                        frame::FRAME_GOAWAY => {
                            conn.is_closing.store(true, Ordering::SeqCst);
                            log::info!("received HTTP/3 GOAWAY on control stream");
                        }
                        frame::FRAME_MAX_PUSH_ID => {}
                        _ => {}
                    }
                }
                Ok(None) => {
                    let mut tmp = [0u8; 4096];
                    match control.read(&mut tmp).await {
                        Ok(0) | Err(_) => {
                            conn.is_closing.store(true, Ordering::SeqCst);
                            return;
                        }
                        Ok(n) => buf.extend_from_slice(&tmp[..n]),
                    }
                }
                Err(_) => {
                    conn.is_closing.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    });
}

#[async_trait]
impl Connection for Http3Connection {
    async fn open_stream(&self) -> Result<Box<dyn Stream>> {
        if self.is_closing.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        let quic_stream = self.quic.open_bi_stream().await?;
        let id = self.next_stream_id.fetch_add(4, Ordering::SeqCst);
        Ok(Box::new(Http3StreamHandle::new(id, quic_stream)))
    }

    async fn accept_stream(&self) -> Result<Option<Box<dyn Stream>>> {
        match self.quic.accept_bi_stream().await? {
            Some(quic_stream) => {
                let id = self.next_stream_id.fetch_add(4, Ordering::SeqCst);
                Ok(Some(Box::new(Http3StreamHandle::new(id, quic_stream))))
            }
            None => Ok(None),
        }
    }

    async fn close(&self) {
        self.is_closing.store(true, Ordering::SeqCst);
        self.quic.close(0).await;
    }

    async fn ping(&self) -> Result<()> {
        // RFC 9114 defines no application-level PING; liveness is QUIC's
        // concern beneath the opaque provider.
        if self.quic.is_connected().await {
            Ok(())
        } else {
            Err(Error::ConnectionReset)
        }
    }

    async fn is_connected(&self) -> bool {
        !self.is_closing.load(Ordering::SeqCst) && self.quic.is_connected().await
    }

    async fn go_away(&self) {
        self.is_closing.store(true, Ordering::SeqCst);
        let last = self.next_stream_id.load(Ordering::SeqCst);
        let mut out = BytesMut::new();
        super::varint::encode(&mut out, last);
        let frame = H3Frame::new(frame::FRAME_GOAWAY, out.freeze());
        let mut control = self.local_control.lock().await;
        let _ = control.write(&frame.encode()).await;
    }
}
