//! Cross-checks [`rpc_core::hpack::Encoder`] against the real `hpack` crate's
//! decoder, the way the teacher's own `src/hpack.rs` cross-checked its
//! encoder/decoder against `their_hpack` — except this crate's encoder is
//! static-table-only (spec §4.3, §9), so there is no dynamic-table growth to
//! exercise across calls.

use hpack as their_hpack;
use rpc_core::headers::Headers;
use rpc_core::hpack::Encoder;

#[test]
fn encoder_output_decodes_with_the_real_hpack_crate() {
    let mut headers = Headers::new();
    headers.push(":method", "POST");
    headers.push(":scheme", "https");
    headers.push(":path", "/Echo/Say");
    headers.push("content-type", "application/grpc");
    headers.push("grpc-encoding", "identity");
    headers.push("te", "trailers");

    let wire = Encoder::new().encode(&headers);

    let mut their_decoder = their_hpack::Decoder::new();
    let decoded = their_decoder.decode(&wire).unwrap();

    let expected: Vec<(Vec<u8>, Vec<u8>)> = headers
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect();
    assert_eq!(decoded, expected);
}

#[test]
fn encoder_emits_single_byte_indexed_fields_for_exact_static_hits() {
    let mut headers = Headers::new();
    headers.push(":method", "POST");

    let wire = Encoder::new().encode(&headers);
    assert_eq!(wire.len(), 1);
    assert_eq!(wire[0] & 0x80, 0x80);
}
