//! `grpc-timeout` header parsing (spec §4.6 "Deadline propagation", §6
//! "Canonical request pseudo-headers"). The header value is a decimal
//! number immediately followed by a single unit character:
//! `H`ours, `M`inutes, `S`econds, `m`illiseconds, `u`microseconds, `n`anoseconds.

use crate::error::{Error, Result};
use crate::headers::Headers;
use std::time::Duration;
use tokio::time::Instant;

pub fn parse_grpc_timeout(value: &str) -> Result<Duration> {
    let (digits, unit) = value.split_at(value.len().saturating_sub(1));
    let amount: u64 = digits
        .parse()
        .map_err(|_| Error::InvalidRequest(format!("malformed grpc-timeout value: {value:?}")))?;
    let duration = match unit {
        "H" => Duration::from_secs(amount.saturating_mul(3600)),
        "M" => Duration::from_secs(amount.saturating_mul(60)),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        other => {
            return Err(Error::InvalidRequest(format!(
                "unknown grpc-timeout unit {other:?}"
            )))
        }
    };
    Ok(duration)
}

/// Resolves the deadline a `RequestContext` should carry: the request's own
/// `grpc-timeout` header wins; otherwise the server's configured
/// `request_timeout_ms` applies; otherwise there is no deadline.
pub fn resolve_deadline(headers: &Headers, request_timeout_ms: Option<u64>) -> Result<Option<Instant>> {
    if let Some(raw) = headers.get("grpc-timeout") {
        let duration = parse_grpc_timeout(raw)?;
        return Ok(Some(Instant::now() + duration));
    }
    Ok(request_timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_grpc_timeout("10S").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_grpc_timeout("250m").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_grpc_timeout("1H").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_grpc_timeout("5n").unwrap(), Duration::from_nanos(5));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_grpc_timeout("10X").is_err());
    }

    #[test]
    fn header_takes_precedence_over_default_timeout() {
        let mut headers = Headers::new();
        headers.push("grpc-timeout", "1S");
        let deadline = resolve_deadline(&headers, Some(60_000)).unwrap().unwrap();
        assert!(deadline <= Instant::now() + Duration::from_secs(2));
    }

    #[test]
    fn falls_back_to_configured_default_when_header_absent() {
        let headers = Headers::new();
        let deadline = resolve_deadline(&headers, Some(5_000)).unwrap();
        assert!(deadline.is_some());
    }

    #[test]
    fn no_deadline_when_neither_is_present() {
        let headers = Headers::new();
        assert!(resolve_deadline(&headers, None).unwrap().is_none());
    }
}
