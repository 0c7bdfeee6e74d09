//! gRPC status taxonomy (spec §6) and the handler-error → status mapping
//! (spec §7).

use crate::error::Error;

/// gRPC status codes, a subset of which spec §6 requires the core to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
#[non_exhaustive]
pub enum Status {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Translate a handler error into a gRPC status trailer (spec §7):
/// `InvalidRequest`→INVALID_ARGUMENT, `NotFound`→NOT_FOUND,
/// `Timeout`/`DeadlineExceeded`→DEADLINE_EXCEEDED,
/// `Unauthenticated`→UNAUTHENTICATED, anything else→INTERNAL.
pub fn status_for_error(err: &Error) -> (Status, String) {
    let message = err.to_string();
    let status = match err {
        Error::InvalidRequest(_) | Error::InvalidArgument(_) => Status::InvalidArgument,
        Error::NotFound(_) => Status::NotFound,
        Error::Timeout | Error::DeadlineExceeded => Status::DeadlineExceeded,
        Error::Unauthenticated(_) => Status::Unauthenticated,
        Error::Canceled => Status::Cancelled,
        Error::ResourceExhausted(_) => Status::ResourceExhausted,
        Error::Closed | Error::ConnectionReset | Error::NotConnected => Status::Unavailable,
        _ => Status::Internal,
    };
    (status, message)
}

/// Inverse of [`status_for_error`]: turn a trailer's `grpc-status` code
/// into the taxonomy error a client call fails with (spec §4.7 "If a
/// trailer HEADERS carries `grpc-status` != 0, the call fails with the
/// corresponding taxonomy error").
pub fn error_for_status(code: i32, message: Option<String>) -> Error {
    let message = message.unwrap_or_default();
    match code {
        x if x == Status::Cancelled.code() => Error::Canceled,
        x if x == Status::InvalidArgument.code() => Error::InvalidRequest(message),
        x if x == Status::DeadlineExceeded.code() => Error::DeadlineExceeded,
        x if x == Status::NotFound.code() => Error::NotFound(message),
        x if x == Status::ResourceExhausted.code() => Error::ResourceExhausted(message),
        x if x == Status::Unimplemented.code() => Error::NotFound(message),
        x if x == Status::Unauthenticated.code() => Error::Unauthenticated(message),
        x if x == Status::Unavailable.code() => Error::ConnectionReset,
        _ => Error::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_variants() {
        assert_eq!(
            status_for_error(&Error::NotFound("Foo/Bar".into())).0,
            Status::NotFound
        );
        assert_eq!(status_for_error(&Error::Timeout).0, Status::DeadlineExceeded);
        assert_eq!(
            status_for_error(&Error::Internal("boom".into())).0,
            Status::Internal
        );
    }

    #[test]
    fn error_for_status_round_trips_common_codes() {
        assert!(matches!(
            error_for_status(Status::NotFound.code(), Some("x".into())),
            Error::NotFound(_)
        ));
        assert!(matches!(
            error_for_status(Status::DeadlineExceeded.code(), None),
            Error::DeadlineExceeded
        ));
        assert!(matches!(
            error_for_status(Status::Internal.code(), None),
            Error::Internal(_)
        ));
    }
}
