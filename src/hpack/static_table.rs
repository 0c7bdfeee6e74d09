//! The gRPC-canonical static table (spec §4.3): a subset table scoped to the
//! header names/values gRPC actually sends, rather than the full 61-entry
//! RFC 7541 Appendix A table. An empty `value` means "name only" — the
//! entry can still be referenced for a name-only match (literal with
//! indexed name) even though no value is fixed.

pub struct Entry {
    pub name: &'static str,
    pub value: &'static str,
}

pub const TABLE: &[Entry] = &[
    Entry { name: ":authority", value: "" },
    Entry { name: ":method", value: "POST" },
    Entry { name: ":path", value: "" },
    Entry { name: ":scheme", value: "https" },
    Entry { name: "content-type", value: "application/grpc" },
    Entry { name: "grpc-encoding", value: "identity" },
    Entry { name: "grpc-accept-encoding", value: "identity" },
    Entry { name: "te", value: "trailers" },
];

/// 1-indexed lookup, as HPACK/QPACK index their static tables.
pub fn get(index: usize) -> Option<&'static Entry> {
    if index == 0 {
        return None;
    }
    TABLE.get(index - 1)
}

/// Exact `(name, value)` match → its 1-based index.
pub fn find_exact(name: &str, value: &str) -> Option<usize> {
    TABLE
        .iter()
        .position(|e| e.name == name && e.value == value)
        .map(|i| i + 1)
}

/// Name-only match (ignoring value) → its 1-based index, for entries whose
/// value is either empty (no fixed value) or doesn't match.
pub fn find_name(name: &str) -> Option<usize> {
    TABLE.iter().position(|e| e.name == name).map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_entries_present() {
        assert_eq!(find_exact(":method", "POST"), Some(2));
        assert_eq!(find_exact(":scheme", "https"), Some(4));
        assert_eq!(
            find_exact("content-type", "application/grpc"),
            Some(5)
        );
        assert_eq!(find_exact("te", "trailers"), Some(8));
        assert_eq!(find_name(":path"), Some(3));
        assert!(get(0).is_none());
    }
}
