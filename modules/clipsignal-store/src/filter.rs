//! PostgREST filter value builders.

pub fn eq(value: &str) -> String {
    format!("eq.{value}")
}

pub fn lt(value: &str) -> String {
    format!("lt.{value}")
}

pub fn is_null() -> String {
    "is.null".to_string()
}

pub fn in_list<S: AsRef<str>>(values: &[S]) -> String {
    let joined = values
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

pub fn ilike_contains(token: &str) -> String {
    format!("ilike.*{token}*")
}

/// Range conjunction for the ±window dedup query:
/// `and=(col.gte.low,col.lte.high)`.
pub fn and_range(column: &str, low: u64, high: u64) -> String {
    format!("({column}.gte.{low},{column}.lte.{high})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_list_joins_ids() {
        assert_eq!(in_list(&["a", "b", "c"]), "in.(a,b,c)");
    }

    #[test]
    fn and_range_builds_conjunction() {
        assert_eq!(
            and_range("receipt_timestamp_seconds", 40, 50),
            "(receipt_timestamp_seconds.gte.40,receipt_timestamp_seconds.lte.50)"
        );
    }

    #[test]
    fn eq_and_null_filters() {
        assert_eq!(eq("abc"), "eq.abc");
        assert_eq!(is_null(), "is.null");
        assert_eq!(ilike_contains("50 off"), "ilike.*50 off*");
    }
}
