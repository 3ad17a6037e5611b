//! Lenient numeric reads for JSON produced by browsers and language models.

use serde_json::Value;

/// Read a finite number from a JSON number or a numeric string.
///
/// Everything else, including non-finite values, yields `None`.
pub fn finite_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Like [`finite_number`] but missing or unreadable values become `0`.
pub fn number_or_zero(value: Option<&Value>) -> f64 {
    value.and_then(finite_number).unwrap_or(0.0)
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_numbers_and_numeric_strings() {
        assert_eq!(finite_number(&json!(12)), Some(12.0));
        assert_eq!(finite_number(&json!(-0.5)), Some(-0.5));
        assert_eq!(finite_number(&json!(" 3.25 ")), Some(3.25));
    }

    #[test]
    fn rejects_garbage_and_non_finite() {
        assert_eq!(finite_number(&json!("abc")), None);
        assert_eq!(finite_number(&json!("Infinity")), None);
        assert_eq!(finite_number(&json!("NaN")), None);
        assert_eq!(finite_number(&json!(null)), None);
        assert_eq!(finite_number(&json!(true)), None);
        assert_eq!(finite_number(&json!([1])), None);
    }

    #[test]
    fn zero_default() {
        assert_eq!(number_or_zero(None), 0.0);
        assert_eq!(number_or_zero(Some(&json!("abc"))), 0.0);
        assert_eq!(number_or_zero(Some(&json!(7))), 7.0);
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("あたたかい", 2), "あた");
    }
}
