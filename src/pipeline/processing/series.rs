use crate::common::types::RawSeriesPosition;

/// Canonical display text for a series position: numbers are stringified, text passes
/// through untouched ("1/1" stays "1/1"). Blank text counts as absent.
pub fn normalize_series_position(position: Option<&RawSeriesPosition>) -> Option<String> {
    match position? {
        RawSeriesPosition::Number(number) => Some(number.to_string()),
        RawSeriesPosition::Text(text) if text.trim().is_empty() => None,
        RawSeriesPosition::Text(text) => Some(text.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn position(value: serde_json::Value) -> RawSeriesPosition {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_numbers_are_stringified() {
        assert_eq!(normalize_series_position(Some(&position(json!(1)))), Some("1".into()));
        assert_eq!(normalize_series_position(Some(&position(json!(2.5)))), Some("2.5".into()));
    }

    #[test]
    fn test_text_passes_through() {
        assert_eq!(
            normalize_series_position(Some(&position(json!("1/1")))),
            Some("1/1".into())
        );
        assert_eq!(
            normalize_series_position(Some(&position(json!("1-3")))),
            Some("1-3".into())
        );
    }

    #[test]
    fn test_absent_and_blank() {
        assert_eq!(normalize_series_position(None), None);
        assert_eq!(normalize_series_position(Some(&position(json!("  ")))), None);
    }
}
