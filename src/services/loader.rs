//! Reading and validating the reviews document.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::Review;

/// Read `path` and extract its ordered `reviews` list.
pub fn load_reviews(path: &Path, allow_missing: bool) -> Result<Vec<Review>, ValidationError> {
    let input = std::fs::read_to_string(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_reviews(&input, path, allow_missing)
}

/// Parse a reviews document. `path` is only used in error messages.
pub fn parse_reviews(
    input: &str,
    path: &Path,
    allow_missing: bool,
) -> Result<Vec<Review>, ValidationError> {
    let document: Value = serde_json::from_str(input).map_err(|source| ValidationError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut root = match document {
        Value::Object(root) => root,
        other => {
            return Err(ValidationError::NotAnObject {
                path: path.to_path_buf(),
                found: json_type(&other),
            });
        }
    };

    let items = match root.remove("reviews") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ValidationError::NotAList {
                path: path.to_path_buf(),
                found: json_type(&other),
            });
        }
        None if allow_missing => {
            debug!(path = %path.display(), "no 'reviews' key, treating as empty");
            Vec::new()
        }
        None => {
            return Err(ValidationError::MissingReviews {
                path: path.to_path_buf(),
            });
        }
    };

    let reviews = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(ValidationError::InvalidRecord {
                    path: path.to_path_buf(),
                    index,
                    reason: format!("expected an object, found {}", json_type(&item)),
                });
            }
            serde_json::from_value::<Review>(item).map_err(|e| ValidationError::InvalidRecord {
                path: path.to_path_buf(),
                index,
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        path = %path.display(),
        count = reviews.len(),
        preview = ?&reviews[..reviews.len().min(2)],
        "loaded reviews"
    );

    Ok(reviews)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(input: &str) -> Result<Vec<Review>, ValidationError> {
        parse_reviews(input, Path::new("reviews.json"), false)
    }

    #[test]
    fn test_preserves_order_and_fields() {
        let reviews = parse(
            r#"{"reviews": [
                {"professor": "A. Smith", "review": "Great lectures", "subject": "Math", "stars": 5},
                {"professor": "B. Jones", "review": "Hard exams", "subject": "Physics", "stars": 2.5},
                {"review": "No name given", "subject": "Art", "stars": 3}
            ]}"#,
        )
        .unwrap();

        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[0].professor.as_deref(), Some("A. Smith"));
        assert_eq!(reviews[0].stars, 5.0);
        assert_eq!(reviews[1].subject, "Physics");
        assert_eq!(reviews[2].professor, None);
        assert_eq!(reviews[2].record_id(2), "review-2");
    }

    #[test]
    fn test_reviews_not_a_list() {
        let err = parse(r#"{"reviews": {"professor": "A. Smith"}}"#).unwrap_err();
        assert!(matches!(err, ValidationError::NotAList { found: "an object", .. }));

        let err = parse(r#"{"reviews": "none"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::NotAList { found: "a string", .. }));
    }

    #[test]
    fn test_missing_reviews_only_tolerated_when_allowed() {
        assert!(matches!(
            parse(r#"{"professors": []}"#),
            Err(ValidationError::MissingReviews { .. })
        ));
        let reviews = parse_reviews(r#"{"professors": []}"#, Path::new("reviews.json"), true)
            .unwrap();
        assert!(reviews.is_empty());
    }

    #[test]
    fn test_top_level_must_be_object() {
        let err = parse(r#"[{"review": "x"}]"#).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject { found: "an array", .. }));
    }

    #[test]
    fn test_invalid_record_reports_index() {
        let err = parse(
            r#"{"reviews": [
                {"professor": "A", "review": "ok", "subject": "Math", "stars": 4},
                {"professor": "B", "review": "no stars", "subject": "Math"}
            ]}"#,
        )
        .unwrap_err();
        match err {
            ValidationError::InvalidRecord { index, reason, .. } => {
                assert_eq!(index, 1);
                assert!(reason.contains("stars"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parse(r#"{"reviews": [42]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse(r#"{"reviews": ["#),
            Err(ValidationError::Json { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"reviews": [{{"professor": "A. Smith", "review": "Great lectures", "subject": "Math", "stars": 5}}]}}"#
        )
        .unwrap();

        let reviews = load_reviews(file.path(), false).unwrap();
        assert_eq!(reviews.len(), 1);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_reviews(Path::new("does-not-exist/reviews.json"), false).unwrap_err();
        assert!(err.to_string().contains("does-not-exist/reviews.json"));
    }
}
