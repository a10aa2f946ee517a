//! Best-effort recovery of a JSON object from raw model output.
//!
//! Models frequently wrap the requested JSON in prose ("Here is the
//! extraction: ..."). Recovery takes the span from the first `{` to the last
//! `}` and parses it. Braces inside string literals are not specially
//! handled; that is an accepted limitation for typical model output.

use serde_json::Value;

use crate::ExtractError;

/// Extract and parse the JSON object embedded in `response`.
///
/// Fails with [`ExtractError::UnparseableResponse`] carrying the raw text
/// for diagnosis, whether no brace pair exists or the bracketed span is not
/// valid JSON.
pub fn recover_json(response: &str) -> Result<Value, ExtractError> {
    let start = response.find('{');
    let end = response.rfind('}');

    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => {
            return Err(ExtractError::UnparseableResponse {
                raw: response.to_string(),
            })
        }
    };

    let span = &response[start..=end];
    serde_json::from_str(span).map_err(|_| ExtractError::UnparseableResponse {
        raw: response.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_object_parses() {
        let value = recover_json(r#"{"age": 42}"#).unwrap();
        assert_eq!(value["age"], 42);
    }

    #[test]
    fn json_surrounded_by_prose_is_recovered() {
        let response = r#"Sure! Here is the structured report:

{"age": 42, "medications": [{"name": "Keppra"}]}

Let me know if you need anything else."#;
        let value = recover_json(response).unwrap();
        assert_eq!(value["medications"][0]["name"], "Keppra");
    }

    #[test]
    fn recovered_object_round_trips() {
        let response = "prefix {\"a\": {\"b\": [1, 2, 3]}} suffix";
        let value = recover_json(response).unwrap();
        let reparsed: Value = serde_json::from_str(&value.to_string()).unwrap();
        assert_eq!(value, reparsed);
    }

    #[test]
    fn no_braces_is_unparseable() {
        let result = recover_json("I could not find any relevant information.");
        match result {
            Err(ExtractError::UnparseableResponse { raw }) => {
                assert!(raw.contains("relevant information"));
            }
            other => panic!("expected UnparseableResponse, got {other:?}"),
        }
    }

    #[test]
    fn reversed_braces_are_unparseable() {
        let result = recover_json("} nothing here {");
        assert!(matches!(
            result,
            Err(ExtractError::UnparseableResponse { .. })
        ));
    }

    #[test]
    fn malformed_span_preserves_raw_response_text() {
        let response = "Here is the report: {not valid json} hope that helps";
        match recover_json(response) {
            Err(ExtractError::UnparseableResponse { raw }) => assert_eq!(raw, response),
            other => panic!("expected UnparseableResponse, got {other:?}"),
        }
    }
}
