//! Oracle response unwrapping
//!
//! Oracle responses are free text: the JSON payload may be wrapped in prose
//! or markdown fences, fields may be missing, and codes sometimes come back
//! as bare numbers. Everything here is best-effort extraction; a response
//! that yields no usable payload becomes [`OracleAnswer::Malformed`] and the
//! caller falls back deterministically.

use serde_json::Value;

/// Fields of a successfully parsed oracle pick, pre-validation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedPick {
    pub code: String,
    pub description: String,
    pub confidence: String,
    pub reasoning: String,
}

/// Three-way result of payload extraction. Validation failures are a
/// separate stage (see `level.rs`); both funnel into the same fallback.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OracleAnswer {
    Pick(ParsedPick),
    Confused { reasoning: String },
    Malformed(String),
}

/// Strip response wrapping and parse the embedded JSON object.
pub(crate) fn extract_payload(response: &str) -> OracleAnswer {
    let mut text = response.trim();

    // Markdown fence stripping, then brace slicing. The brace slice alone
    // would handle fenced output, but leading prose before the fence is
    // common enough to handle both.
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    let text = text.trim();

    let payload = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => return OracleAnswer::Malformed("no JSON object in response".to_string()),
    };

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => return OracleAnswer::Malformed(format!("invalid JSON payload: {e}")),
    };

    let confidence = string_field(&value, "confidence").unwrap_or_default();
    let reasoning = string_field(&value, "reasoning").unwrap_or_default();

    // The sentinel takes priority over everything else: a confused answer
    // often carries no code at all.
    if confidence.trim().eq_ignore_ascii_case("confused") {
        return OracleAnswer::Confused { reasoning };
    }

    let code = match code_field(&value) {
        Some(code) if !code.is_empty() => code,
        _ => return OracleAnswer::Malformed("payload missing 'code' field".to_string()),
    };

    OracleAnswer::Pick(ParsedPick {
        code,
        description: string_field(&value, "description").unwrap_or_default(),
        confidence,
        reasoning,
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

/// Codes should be strings but models occasionally emit bare numbers.
fn code_field(value: &Value) -> Option<String> {
    match value.get("code") {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_json_parses() {
        let answer = extract_payload(
            r#"{"code": "4015", "description": "Industrial pumps", "confidence": "High", "reasoning": "pump keywords"}"#,
        );
        match answer {
            OracleAnswer::Pick(pick) => {
                assert_eq!(pick.code, "4015");
                assert_eq!(pick.description, "Industrial pumps");
                assert_eq!(pick.confidence, "High");
                assert_eq!(pick.reasoning, "pump keywords");
            }
            other => panic!("expected pick, got {other:?}"),
        }
    }

    #[test]
    fn fenced_response_is_unwrapped() {
        let answer = extract_payload(
            "```json\n{\"code\": \"40\", \"description\": \"Distribution\", \"confidence\": \"Medium\"}\n```",
        );
        assert!(matches!(answer, OracleAnswer::Pick(pick) if pick.code == "40"));
    }

    #[test]
    fn surrounding_prose_is_stripped() {
        let answer = extract_payload(
            "Sure! Here is the classification you asked for:\n\n{\"code\": \"401515\", \"confidence\": \"High\"}\n\nLet me know if you need anything else.",
        );
        assert!(matches!(answer, OracleAnswer::Pick(pick) if pick.code == "401515"));
    }

    #[test]
    fn numeric_code_is_coerced_to_string() {
        let answer = extract_payload(r#"{"code": 40, "confidence": "High"}"#);
        assert!(matches!(answer, OracleAnswer::Pick(pick) if pick.code == "40"));
    }

    #[test]
    fn confused_sentinel_wins_even_without_code() {
        let answer =
            extract_payload(r#"{"confidence": "CONFUSED", "reasoning": "several fit equally"}"#);
        assert_eq!(
            answer,
            OracleAnswer::Confused {
                reasoning: "several fit equally".to_string()
            }
        );
    }

    #[test]
    fn empty_response_is_malformed() {
        assert!(matches!(extract_payload(""), OracleAnswer::Malformed(_)));
        assert!(matches!(
            extract_payload("I could not decide."),
            OracleAnswer::Malformed(_)
        ));
    }

    #[test]
    fn missing_code_is_malformed() {
        let answer = extract_payload(r#"{"description": "Pumps", "confidence": "High"}"#);
        assert!(matches!(answer, OracleAnswer::Malformed(_)));
    }

    #[test]
    fn truncated_json_is_malformed() {
        let answer = extract_payload(r#"{"code": "4015", "confidence": "#);
        assert!(matches!(answer, OracleAnswer::Malformed(_)));
    }
}
