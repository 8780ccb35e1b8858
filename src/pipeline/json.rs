//! Locating and parsing the JSON object inside raw model output.

use serde::de::DeserializeOwned;

use crate::error::ParseError;
use crate::pipeline::types::ExtractedPayload;

/// Find the JSON object in model output (handles markdown wrapping and
/// surrounding prose).
pub fn locate_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    // Object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return Some(&trimmed[start..=end]);
    }

    None
}

/// Parse the model output into `T` after locating its JSON object.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let json = locate_json_object(raw).ok_or(ParseError::NoJsonObject)?;
    Ok(serde_json::from_str(json)?)
}

/// Parse the model output as an untyped JSON object.
pub fn parse_payload(raw: &str) -> Result<ExtractedPayload, ParseError> {
    parse_model_json(raw)
}
