//! Conversion between raw JSON bytes and `ObjectPayload`.
//!
//! Decoding is total: absent bytes, malformed JSON and non-object JSON all
//! come back as `ParseError::Decode`.

use serde_json::{Map, Value};

use crate::error::ParseError;

/// A loosely typed Parse object: string keys to arbitrary JSON values.
pub type ObjectPayload = Map<String, Value>;

pub fn decode(bytes: Option<&[u8]>) -> Result<ObjectPayload, ParseError> {
    let bytes = bytes.ok_or_else(|| ParseError::Decode("response has no body".to_string()))?;
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ParseError::Decode(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(ParseError::Decode(e.to_string())),
    }
}

pub fn encode(payload: &ObjectPayload) -> Result<Vec<u8>, ParseError> {
    serde_json::to_vec(payload).map_err(|e| ParseError::Encode(e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
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
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_object() {
        let payload = decode(Some(br#"{"content":"hi","number":237}"#)).unwrap();
        assert_eq!(payload["content"], "hi");
        assert_eq!(payload["number"], 237);
    }

    #[test]
    fn decode_malformed_is_error() {
        let err = decode(Some(b"{not json")).unwrap_err();
        assert!(matches!(err, ParseError::Decode(_)));
    }

    #[test]
    fn decode_absent_is_error() {
        assert!(matches!(decode(None), Err(ParseError::Decode(_))));
        assert!(matches!(decode(Some(b"")), Err(ParseError::Decode(_))));
    }

    #[test]
    fn decode_non_object_is_error() {
        let err = decode(Some(b"[1,2]")).unwrap_err();
        assert_eq!(err, ParseError::Decode("expected a JSON object, got an array".to_string()));
    }

    #[test]
    fn encode_escapes_embedded_quotes() {
        let mut payload = ObjectPayload::new();
        payload.insert("text".to_string(), json!("say \"hi\""));
        let bytes = encode(&payload).unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, json!({"text": "say \"hi\""}));
    }

    #[test]
    fn encode_of_decoded_keeps_pairs() {
        let raw = br#"{"a":"x","b":2,"c":true,"d":{"e":[1,null]}}"#;
        let again = encode(&decode(Some(raw)).unwrap()).unwrap();
        let lhs: Value = serde_json::from_slice(raw).unwrap();
        let rhs: Value = serde_json::from_slice(&again).unwrap();
        assert_eq!(lhs, rhs);
    }
}
