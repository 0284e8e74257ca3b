//! Document encodings
//!
//! Both encodings carry the same `serde_json::Value` tree. The binary form
//! is MessagePack, whose strings, arrays and maps are length-prefixed.

use std::path::Path;

use serde_json::Value;

use super::SerializeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Binary,
}

impl Format {
    /// Pick a format from a file extension. Anything that is not a known
    /// binary extension is treated as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if matches!(ext.to_ascii_lowercase().as_str(), "bin" | "msgpack" | "mpk") => Format::Binary,
            _ => Format::Json,
        }
    }

    /// Sniff the format from file contents. JSON documents are objects, so
    /// they start with `{` after optional whitespace.
    pub fn detect(bytes: &[u8]) -> Self {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Format::Json,
            _ => Format::Binary,
        }
    }
}

pub fn encode(document: &Value, format: Format) -> Result<Vec<u8>, SerializeError> {
    match format {
        Format::Json => Ok(serde_json::to_vec_pretty(document)?),
        Format::Binary => Ok(rmp_serde::to_vec(document)?),
    }
}

pub fn decode(bytes: &[u8], format: Format) -> Result<Value, SerializeError> {
    match format {
        Format::Json => Ok(serde_json::from_slice(bytes)?),
        Format::Binary => Ok(rmp_serde::from_slice(bytes)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("scenes/a.json"), Format::Json);
        assert_eq!(Format::from_path("scenes/a.BIN"), Format::Binary);
        assert_eq!(Format::from_path("scenes/a.msgpack"), Format::Binary);
        assert_eq!(Format::from_path("scenes/noext"), Format::Json);
    }

    #[test]
    fn test_detect() {
        assert_eq!(Format::detect(b"  \n{\"scene\":{}}"), Format::Json);
        let bin = encode(&json!({"scene": {}}), Format::Binary).unwrap();
        assert_eq!(Format::detect(&bin), Format::Binary);
    }

    #[test]
    fn test_binary_is_smaller_and_equivalent() {
        let doc = json!({
            "scene": {"name": "arena", "version": "1.0"},
            "entities": [{"uuid": 18446744073709551615u64, "tag": "Player", "velocity": {"velocity": [2.0, 0.0], "angular": 0.0}}]
        });
        let text = encode(&doc, Format::Json).unwrap();
        let bin = encode(&doc, Format::Binary).unwrap();
        assert!(bin.len() < text.len());
        assert_eq!(decode(&bin, Format::Binary).unwrap(), doc);
        assert_eq!(decode(&text, Format::Json).unwrap(), doc);
    }

    #[test]
    fn test_truncated_binary_fails() {
        let bin = encode(&json!({"scene": {"name": "x"}}), Format::Binary).unwrap();
        let err = decode(&bin[..bin.len() - 2], Format::Binary).unwrap_err();
        assert!(matches!(err, SerializeError::Decode(_)));
    }
}
