use crate::constants::RECORD_ID_METADATA_KEY;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Object-finalize notification emitted by the storage bucket.
///
/// Field names follow the storage notification payload (`name`, `contentType`,
/// `size`, `generation`). `size` and `generation` arrive as decimal strings
/// from most providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    pub bucket: String,
    #[serde(rename = "name")]
    pub object_path: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(rename = "size", default, deserialize_with = "deserialize_size")]
    pub size_bytes: u64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Changes every time an object is written, including overwrites of the
    /// same name.
    #[serde(default, deserialize_with = "deserialize_generation")]
    pub generation: Option<String>,
}

impl UploadEvent {
    pub fn new(
        bucket: impl Into<String>,
        object_path: impl Into<String>,
        content_type: Option<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            object_path: object_path.into(),
            content_type,
            size_bytes,
            metadata: HashMap::new(),
            generation: None,
        }
    }

    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = Some(generation.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Last path segment of the object name.
    pub fn file_name(&self) -> &str {
        self.object_path
            .rsplit('/')
            .next()
            .unwrap_or(self.object_path.as_str())
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false)
    }

    /// Identity of the written object: `name#generation`, or just the name
    /// when the notification carries no generation.
    pub fn source_key(&self) -> String {
        match &self.generation {
            Some(generation) => format!("{}#{}", self.object_path, generation),
            None => self.object_path.clone(),
        }
    }

    /// Record id the uploading client attached to the object, if any.
    pub fn record_id_hint(&self) -> Option<Uuid> {
        self.metadata
            .get(RECORD_ID_METADATA_KEY)
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Number(u64),
        Text(String),
    }

    match Option::<RawSize>::deserialize(deserializer)? {
        None => Ok(0),
        Some(RawSize::Number(n)) => Ok(n),
        Some(RawSize::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid object size: {}", s))),
    }
}

fn deserialize_generation<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawGeneration {
        Number(u64),
        Text(String),
    }

    Ok(
        match Option::<RawGeneration>::deserialize(deserializer)? {
            None => None,
            Some(RawGeneration::Number(n)) => Some(n.to_string()),
            Some(RawGeneration::Text(s)) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_finalize_payload() {
        let event: UploadEvent = serde_json::from_value(serde_json::json!({
            "bucket": "site-assets",
            "name": "siteImages/favicon_1699999999999.png",
            "contentType": "image/png",
            "size": "20480",
            "metadata": { "favicon-record-id": "6f1c2d9e-8a51-4d7b-9d0e-1c2b3a4d5e6f" }
        }))
        .unwrap();

        assert_eq!(event.bucket, "site-assets");
        assert_eq!(event.file_name(), "favicon_1699999999999.png");
        assert_eq!(event.size_bytes, 20480);
        assert!(event.is_image());
        assert!(event.record_id_hint().is_some());
        assert_eq!(event.generation, None);
        assert_eq!(event.source_key(), "siteImages/favicon_1699999999999.png");
    }

    #[test]
    fn test_generation_is_part_of_source_key() {
        let event: UploadEvent = serde_json::from_value(serde_json::json!({
            "bucket": "site-assets",
            "name": "siteImages/favicon_logo.png",
            "generation": "1700000000123456"
        }))
        .unwrap();
        assert_eq!(event.source_key(), "siteImages/favicon_logo.png#1700000000123456");

        let numeric: UploadEvent = serde_json::from_value(serde_json::json!({
            "bucket": "site-assets",
            "name": "siteImages/favicon_logo.png",
            "generation": 1700000000123456u64
        }))
        .unwrap();
        assert_eq!(numeric.source_key(), event.source_key());

        let overwritten = UploadEvent::new("site-assets", "siteImages/favicon_logo.png", None, 0)
            .with_generation("1700000000999999");
        assert_ne!(overwritten.source_key(), event.source_key());
    }

    #[test]
    fn test_numeric_and_missing_size() {
        let event: UploadEvent = serde_json::from_value(serde_json::json!({
            "bucket": "b",
            "name": "a.png",
            "size": 12
        }))
        .unwrap();
        assert_eq!(event.size_bytes, 12);
        assert!(!event.is_image());

        let event: UploadEvent =
            serde_json::from_value(serde_json::json!({ "bucket": "b", "name": "a.png" })).unwrap();
        assert_eq!(event.size_bytes, 0);
    }

    #[test]
    fn test_invalid_record_id_hint_is_ignored() {
        let event = UploadEvent::new("b", "siteImages/favicon_1.png", None, 0)
            .with_metadata(RECORD_ID_METADATA_KEY, "not-a-uuid");
        assert_eq!(event.record_id_hint(), None);
    }

    #[test]
    fn test_file_name_without_directory() {
        let event = UploadEvent::new("b", "favicon_1.png", None, 0);
        assert_eq!(event.file_name(), "favicon_1.png");
    }
}
