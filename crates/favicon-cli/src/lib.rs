use favicon_core::constants::RECORD_ID_METADATA_KEY;
use favicon_core::UploadEvent;
use uuid::Uuid;

/// Content type for an object path, from its extension.
pub fn guess_content_type(object_path: &str) -> Option<&'static str> {
    let extension = object_path.rsplit_once('.')?.1.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(content_type)
}

/// Finalize event equivalent to the bucket notification for `object_path`.
pub fn manual_event(
    bucket: &str,
    object_path: &str,
    content_type: Option<String>,
    size_bytes: u64,
    record_id: Option<Uuid>,
    generation: Option<String>,
) -> UploadEvent {
    let content_type =
        content_type.or_else(|| guess_content_type(object_path).map(String::from));
    let mut event = UploadEvent::new(bucket, object_path, content_type, size_bytes);
    event.generation = generation;
    match record_id {
        Some(id) => event.with_metadata(RECORD_ID_METADATA_KEY, id.to_string()),
        None => event,
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_content_type_by_extension() {
        assert_eq!(guess_content_type("siteImages/favicon_1.PNG"), Some("image/png"));
        assert_eq!(guess_content_type("a/b.jpeg"), Some("image/jpeg"));
        assert_eq!(guess_content_type("a/b.txt"), None);
        assert_eq!(guess_content_type("siteImages/favicon_1"), None);
    }

    #[test]
    fn manual_event_prefers_explicit_content_type() {
        let event = manual_event(
            "cli",
            "siteImages/favicon_1.png",
            Some("image/webp".to_string()),
            10,
            None,
            None,
        );
        assert_eq!(event.content_type.as_deref(), Some("image/webp"));
        assert!(event.record_id_hint().is_none());
    }

    #[test]
    fn manual_event_carries_record_id() {
        let id = Uuid::new_v4();
        let event = manual_event(
            "cli",
            "siteImages/favicon_1.png",
            None,
            0,
            Some(id),
            Some("42".to_string()),
        );
        assert_eq!(event.content_type.as_deref(), Some("image/png"));
        assert_eq!(event.record_id_hint(), Some(id));
        assert_eq!(event.source_key(), "siteImages/favicon_1.png#42");
    }
}
