use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// One of the five square PNG derivatives rendered from the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IconTarget {
    Favicon16,
    Favicon32,
    AppleTouch,
    AndroidChrome192,
    AndroidChrome512,
}

impl IconTarget {
    pub const ALL: [IconTarget; 5] = [
        IconTarget::Favicon16,
        IconTarget::Favicon32,
        IconTarget::AppleTouch,
        IconTarget::AndroidChrome192,
        IconTarget::AndroidChrome512,
    ];

    /// Edge length in pixels.
    pub fn size(self) -> u32 {
        match self {
            IconTarget::Favicon16 => 16,
            IconTarget::Favicon32 => 32,
            IconTarget::AppleTouch => 180,
            IconTarget::AndroidChrome192 => 192,
            IconTarget::AndroidChrome512 => 512,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IconTarget::Favicon16 => "favicon-16x16",
            IconTarget::Favicon32 => "favicon-32x32",
            IconTarget::AppleTouch => "apple-touch-icon",
            IconTarget::AndroidChrome192 => "android-chrome-192x192",
            IconTarget::AndroidChrome512 => "android-chrome-512x512",
        }
    }

    pub fn asset(self) -> FaviconAsset {
        match self {
            IconTarget::Favicon16 => FaviconAsset::Png16,
            IconTarget::Favicon32 => FaviconAsset::Png32,
            IconTarget::AppleTouch => FaviconAsset::AppleTouch,
            IconTarget::AndroidChrome192 => FaviconAsset::Android192,
            IconTarget::AndroidChrome512 => FaviconAsset::Android512,
        }
    }

    pub fn filename(self) -> &'static str {
        self.asset().filename()
    }
}

/// A published file of the icon set.
///
/// Serialises as the published filename, which is the key the link-injection
/// consumer reads from `generated_files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FaviconAsset {
    #[serde(rename = "favicon.ico")]
    Ico,
    #[serde(rename = "favicon-16x16.png")]
    Png16,
    #[serde(rename = "favicon-32x32.png")]
    Png32,
    #[serde(rename = "apple-touch-icon.png")]
    AppleTouch,
    #[serde(rename = "android-chrome-192x192.png")]
    Android192,
    #[serde(rename = "android-chrome-512x512.png")]
    Android512,
}

impl FaviconAsset {
    pub const ALL: [FaviconAsset; 6] = [
        FaviconAsset::Ico,
        FaviconAsset::Png16,
        FaviconAsset::Png32,
        FaviconAsset::AppleTouch,
        FaviconAsset::Android192,
        FaviconAsset::Android512,
    ];

    pub fn filename(self) -> &'static str {
        match self {
            FaviconAsset::Ico => "favicon.ico",
            FaviconAsset::Png16 => "favicon-16x16.png",
            FaviconAsset::Png32 => "favicon-32x32.png",
            FaviconAsset::AppleTouch => "apple-touch-icon.png",
            FaviconAsset::Android192 => "android-chrome-192x192.png",
            FaviconAsset::Android512 => "android-chrome-512x512.png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            FaviconAsset::Ico => "image/x-icon",
            _ => "image/png",
        }
    }
}

/// Public URLs of the complete icon set.
///
/// Can only be built from a map holding all six assets, so a stored value is
/// never a partial set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<FaviconAsset, String>",
    into = "BTreeMap<FaviconAsset, String>"
)]
pub struct GeneratedFiles(BTreeMap<FaviconAsset, String>);

impl GeneratedFiles {
    pub fn get(&self, asset: FaviconAsset) -> &str {
        // Construction guarantees every asset is present.
        self.0.get(&asset).map(String::as_str).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FaviconAsset, &str)> {
        self.0.iter().map(|(asset, url)| (*asset, url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<FaviconAsset, String>> for GeneratedFiles {
    type Error = String;

    fn try_from(map: BTreeMap<FaviconAsset, String>) -> Result<Self, Self::Error> {
        let missing: Vec<&str> = FaviconAsset::ALL
            .iter()
            .filter(|asset| map.get(asset).map(|u| u.is_empty()).unwrap_or(true))
            .map(|asset| asset.filename())
            .collect();

        if !missing.is_empty() {
            return Err(format!(
                "generated files incomplete, missing: {}",
                missing.join(", ")
            ));
        }

        Ok(GeneratedFiles(map))
    }
}

impl From<GeneratedFiles> for BTreeMap<FaviconAsset, String> {
    fn from(files: GeneratedFiles) -> Self {
        files.0
    }
}

/// Lifecycle of a favicon record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "favicon_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FaviconStatus {
    Processing,
    Completed,
}

impl FromStr for FaviconStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(FaviconStatus::Processing),
            "completed" => Ok(FaviconStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid favicon status: {}", s)),
        }
    }
}

impl Display for FaviconStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FaviconStatus::Processing => write!(f, "processing"),
            FaviconStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A favicon row of the `site_images` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaviconRecord {
    pub id: Uuid,
    pub status: FaviconStatus,
    /// URL of the uploaded source image.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_files: Option<GeneratedFiles>,
    /// Storage path of the source object that produced `generated_files`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_object: Option<String>,
}

impl FaviconRecord {
    pub fn is_processing(&self) -> bool {
        self.status == FaviconStatus::Processing
    }
}

/// Fields for inserting a favicon record.
#[derive(Debug, Clone)]
pub struct NewFaviconRecord {
    pub status: FaviconStatus,
    pub url: String,
    pub source_url: Option<String>,
    pub filename: Option<String>,
    pub size: Option<i64>,
    pub generated_files: Option<GeneratedFiles>,
    pub source_object: Option<String>,
}

impl NewFaviconRecord {
    /// Pending record as written by the uploading client before the file lands.
    pub fn processing(url: impl Into<String>, filename: Option<String>, size: Option<i64>) -> Self {
        Self {
            status: FaviconStatus::Processing,
            url: url.into(),
            source_url: None,
            filename,
            size,
            generated_files: None,
            source_object: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_map() -> BTreeMap<FaviconAsset, String> {
        FaviconAsset::ALL
            .iter()
            .map(|a| (*a, format!("https://cdn.example.com/{}", a.filename())))
            .collect()
    }

    #[test]
    fn test_targets_cover_required_sizes() {
        let sizes: Vec<u32> = IconTarget::ALL.iter().map(|t| t.size()).collect();
        assert_eq!(sizes, vec![16, 32, 180, 192, 512]);
        assert_eq!(IconTarget::AppleTouch.filename(), "apple-touch-icon.png");
    }

    #[test]
    fn test_asset_content_types() {
        assert_eq!(FaviconAsset::Ico.content_type(), "image/x-icon");
        for asset in FaviconAsset::ALL.iter().skip(1) {
            assert_eq!(asset.content_type(), "image/png");
        }
    }

    #[test]
    fn test_generated_files_serialize_with_filename_keys() {
        let files = GeneratedFiles::try_from(full_map()).unwrap();
        let value = serde_json::to_value(&files).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 6);
        for key in [
            "favicon.ico",
            "favicon-16x16.png",
            "favicon-32x32.png",
            "apple-touch-icon.png",
            "android-chrome-192x192.png",
            "android-chrome-512x512.png",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn test_generated_files_rejects_partial_set() {
        let mut map = full_map();
        map.remove(&FaviconAsset::Ico);
        let err = GeneratedFiles::try_from(map).unwrap_err();
        assert!(err.contains("favicon.ico"));

        let json = serde_json::json!({ "favicon-16x16.png": "https://x/16.png" });
        assert!(serde_json::from_value::<GeneratedFiles>(json).is_err());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!(
            "completed".parse::<FaviconStatus>().unwrap(),
            FaviconStatus::Completed
        );
        assert_eq!(FaviconStatus::Processing.to_string(), "processing");
    }
}
