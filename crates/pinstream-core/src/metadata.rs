use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
}

impl PinMetadata {
    /// The video URL, if the backend sent a non-empty one.
    pub fn video_url(&self) -> Option<&str> {
        self.video_url
            .as_deref()
            .filter(|value| !value.is_empty())
    }
}

/// Body of a successful `/inspect` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionResult {
    #[serde(default)]
    pub metadata: PinMetadata,
    #[serde(default)]
    pub downloadable: bool,
}

impl InspectionResult {
    pub fn has_video(&self) -> bool {
        self.downloadable && self.metadata.video_url().is_some()
    }
}
