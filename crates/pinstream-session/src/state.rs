use std::time::Duration;

use pinstream_core::PinMetadata;
use url::Url;

pub const DEFAULT_TITLE: &str = "Pinterest Pin";
pub const FALLBACK_MESSAGE: &str = "This Pinterest pin doesn't contain a downloadable video or it's protected by Pinterest's security measures.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    DownloadReady,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub metadata: PinMetadata,
    /// The pin URL as the user typed it; the fallback branch links back to it.
    pub pin_url: String,
    pub pin_id: Option<String>,
}

impl Preview {
    pub fn display_title(&self) -> &str {
        non_empty(self.metadata.title.as_deref()).unwrap_or(DEFAULT_TITLE)
    }

    pub fn display_description(&self) -> &str {
        non_empty(self.metadata.description.as_deref()).unwrap_or("No description available")
    }

    pub fn author(&self) -> Option<&str> {
        non_empty(self.metadata.author.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// What the presentation layer renders after each check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Loading,
    Error(String),
    PreviewReady { preview: Preview, branch: Branch },
}

/// State bridging a download-ready inspection to a later download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSession {
    pub(crate) video_url: String,
    pub(crate) pin_url: String,
    pub(crate) title: Option<String>,
    pub(crate) consent: bool,
}

impl DownloadSession {
    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    pub fn pin_url(&self) -> &str {
        &self.pin_url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn consent(&self) -> bool {
        self.consent
    }
}

/// A constructed download address. The transfer itself belongs to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub filename: String,
    /// No completion signal exists, so the trigger comes back after a fixed delay.
    pub reenable_after: Duration,
}
