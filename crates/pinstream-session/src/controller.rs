use std::time::Duration;

use pinstream_client::{Backend, CHECK_FAILED_MESSAGE};
use pinstream_core::{InspectionResult, PinError, PinReference, PinResult, derive_filename};

use crate::bootstrap::bootstrap_url;
use crate::state::{Branch, DownloadRequest, DownloadSession, Preview, ViewState};

pub const DEFAULT_REENABLE_DELAY: Duration = Duration::from_millis(2000);

/// A check that passed validation and is waiting for its inspect response.
#[derive(Debug)]
pub struct PendingCheck {
    generation: u64,
    reference: PinReference,
}

impl PendingCheck {
    pub fn reference(&self) -> &PinReference {
        &self.reference
    }

    /// The URL to send to `/inspect`.
    pub fn inspect_url(&self) -> String {
        self.reference.normalized()
    }
}

/// Sequences check, preview and download for one user session.
///
/// Every check bumps a generation counter; an inspect response that arrives
/// for an older generation is dropped instead of overwriting newer state.
#[derive(Debug)]
pub struct SessionController<B> {
    backend: B,
    state: ViewState,
    session: Option<DownloadSession>,
    generation: u64,
    reenable_after: Duration,
}

impl<B: Backend> SessionController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ViewState::Idle,
            session: None,
            generation: 0,
            reenable_after: DEFAULT_REENABLE_DELAY,
        }
    }

    pub fn with_reenable_delay(mut self, delay: Duration) -> Self {
        self.reenable_after = delay;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn session(&self) -> Option<&DownloadSession> {
        self.session.as_ref()
    }

    /// Validates the input and starts a new check.
    ///
    /// Prior session state is dropped whether or not the input is valid.
    /// Empty and invalid inputs never reach the backend.
    pub fn begin_check(&mut self, raw: &str) -> PinResult<PendingCheck> {
        self.generation += 1;
        self.session = None;

        match PinReference::parse(raw.trim()) {
            Ok(reference) => {
                let pin_id = reference.pin_id();
                tracing::debug!(
                    generation = self.generation,
                    pin_id = pin_id.as_deref(),
                    short_link = reference.is_short_link(),
                    "check started"
                );
                self.state = ViewState::Loading;
                Ok(PendingCheck {
                    generation: self.generation,
                    reference,
                })
            }
            Err(err) => {
                tracing::debug!(input = raw, error = %err, "check rejected locally");
                self.state = ViewState::Error(err.to_string());
                Err(err)
            }
        }
    }

    /// Applies an inspect outcome. Returns `None` when a newer check superseded `pending`.
    pub fn complete_check(
        &mut self,
        pending: PendingCheck,
        outcome: PinResult<InspectionResult>,
    ) -> Option<PinResult<Branch>> {
        if pending.generation != self.generation {
            tracing::debug!(
                stale = pending.generation,
                current = self.generation,
                "dropping superseded inspect response"
            );
            return None;
        }

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                self.state = ViewState::Error(err.to_string());
                return Some(Err(err));
            }
        };

        let pin_url = pending.reference.raw().to_string();
        let branch = if result.has_video() {
            Branch::DownloadReady
        } else {
            Branch::Fallback
        };

        self.session = match (branch, result.metadata.video_url()) {
            (Branch::DownloadReady, Some(video_url)) => Some(DownloadSession {
                video_url: video_url.to_string(),
                pin_url: pin_url.clone(),
                title: result.metadata.title.clone(),
                consent: false,
            }),
            _ => None,
        };

        tracing::info!(?branch, pin_url = %pin_url, "pin inspected");
        self.state = ViewState::PreviewReady {
            preview: Preview {
                pin_id: pending.reference.pin_id(),
                metadata: result.metadata,
                pin_url,
            },
            branch,
        };
        Some(Ok(branch))
    }

    /// Validates `raw`, inspects it and selects the preview branch.
    pub async fn check_pin(&mut self, raw: &str) -> PinResult<Branch> {
        let pending = self.begin_check(raw)?;
        let outcome = self.backend.inspect(&pending.inspect_url()).await;
        // `&mut self` is held across the await, so nothing can supersede this check.
        self.complete_check(pending, outcome)
            .unwrap_or_else(|| Err(PinError::InspectionFailed(CHECK_FAILED_MESSAGE.to_string())))
    }

    /// Runs a check for the `url` query parameter of a page address, if it holds a valid pin.
    pub async fn bootstrap(&mut self, page_address: &str) -> Option<PinResult<Branch>> {
        let shared = bootstrap_url(page_address)?;
        Some(self.check_pin(&shared).await)
    }

    /// Records the user's consent. Has no effect without a download-ready session.
    pub fn set_consent(&mut self, consent: bool) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                session.consent = consent;
                true
            }
            None => {
                tracing::debug!(consent, "consent ignored: no download-ready session");
                false
            }
        }
    }

    pub fn download_enabled(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.consent)
    }

    /// Builds the download request for the active session.
    ///
    /// Returns `None` without contacting anything when there is no session or
    /// consent has not been given.
    pub fn request_download(&self) -> Option<DownloadRequest> {
        let Some(session) = self.session.as_ref().filter(|session| session.consent) else {
            tracing::debug!("download ignored: no consented session");
            return None;
        };

        let filename = derive_filename(session.title.as_deref());
        let url = self.backend.download_url(&session.video_url, &filename);
        tracing::info!(%filename, "download requested");

        Some(DownloadRequest {
            url,
            filename,
            reenable_after: self.reenable_after,
        })
    }
}
