mod bootstrap;
mod controller;
mod state;

pub use bootstrap::bootstrap_url;
pub use controller::{DEFAULT_REENABLE_DELAY, PendingCheck, SessionController};
pub use state::{
    Branch, DEFAULT_TITLE, DownloadRequest, DownloadSession, FALLBACK_MESSAGE, Preview, ViewState,
};
