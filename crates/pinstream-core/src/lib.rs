mod error;
mod filename;
mod metadata;
mod pin_id;
mod reference;

pub use error::{PinError, PinResult};
pub use filename::{DEFAULT_BASENAME, MAX_BASENAME_CHARS, derive_filename};
pub use metadata::{InspectionResult, PinMetadata};
pub use pin_id::extract_pin_id;
pub use reference::{ALLOWED_HOSTS, PinReference, SHORT_LINK_HOST, normalize, validate};
