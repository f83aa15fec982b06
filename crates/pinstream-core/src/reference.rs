use url::Url;

use crate::error::{PinError, PinResult};
use crate::pin_id::extract_pin_id;

pub const SHORT_LINK_HOST: &str = "pin.it";

pub const ALLOWED_HOSTS: [&str; 5] = [
    "pinterest.com",
    "www.pinterest.com",
    SHORT_LINK_HOST,
    "pinterest.co.uk",
    "br.pinterest.com",
];

/// Adds `https://` unless the input already carries an http(s) scheme.
pub fn normalize(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

/// Syntactic check only: the pin may still not exist.
pub fn validate(raw: &str) -> bool {
    !raw.is_empty() && accepted_url(raw).is_some()
}

fn accepted_url(raw: &str) -> Option<Url> {
    let url = match Url::parse(&normalize(raw)) {
        Ok(url) => url,
        Err(err) => {
            tracing::debug!(input = raw, error = %err, "url validation failed");
            return None;
        }
    };

    let host = url.host_str()?.to_lowercase();
    if !ALLOWED_HOSTS.contains(&host.as_str()) {
        return None;
    }
    if host == SHORT_LINK_HOST {
        return Some(url);
    }

    url.path().to_lowercase().contains("/pin/").then_some(url)
}

/// A user-supplied pin URL that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReference {
    raw: String,
    url: Url,
}

impl PinReference {
    pub fn parse(raw: &str) -> PinResult<Self> {
        if raw.is_empty() {
            return Err(PinError::EmptyInput);
        }
        let url = accepted_url(raw).ok_or_else(|| PinError::InvalidUrl(raw.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            url,
        })
    }

    /// The input as the user typed it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The scheme-normalized form sent to the backend.
    pub fn normalized(&self) -> String {
        normalize(&self.raw)
    }

    pub fn is_short_link(&self) -> bool {
        self.url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(SHORT_LINK_HOST))
    }

    pub fn pin_id(&self) -> Option<String> {
        extract_pin_id(self.url.as_str())
    }
}
