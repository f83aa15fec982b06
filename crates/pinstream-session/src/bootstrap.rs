use pinstream_core::validate;
use url::Url;

/// Reads a shared pin from the `url` query parameter of a page address.
///
/// Only returns the value when it passes validation as sent, without trimming.
pub fn bootstrap_url(page_address: &str) -> Option<String> {
    let page = Url::parse(page_address).ok()?;
    let shared = page
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())?;
    validate(&shared).then_some(shared)
}
