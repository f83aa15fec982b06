pub const DEFAULT_BASENAME: &str = "pinterest_video";
pub const MAX_BASENAME_CHARS: usize = 50;
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Builds the download filename from a pin title.
///
/// Every character outside `[A-Za-z0-9_.-]` becomes `_`, the result is cut to
/// [`MAX_BASENAME_CHARS`] characters and `.mp4` is appended. A missing or empty
/// title falls back to [`DEFAULT_BASENAME`].
pub fn derive_filename(title: Option<&str>) -> String {
    let title = title.filter(|value| !value.is_empty());
    let base: String = match title {
        Some(title) => title
            .chars()
            .map(|c| if is_filename_safe(c) { c } else { '_' })
            .take(MAX_BASENAME_CHARS)
            .collect(),
        None => DEFAULT_BASENAME.to_string(),
    };
    format!("{base}{VIDEO_EXTENSION}")
}

fn is_filename_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}
