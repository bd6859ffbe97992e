//! Media type detection for downloaded bodies.
//!
//! Extension choice order: response Content-Type first, magic bytes from the
//! body prefix second, the URL path last. Unrecognized bodies keep the `bin`
//! fallback and the executor flags the outcome for review.

/// Extensions the fetcher recognizes as media outputs.
pub const KNOWN_EXTENSIONS: [&str; 5] = ["mp4", "jpg", "jpeg", "png", "webp"];

/// Fallback extension for bodies whose type could not be identified.
pub const UNKNOWN_EXTENSION: &str = "bin";

/// Pick the output extension for a response. `None` means unidentified; the
/// caller writes the file with `UNKNOWN_EXTENSION` and flags the outcome.
pub fn pick_extension(
    content_type: Option<&str>,
    prefix: &[u8],
    url: &str,
) -> Option<&'static str> {
    if let Some(ext) = content_type.and_then(from_content_type) {
        return Some(ext);
    }
    if let Some(ext) = from_magic(prefix) {
        return Some(ext);
    }
    from_url_path(url)
}

/// Map a Content-Type header value, parameters stripped, case-insensitive.
fn from_content_type(value: &str) -> Option<&'static str> {
    let mime = value
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "video/mp4" | "application/mp4" => Some("mp4"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Identify the body from its leading bytes.
fn from_magic(prefix: &[u8]) -> Option<&'static str> {
    if prefix.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }
    if prefix.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }
    if prefix.len() >= 12 && &prefix[0..4] == b"RIFF" && &prefix[8..12] == b"WEBP" {
        return Some("webp");
    }
    // ISO BMFF: 4-byte box size, then "ftyp".
    if prefix.len() >= 8 && &prefix[4..8] == b"ftyp" {
        return Some("mp4");
    }
    None
}

/// Last resort: the extension of the URL's final path segment, when it is one
/// of the known media extensions.
fn from_url_path(url: &str) -> Option<&'static str> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    let ext = segment.rsplit_once('.')?.1.to_ascii_lowercase();
    KNOWN_EXTENSIONS.iter().copied().find(|k| *k == ext)
}
