//! `Upload-Metadata` header encoding
//!
//! The create step carries key/value metadata as comma-separated
//! `key base64(value)` pairs. At minimum the engine sends `filename` and
//! `path`. A file name that is not clean printable ASCII is replaced by a
//! generated fallback (keeping the extension when it is safe) rather than
//! failing the upload.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::warn;
use uuid::Uuid;

/// Encodes the metadata pairs for the create request
///
/// # Arguments
/// * `file_name` - Original file name; replaced by a fallback when it
///   contains non-ASCII or control characters
/// * `target_path` - Destination directory on the server
///
/// # Returns
/// The `Upload-Metadata` header value, e.g.
/// `filename dmlkZW8ubXA0,path L21vdmllcw==`
pub fn encode_metadata(file_name: &str, target_path: &str) -> String {
    let name = if is_clean_ascii(file_name) {
        file_name.to_string()
    } else {
        let fallback = fallback_name(file_name);
        warn!(
            original = file_name,
            fallback, "File name is not clean ASCII, using generated name"
        );
        fallback
    };

    format!(
        "filename {},path {}",
        BASE64.encode(name),
        BASE64.encode(target_path)
    )
}

/// Returns true when every character is printable ASCII
fn is_clean_ascii(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
}

/// Generates a random replacement name, keeping a safe ASCII extension
fn fallback_name(original: &str) -> String {
    let stem = format!("upload-{}", Uuid::new_v4().simple());
    match original.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && is_clean_ascii(ext) => format!("{stem}.{ext}"),
        _ => stem,
    }
}
