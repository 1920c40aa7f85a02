//! Output file naming.

use crate::directory::Backend;

/// Characters that are invalid in file names on at least one platform.
const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Name used when sanitization leaves nothing behind.
const FALLBACK_NAME: &str = "folder";

/// Makes a folder name safe to embed in a file name.
///
/// Removes characters that Windows or POSIX reject, control characters,
/// and trailing dots and spaces.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID_FILE_NAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let trimmed = cleaned.trim_end_matches(['.', ' ']).trim_start();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `exported_emails_<folder>[_archive].<extension>`.
#[must_use]
pub fn output_file_name(folder: &str, extension: &str, backend: Backend) -> String {
    format!(
        "exported_emails_{}{}.{extension}",
        sanitize_file_name(folder),
        backend.file_suffix()
    )
}
