//! Filename helpers.

/// Characters that are not allowed in output file names on common filesystems.
const DISALLOWED_FILENAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitize an output file name.
///
/// Disallowed filesystem characters and control characters are replaced by
/// `_`. Leading and trailing dots and spaces are trimmed; an empty result
/// becomes `"clip"`.
pub fn sanitize_output_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || DISALLOWED_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = sanitized.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        "clip".to_string()
    } else {
        trimmed.to_string()
    }
}
