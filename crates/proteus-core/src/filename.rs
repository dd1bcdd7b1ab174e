//! Local filename safety for saved assets.

/// Used when the suggested name sanitizes to nothing.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Sanitizes a suggested filename for use on a local filesystem.
///
/// - Replaces NUL, `/`, `\`, whitespace and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores
/// - Limits length to 255 bytes (NAME_MAX)
/// - Falls back to [`DEFAULT_FILENAME`] for empty, `.` or `..`
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    let result = &trimmed[..take];
    if result.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        result.to_string()
    }
}
