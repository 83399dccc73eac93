pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// Drops the first `<think>...</think>` span, markers included.
/// A missing marker, or a closing marker before the opening one, leaves the
/// text untouched.
pub fn sanitize(text: &str) -> String {
    match (text.find(THINK_OPEN), text.find(THINK_CLOSE)) {
        (Some(start), Some(end)) if start <= end => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..start]);
            out.push_str(&text[end + THINK_CLOSE.len()..]);
            out
        }
        _ => text.to_string(),
    }
}
