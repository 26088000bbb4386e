const MAX_ERROR_LENGTH: usize = 2_000;
const MAX_SNIPPET_LENGTH: usize = 200;

pub fn truncate_error(error: &str) -> String {
    truncate_chars(error, MAX_ERROR_LENGTH)
}

pub fn truncate_snippet(text: &str) -> String {
    truncate_chars(text, MAX_SNIPPET_LENGTH)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
    }
}
