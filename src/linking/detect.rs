//! Task-reference detection in commit messages.

/// Extracts task references (`TASK-NNN`) from a commit message.
///
/// Matching is case-insensitive on the `TASK-` prefix, requires a word
/// boundary before it (so `SUBTASK-1` does not match), and normalizes the
/// number to the store's zero-padded form (`task-7` becomes `TASK-007`).
/// Duplicates are dropped, keeping first-appearance order.
#[must_use]
pub fn detect_task_refs(message: &str) -> Vec<String> {
    const PREFIX: &[u8] = b"TASK-";

    let bytes = message.as_bytes();
    let mut refs: Vec<String> = Vec::new();
    let mut i = 0;

    while i + PREFIX.len() < bytes.len() {
        let at_boundary = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if at_boundary && bytes[i..i + PREFIX.len()].eq_ignore_ascii_case(PREFIX) {
            let digits_start = i + PREFIX.len();
            let mut end = digits_start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > digits_start {
                // Digit runs long enough to overflow u64 are not task ids.
                if let Ok(number) = message[digits_start..end].parse::<u64>() {
                    let normalized = format!("TASK-{number:03}");
                    if !refs.contains(&normalized) {
                        refs.push(normalized);
                    }
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }

    refs
}
