use murmur_core::ChatMessage;

/// Wrap a user message in a delimited context envelope.
///
/// Fragments are numbered and blank-line separated; the original message is
/// carried verbatim in its own block. The rewrite is applied only to the
/// in-memory completion request — the persisted thread keeps the user's
/// original words.
pub fn augment_user_message(fragments: &[ChatMessage], original: &str) -> String {
    let numbered: Vec<String> = fragments
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}", i + 1, f.content))
        .collect();

    format!(
        "[CONTEXT]\n{}\n[/CONTEXT]\n\n[USER_MESSAGE]\n{}\n[/USER_MESSAGE]",
        numbered.join("\n\n"),
        original
    )
}
