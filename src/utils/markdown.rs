// src/utils/markdown.rs

/// Escape user-provided text for Telegram's legacy `Markdown` parse mode.
///
/// Only `_`, `*`, `` ` `` and `[` are entities in that mode. An unbalanced
/// one (a name like `john_doe`) makes the Bot API reject the whole message,
/// so each is prefixed with a backslash. Everything else, emoji included,
/// passes through untouched.
pub fn escape_markdown(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
