//! Formatting helpers for Telegram HTML replies.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Inline `<code>` span with escaped content.
pub fn code(text: &str) -> String {
    format!("<code>{}</code>", escape_html(text))
}

/// Bulleted list of aliases for help text.
pub fn alias_list(aliases: &[&str]) -> String {
    aliases
        .iter()
        .map(|a| format!("• {}", code(a)))
        .collect::<Vec<_>>()
        .join("\n")
}
