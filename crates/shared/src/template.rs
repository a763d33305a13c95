//! Placeholder substitution for stored notification templates.

/// Replaces every occurrence of each variable key with its value.
///
/// Keys are matched literally (`"{name}"` matches `{name}`), in iteration
/// order. Placeholders without a matching key are left untouched. Values are
/// inserted as-is; no escaping is applied.
pub fn render<I, K, V>(content: &str, variables: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut rendered = content.to_string();
    for (key, value) in variables {
        let key = key.as_ref();
        if key.is_empty() {
            continue;
        }
        if rendered.contains(key) {
            rendered = rendered.replace(key, value.as_ref());
        }
    }
    rendered
}

/// Builds the chat message body used by the Slack and Telegram senders.
pub fn chat_message(title: &str, message: &str, url: Option<&str>) -> String {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => format!("{}\n\n{}\n\n{}", title, message, url),
        None => format!("{}\n\n{}", title, message),
    }
}
