//! Minimal HTML-to-text reduction for posting pages.

use std::sync::LazyLock;

use regex::Regex;

/// Elements dropped with their content. `head` goes first so nothing inside
/// it can close the match early.
static HIDDEN_ELEMENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["head", "script", "style", "noscript", "svg"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}\s*>")).expect("valid regex")
        })
        .collect()
});
static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|ul|ol|h[1-6]|tr|section|article)\b[^>]*>").expect("valid regex")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Strip markup from `html`, keeping paragraph breaks.
pub fn html_to_text(html: &str) -> String {
    let text = HIDDEN_ELEMENTS
        .iter()
        .fold(html.to_string(), |text, re| re.replace_all(&text, " ").into_owned());
    let text = BLOCK_TAGS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = SPACES.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    BLANK_LINES.replace_all(&joined, "\n\n").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&laquo;", "«")
        .replace("&raquo;", "»")
        .replace("&mdash;", "—")
        .replace("&ndash;", "–")
        .replace("&amp;", "&")
}
