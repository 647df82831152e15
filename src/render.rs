//! Turns untrusted message text into markup that is safe to inject into a page.
//!
//! Fenced code spans (text between a pair of triple-backtick markers) are cut out first and
//! rendered verbatim inside a copyable code block.  Everything else is HTML-escaped and then
//! given light formatting: `**bold**`, legacy `<strong>` tags, `` `inline code` `` and line
//! breaks.  Because escaping happens before any markup is introduced, the only tags in the
//! output are the ones this module writes.
//!
//! A fence marker with no partner does not open a code block.  It and everything after it
//! are rendered as ordinary text, so a truncated reply never hides its tail inside an
//! unterminated block.

use std::sync::LazyLock;

use regex::Regex;

const FENCE_MARKER: &str = "```";

const CODE_BLOCK_OPEN: &str = concat!(
    r#"<div class="code-wrapper">"#,
    r#"<button class="copy-btn" onclick="copyCode(this)" aria-label="Copy code">Copy</button>"#,
    "<pre><code>",
);

const CODE_BLOCK_CLOSE: &str = "</code></pre></div>";

static FENCED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("fence pattern is valid"));

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));

static ESCAPED_STRONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&lt;strong&gt;(.+?)&lt;/strong&gt;").expect("strong pattern is valid")
});

// A span never contains a backtick, so a stray fence marker stays literal.
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("inline code pattern is valid"));

/// Renders `text` into safe markup.
///
/// # Example
///
/// ```rust
/// use chatrelay::render;
///
/// assert_eq!(
///     render("**hi** <b>"),
///     r#"<span class="highlight">hi</span> &lt;b&gt;"#
/// );
/// ```
pub fn render(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut last = 0;
    for fenced in FENCED.find_iter(text) {
        out.push_str(&format_prose(&text[last..fenced.start()]));
        let code = &text[fenced.start() + FENCE_MARKER.len()..fenced.end() - FENCE_MARKER.len()];
        push_code_block(&mut out, code);
        last = fenced.end();
    }
    out.push_str(&format_prose(&text[last..]));
    out
}

/// Renders optional text; absent text renders as nothing.
pub fn render_opt(text: Option<&str>) -> String {
    text.map(render).unwrap_or_default()
}

/// Escapes the characters that are significant in HTML element content and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_html`].
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn push_code_block(out: &mut String, code: &str) {
    out.push_str(CODE_BLOCK_OPEN);
    out.push_str(&escape_html(code));
    out.push_str(CODE_BLOCK_CLOSE);
}

fn format_prose(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let escaped = escape_html(text);
    let bolded = BOLD.replace_all(&escaped, r#"<span class="highlight">${1}</span>"#);
    let strong = ESCAPED_STRONG.replace_all(&bolded, r#"<span class="highlight">${1}</span>"#);
    let coded = INLINE_CODE.replace_all(&strong, r#"<code class="inline-code">${1}</code>"#);
    coded.replace('\n', "<br/>")
}
