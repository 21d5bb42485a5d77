//! Markdown to Slack mrkdwn conversion.
//!
//! Slack renders its own dialect: `*bold*`, `_italic_`, `~strike~`,
//! `<url|label>` links, and no heading syntax at all. Model output arrives
//! as standard Markdown, so every reply is rewritten before posting.
//!
//! The conversion is a fixed sequence of passes, each a pure function from
//! text to text. Code is swapped for placeholder tokens first and restored
//! last, so no pass ever rewrites inside a code block or span.

use std::sync::LazyLock;

use regex::Regex;

/// Convert a Markdown subset to Slack mrkdwn.
///
/// Pass order is load-bearing. Italics must run while `**` and `__` are
/// still double markers, and headings must run before bold starts emitting
/// `*…*` of its own.
pub fn markdown_to_mrkdwn(text: &str) -> String {
    let mut protected = Vec::new();
    let text = protect_code(text, &mut protected);
    let text = convert_italic(&text);
    let text = convert_headings(&text);
    let text = convert_bold(&text);
    let text = convert_strike(&text);
    let text = convert_links(&text);
    let text = convert_bullets(&text);
    restore_code(&text, &protected)
}

/// Replace fenced blocks and inline spans with placeholder tokens.
///
/// Each protected region is stored in its final mrkdwn form: fences are
/// normalized to ```` ```\n{content}``` ```` with the language tag dropped
/// (Slack has no fence info strings), inline spans kept verbatim. The
/// content itself is never touched.
fn protect_code(text: &str, protected: &mut Vec<String>) -> String {
    static FENCED_BLOCK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)`{3,}([^\n`]*)\n(.*?)`{3,}").expect("invalid regex"));
    static INLINE_SPAN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"`[^`]+`").expect("invalid regex"));

    let text = FENCED_BLOCK.replace_all(text, |caps: &regex::Captures<'_>| {
        let token = format!("\x00CODE{}\x00", protected.len());
        protected.push(format!("```\n{}```", &caps[2]));
        token
    });
    INLINE_SPAN
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            let token = format!("\x00CODE{}\x00", protected.len());
            protected.push(caps[0].to_string());
            token
        })
        .into_owned()
}

/// `*text*` → `_text_`.
///
/// A star in a run of two or more never opens or closes an italic span,
/// which keeps `**bold**` intact for the later passes. The regex crate has
/// no lookaround, so this is a character scan instead.
fn convert_italic(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if is_single_star(&chars, i) {
            if let Some(close) = find_italic_close(&chars, i) {
                out.push('_');
                out.extend(&chars[i + 1..close]);
                out.push('_');
                i = close + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// A `*` with no `*` neighbor on either side.
fn is_single_star(chars: &[char], i: usize) -> bool {
    chars[i] == '*'
        && (i == 0 || chars[i - 1] != '*')
        && (i + 1 >= chars.len() || chars[i + 1] != '*')
}

/// First single star that can close a span opened at `open` (at least one
/// character of content between the markers).
fn find_italic_close(chars: &[char], open: usize) -> Option<usize> {
    (open + 2..chars.len()).find(|&j| is_single_star(chars, j))
}

/// `# Title` → `*Title*`.
///
/// Trailing closing hashes are dropped, and bold markers inside the heading
/// text are stripped so emphasis does not nest.
fn convert_headings(text: &str) -> String {
    static HEADING: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.*)$").expect("invalid regex"));

    HEADING
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = caps[1]
                .trim_end()
                .trim_end_matches('#')
                .trim_end()
                .replace("**", "");
            format!("*{body}*")
        })
        .into_owned()
}

/// `**text**` and `__text__` → `*text*`.
fn convert_bold(text: &str) -> String {
    static BOLD_STARS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)\*\*(.+?)\*\*").expect("invalid regex"));
    static BOLD_UNDERSCORES: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)__(.+?)__").expect("invalid regex"));

    let text = BOLD_STARS.replace_all(text, "*$1*");
    BOLD_UNDERSCORES.replace_all(&text, "*$1*").into_owned()
}

/// `~~text~~` → `~text~`.
fn convert_strike(text: &str) -> String {
    static STRIKE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)~~(.+?)~~").expect("invalid regex"));

    STRIKE.replace_all(text, "~$1~").into_owned()
}

/// `[label](url)` → `<url|label>`.
fn convert_links(text: &str) -> String {
    static LINK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("invalid regex"));

    LINK.replace_all(text, "<$2|$1>").into_owned()
}

/// `- item` → `• item`, with every two leading spaces becoming one tab of
/// indent and nested levels switching to the hollow glyph.
fn convert_bullets(text: &str) -> String {
    static BULLET: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^( *)- (.*)").expect("invalid regex"));

    BULLET
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let depth = caps[1].len() / 2;
            let glyph = if depth == 0 { "•" } else { "◦" };
            format!("{}{glyph} {}", "\t".repeat(depth), &caps[2])
        })
        .into_owned()
}

/// Swap every placeholder token back for its recorded region.
fn restore_code(text: &str, protected: &[String]) -> String {
    let mut out = text.to_string();
    for (i, region) in protected.iter().enumerate() {
        let token = format!("\x00CODE{i}\x00");
        out = out.replace(&token, region);
    }
    out
}
