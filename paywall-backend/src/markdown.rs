//! Minimal Markdown to HTML conversion for `?format=html` content requests.
//!
//! Handles fenced and inline code, ATX headings, `- ` lists and paragraphs.
//! Everything else passes through as escaped text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCED_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());

static INLINE_CODE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());

static HEADING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.*?)[ \t]*$").unwrap());

static LIST_BLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\n)(- .+(?:\n- .+)*)").unwrap());

static PARAGRAPH_BREAK_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Marks where a fenced block was lifted out. Private-use code point, stripped
/// from the input so article text cannot forge one.
const PLACEHOLDER_MARK: char = '\u{E000}';

static CODE_PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x{E000}CODEBLOCK(\d+)\x{E000}").unwrap());

static BLOCK_ELEMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:</?(?:h\d|ul|pre|blockquote)|\x{E000}CODEBLOCK\d+\x{E000}$)").unwrap());

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn markdown_to_html(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let markdown = markdown.replace(PLACEHOLDER_MARK, "");

    // Pull fenced blocks out first so nothing below rewrites their contents
    let mut code_blocks: Vec<String> = Vec::new();
    let text = FENCED_CODE_PATTERN.replace_all(&markdown, |caps: &Captures| {
        code_blocks.push(caps[1].trim_matches('\n').to_string());
        format!("{mark}CODEBLOCK{}{mark}", code_blocks.len() - 1, mark = PLACEHOLDER_MARK)
    });

    let text = escape_html(&text);
    let text = INLINE_CODE_PATTERN.replace_all(&text, "<code>$1</code>");
    let text = HEADING_PATTERN.replace_all(&text, |caps: &Captures| {
        let level = caps[1].len();
        format!("<h{level}>{}</h{level}>", &caps[2])
    });
    let text = LIST_BLOCK_PATTERN.replace_all(&text, |caps: &Captures| {
        let items: String = caps[1]
            .lines()
            .map(|line| format!("<li>{}</li>", line.trim_start_matches('-').trim()))
            .collect();
        format!("\n<ul>{}</ul>\n", items)
    });

    let html = PARAGRAPH_BREAK_PATTERN
        .split(&text)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if BLOCK_ELEMENT_PATTERN.is_match(part) {
                part.to_string()
            } else {
                format!("<p>{}</p>", part.replace('\n', "<br/>"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    CODE_PLACEHOLDER_PATTERN
        .replace_all(&html, |caps: &Captures| {
            let code = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|idx| code_blocks.get(idx))
                .map(|code| escape_html(code))
                .unwrap_or_default();
            format!("<pre><code>{}</code></pre>", code)
        })
        .into_owned()
}
