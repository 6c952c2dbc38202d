//! Turns raw model prose into HTML.
//!
//! Normalization is an ordered list of pure `&str -> String` steps. Label
//! lines ("Summary: ...") become headings, bullet glyphs become markdown list
//! markers and prose paragraphs get a trailing newline before the markdown is
//! rendered as GitHub-flavored markdown with hard line breaks.

use comrak::{Options, markdown_to_html};

pub type NormalizeStep = fn(&str) -> String;

pub const NORMALIZATION_STEPS: &[NormalizeStep] = &[
    normalize_line_endings,
    promote_section_headings,
    promote_label_headings,
    normalize_bullets,
    reflow_paragraphs,
];

const BULLET_GLYPHS: [char; 3] = ['•', '●', '○'];

/// Runs every normalization step in order.
pub fn normalize(text: &str) -> String {
    NORMALIZATION_STEPS
        .iter()
        .fold(text.to_string(), |acc, step| step(&acc))
}

/// Normalizes `text` and renders it to HTML.
pub fn format_answer(text: &str) -> String {
    render_html(&normalize(text))
}

/// Renders GFM with bare URLs linked and every newline inside a paragraph
/// kept as `<br />`.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.autolink = true;
    options.render.hardbreaks = true;

    markdown_to_html(markdown, &options)
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// `Label:<ws>` at a line start becomes `## Label<ws>`.
///
/// The label run accepts whitespace, newlines included, so a label may span
/// several lines as long as it ends in a colon.
pub fn promote_section_headings(text: &str) -> String {
    rewrite_line_starts(text, |text, start| {
        let colon = match_label(text, start)?;
        let after = colon + 1;
        let end = after
            + text[after..]
                .char_indices()
                .find(|(_, c)| !is_whitespace(*c))
                .map_or(text.len() - after, |(i, _)| i);
        Some((end, format!("## {}{}", &text[start..colon], &text[after..end])))
    })
}

/// Any remaining `Label:` at a line start, unless the colon is followed by a
/// digit, becomes `### Label`.
pub fn promote_label_headings(text: &str) -> String {
    rewrite_line_starts(text, |text, start| {
        let colon = match_label(text, start)?;
        let after = colon + 1;
        if text[after..].starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        Some((after, format!("### {}", &text[start..colon])))
    })
}

/// Lines whose first non-indentation character is a bullet glyph start with
/// `* ` instead. Indentation is kept.
pub fn normalize_bullets(text: &str) -> String {
    rewrite_line_starts(text, |text, start| {
        let line = &text[start..];
        let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
        let rest = &line[indent..];
        let glyph = rest.chars().next().filter(|c| BULLET_GLYPHS.contains(c))?;
        let after = &rest[glyph.len_utf8()..];
        let spacing = after.len() - after.trim_start_matches([' ', '\t']).len();
        let end = start + indent + glyph.len_utf8() + spacing;
        Some((end, format!("{}* ", &line[..indent])))
    })
}

/// Splits on blank lines, drops empty paragraphs and appends a newline to
/// every paragraph that is not a heading or a list.
pub fn reflow_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| {
            if paragraph.starts_with(['#', '*', '-']) {
                paragraph.to_string()
            } else {
                format!("{paragraph}\n")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Walks every line start of `text` and lets `rewrite` replace the span
/// `[start, end)` with a new string. Scanning resumes at `end`; a line start
/// swallowed by a replacement is not visited.
fn rewrite_line_starts<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str, usize) -> Option<(usize, String)>,
{
    let mut out = String::with_capacity(text.len() + 16);
    let mut copied = 0;
    let mut pos = 0;

    loop {
        if is_line_start(text, pos) {
            if let Some((end, replacement)) = rewrite(text, pos) {
                out.push_str(&text[copied..pos]);
                out.push_str(&replacement);
                copied = end;
                pos = end;
                continue;
            }
        }

        match text[pos..].char_indices().find(|(_, c)| is_line_break(*c)) {
            Some((offset, c)) => pos += offset + c.len_utf8(),
            None => break,
        }
    }

    out.push_str(&text[copied..]);
    out
}

/// Matches `[A-Za-z][A-Za-z\s]+:` at `start` and returns the colon's offset.
fn match_label(text: &str, start: usize) -> Option<usize> {
    let mut chars = text[start..].char_indices();
    let (_, first) = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }

    let mut run = 0;
    for (offset, c) in chars {
        if c.is_ascii_alphabetic() || is_whitespace(c) {
            run += 1;
            continue;
        }
        return (run > 0 && c == ':').then_some(start + offset);
    }
    None
}

fn is_line_start(text: &str, pos: usize) -> bool {
    text[..pos].chars().next_back().is_none_or(is_line_break)
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

// ECMAScript `\s`: Unicode White_Space without NEL, plus the BOM.
fn is_whitespace(c: char) -> bool {
    c == '\u{feff}' || (c.is_whitespace() && c != '\u{85}')
}
