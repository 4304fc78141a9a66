use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Markdown -> rendered fragment
// ---------------------------------------------------------------------------

/// Extensions are kept off on purpose: with strikethrough disabled a `<del>`
/// in a rendered fragment can only be a redline deletion.
fn parser_options() -> Options {
    Options::empty()
}

/// Render markdown to an HTML fragment.
///
/// Deterministic for a given input. Never fails: if the parser panics the
/// document is emitted as escaped text in a single paragraph instead.
pub fn to_rendered(doc: &str) -> String {
    if doc.is_empty() {
        return String::new();
    }

    let rendered = std::panic::catch_unwind(|| {
        let parser = Parser::new_ext(doc, parser_options());
        let mut out = String::with_capacity(doc.len() + doc.len() / 2);
        html::push_html(&mut out, parser);
        out
    });

    match rendered {
        Ok(out) => out,
        Err(_) => {
            tracing::warn!(len = doc.len(), "markdown render failed, using escaped fallback");
            fallback_render(doc)
        }
    }
}

fn fallback_render(doc: &str) -> String {
    format!("<p>{}</p>\n", escape_html(doc).replace('\n', "<br/>"))
}

/// Source slices of the top-level blocks the renderer sees: headings,
/// paragraphs, whole lists, quotes, code blocks and rules. Source lines no
/// block covers (link reference definitions) become blocks of their own, one
/// per line, so every non-blank line of `doc` lands in some block.
pub fn split_blocks(doc: &str) -> Vec<&str> {
    scan_blocks(doc).into_iter().map(|(block, _)| block).collect()
}

/// The source lines outside every rendered block: the document's link
/// reference definitions.
pub fn reference_definitions(doc: &str) -> Vec<&str> {
    scan_blocks(doc)
        .into_iter()
        .filter(|(_, uncovered)| *uncovered)
        .map(|(block, _)| block)
        .collect()
}

/// Render one block of a larger document. `definitions` are appended so
/// reference-style links resolve as they do in the whole document. A block
/// that renders to nothing (a definition) is shown as its escaped source.
pub fn render_block(block: &str, definitions: &[&str]) -> String {
    let rendered = if definitions.is_empty() {
        to_rendered(block)
    } else {
        to_rendered(&format!("{block}\n\n{}", definitions.join("\n")))
    };
    if rendered.trim().is_empty() && !block.trim().is_empty() {
        fallback_render(block)
    } else {
        rendered
    }
}

/// Blocks in source order, each flagged when no parser event covers it.
fn scan_blocks(doc: &str) -> Vec<(&str, bool)> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut covered = 0usize;

    for (event, range) in Parser::new_ext(doc, parser_options()).into_offset_iter() {
        let top_level = match event {
            // The range of a Start event spans the whole element.
            Event::Start(_) => {
                depth += 1;
                depth == 1
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                false
            }
            Event::Rule => depth == 0,
            _ => false,
        };
        if top_level && range.start >= covered {
            push_uncovered(&mut blocks, &doc[covered..range.start]);
            let block = doc[range.start..range.end].trim_end();
            if !block.trim().is_empty() {
                blocks.push((block, false));
            }
            covered = range.end;
        }
    }
    push_uncovered(&mut blocks, &doc[covered..]);
    blocks
}

fn push_uncovered<'a>(blocks: &mut Vec<(&'a str, bool)>, gap: &'a str) {
    for line in gap.split('\n') {
        let line = line.trim();
        if !line.is_empty() {
            blocks.push((line, true));
        }
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

// ---------------------------------------------------------------------------
// Rendered fragment -> markdown
// ---------------------------------------------------------------------------

/// Remove redline annotations: insertions keep their content, deletions
/// (and the line break that follows them) disappear.
pub fn strip_redline(html: &str) -> String {
    static INS_RE: OnceLock<Regex> = OnceLock::new();
    static DEL_RE: OnceLock<Regex> = OnceLock::new();

    let ins_re =
        INS_RE.get_or_init(|| Regex::new(r"(?is)<ins\b[^>]*>(.*?)</ins>").expect("valid ins regex"));
    let del_re = DEL_RE.get_or_init(|| {
        Regex::new(r"(?is)<del\b[^>]*>.*?</del>(?:\s*<br\s*/?>)?").expect("valid del regex")
    });

    let kept = ins_re.replace_all(html, "$1");
    del_re.replace_all(&kept, "").into_owned()
}

/// Convert an HTML fragment back to markdown.
///
/// Redline markup is stripped first, so a redlined fragment yields only the
/// kept content. The conversion is lossy: blank-line runs, list markers,
/// emphasis markers and escaping are normalized, so
/// `to_markup(&to_rendered(x))` is not `x` in general.
pub fn to_markup(html: &str) -> String {
    static DROPPED_RE: OnceLock<Regex> = OnceLock::new();
    static TAG_RE: OnceLock<Regex> = OnceLock::new();

    if html.trim().is_empty() {
        return String::new();
    }

    let dropped_re = DROPPED_RE.get_or_init(|| {
        Regex::new(r"(?is)<(?:script|style|iframe|object|embed)\b[^>]*>.*?</(?:script|style|iframe|object|embed)\s*>")
            .expect("valid dropped-element regex")
    });
    let tag_re = TAG_RE.get_or_init(|| {
        Regex::new(r"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*>").expect("valid tag regex")
    });

    let clean = strip_redline(html);
    let clean = dropped_re.replace_all(&clean, "");

    let mut writer = MarkupWriter::default();
    let mut last = 0;
    for caps in tag_re.captures_iter(&clean) {
        let Some(whole) = caps.get(0) else { continue };
        writer.text(&clean[last..whole.start()]);
        last = whole.end();

        let Some(name) = caps.get(2) else { continue }; // comment
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|c| !c.as_str().is_empty());
        if closing {
            writer.close(&name);
        } else {
            writer.open(&name, whole.as_str());
        }
    }
    writer.text(&clean[last..]);
    writer.finish()
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(u64),
}

impl ListKind {
    fn indent(&self) -> &'static str {
        match self {
            ListKind::Bullet => "  ",
            ListKind::Ordered(_) => "   ",
        }
    }
}

#[derive(Debug)]
enum Capture {
    Quote,
    Link(String),
}

/// Streaming tag-to-markdown writer. Blockquotes and links capture their
/// content into a nested buffer and are written out when they close.
#[derive(Debug, Default)]
struct MarkupWriter {
    root: String,
    captures: Vec<(Capture, String)>,
    lists: Vec<ListKind>,
    pre_depth: usize,
    /// Just emitted a list marker; a `<p>` here must not break the line.
    item_start: bool,
}

impl MarkupWriter {
    fn out(&mut self) -> &mut String {
        match self.captures.last_mut() {
            Some((_, buf)) => buf,
            None => &mut self.root,
        }
    }

    fn push(&mut self, s: &str) {
        self.out().push_str(s);
        self.item_start = false;
    }

    fn line_break(&mut self) {
        let out = self.out();
        trim_trailing_spaces(out);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    fn block_break(&mut self) {
        if !self.lists.is_empty() {
            self.line_break();
            return;
        }
        let out = self.out();
        trim_trailing_spaces(out);
        if out.is_empty() {
            return;
        }
        while !out.ends_with("\n\n") {
            out.push('\n');
        }
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        if self.pre_depth > 0 {
            self.push(&decoded);
            return;
        }

        let collapsed = collapse_inline_whitespace(&decoded);
        let out = self.out();
        let text = if out.is_empty() || out.ends_with('\n') || out.ends_with(' ') {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if text.is_empty() {
            return;
        }
        out.push_str(text);
        self.item_start = false;
    }

    fn open(&mut self, name: &str, tag: &str) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.block_break();
                self.push(&format!("{} ", "#".repeat(level)));
            }
            "p" => {
                if !self.item_start {
                    self.block_break();
                }
            }
            "div" | "section" | "article" | "header" | "footer" | "table" => self.block_break(),
            "br" => {
                if self.pre_depth == 0 {
                    trim_trailing_spaces(self.out());
                }
                self.push("\n");
            }
            "hr" => {
                self.block_break();
                self.push("---");
                self.block_break();
            }
            "strong" | "b" => self.push("**"),
            "em" | "i" => self.push("*"),
            "code" => {
                if self.pre_depth == 0 {
                    self.push("`");
                } else if let Some(lang) = code_language(tag) {
                    let out = self.out();
                    if out.ends_with("```\n") {
                        out.truncate(out.len() - 1);
                        out.push_str(&lang);
                        out.push('\n');
                    }
                }
            }
            "pre" => {
                self.block_break();
                self.push("```\n");
                self.pre_depth += 1;
            }
            "blockquote" => {
                self.block_break();
                self.captures.push((Capture::Quote, String::new()));
            }
            "a" => {
                let href = href_attribute(tag).unwrap_or_default();
                self.captures.push((Capture::Link(href), String::new()));
            }
            "ul" | "ol" => {
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.line_break();
                }
                let kind = if name == "ol" {
                    let start = start_attribute(tag)
                        .and_then(|s| s.trim().parse().ok())
                        .unwrap_or(1);
                    ListKind::Ordered(start)
                } else {
                    ListKind::Bullet
                };
                self.lists.push(kind);
            }
            "li" => {
                self.line_break();
                let depth = self.lists.len();
                let indent: String = self
                    .lists
                    .iter()
                    .take(depth.saturating_sub(1))
                    .map(ListKind::indent)
                    .collect();
                let marker = match self.lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.push(&format!("{indent}{marker}"));
                self.item_start = true;
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "div" | "section" | "article"
            | "header" | "footer" | "table" => self.block_break(),
            "tr" => self.line_break(),
            "td" | "th" => self.push(" "),
            "strong" | "b" => self.push("**"),
            "em" | "i" => self.push("*"),
            "code" => {
                if self.pre_depth == 0 {
                    self.push("`");
                }
            }
            "pre" => {
                if self.pre_depth > 0 {
                    self.pre_depth -= 1;
                    let out = self.out();
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str("```");
                    self.block_break();
                }
            }
            "blockquote" => {
                if matches!(self.captures.last(), Some((Capture::Quote, _))) {
                    if let Some((_, body)) = self.captures.pop() {
                        let quoted = body
                            .trim()
                            .lines()
                            .map(|line| {
                                if line.is_empty() {
                                    ">".to_string()
                                } else {
                                    format!("> {line}")
                                }
                            })
                            .collect::<Vec<_>>()
                            .join("\n");
                        self.block_break();
                        self.push(&quoted);
                        self.block_break();
                    }
                }
            }
            "a" => {
                if matches!(self.captures.last(), Some((Capture::Link(_), _))) {
                    if let Some((Capture::Link(href), body)) = self.captures.pop() {
                        let text = body.trim();
                        if href.is_empty() || text.is_empty() {
                            self.push(text);
                        } else {
                            self.push(&format!("[{text}]({href})"));
                        }
                    }
                }
            }
            "ul" | "ol" => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.line_break();
                }
            }
            "li" => self.line_break(),
            _ => {}
        }
    }

    fn finish(mut self) -> String {
        // Unclosed captures are flushed in order.
        while let Some((_, body)) = self.captures.pop() {
            self.out().push_str(&body);
        }
        tidy_markup(&self.root)
    }
}

fn trim_trailing_spaces(out: &mut String) {
    let len = out.trim_end_matches(' ').len();
    out.truncate(len);
}

fn collapse_inline_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn href_attribute(tag: &str) -> Option<String> {
    static HREF_RE: OnceLock<Regex> = OnceLock::new();
    let href_re = HREF_RE.get_or_init(|| {
        Regex::new(r#"(?i)\shref\s*=\s*["']?([^"'\s>]*)"#).expect("valid href regex")
    });
    attribute_value(href_re, tag)
}

fn start_attribute(tag: &str) -> Option<String> {
    static START_RE: OnceLock<Regex> = OnceLock::new();
    let start_re = START_RE.get_or_init(|| {
        Regex::new(r#"(?i)\sstart\s*=\s*["']?([^"'\s>]*)"#).expect("valid start regex")
    });
    attribute_value(start_re, tag)
}

/// Attribute names are matched only after whitespace, so `data-href` is not
/// taken for `href`.
fn attribute_value(re: &Regex, tag: &str) -> Option<String> {
    re.captures(tag)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
}

fn code_language(tag: &str) -> Option<String> {
    static LANG_RE: OnceLock<Regex> = OnceLock::new();
    let lang_re = LANG_RE
        .get_or_init(|| Regex::new(r#"language-([A-Za-z0-9_+\-.#]+)"#).expect("valid lang regex"));
    lang_re
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn decode_entities(s: &str) -> String {
    static NUMERIC_RE: OnceLock<Regex> = OnceLock::new();

    if !s.contains('&') {
        return s.to_string();
    }

    let numeric_re = NUMERIC_RE
        .get_or_init(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid entity regex"));
    let decoded = numeric_re.replace_all(s, |caps: &regex::Captures| {
        let body = &caps[1];
        let code = match body.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => body.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn tidy_markup(md: &str) -> String {
    static BLANK_RUN_RE: OnceLock<Regex> = OnceLock::new();
    let blank_run_re =
        BLANK_RUN_RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"));

    let trimmed_lines = md
        .split('\n')
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n");
    blank_run_re
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Import normalization
// ---------------------------------------------------------------------------

/// Normalize imported markdown: line endings, trailing whitespace, blank-line
/// runs, bullet glyphs, `1)` numbering and `#Heading` spacing.
pub fn normalize_markup(md: &str) -> String {
    static TRAILING_RE: OnceLock<Regex> = OnceLock::new();
    static BLANKS_RE: OnceLock<Regex> = OnceLock::new();
    static GLYPH_BULLET_RE: OnceLock<Regex> = OnceLock::new();
    static STAR_BULLET_RE: OnceLock<Regex> = OnceLock::new();
    static NUMBERED_RE: OnceLock<Regex> = OnceLock::new();
    static HEADING_RE: OnceLock<Regex> = OnceLock::new();

    if md.is_empty() {
        return String::new();
    }

    let trailing_re =
        TRAILING_RE.get_or_init(|| Regex::new(r"(?m)[\t ]+$").expect("valid trailing regex"));
    let blanks_re = BLANKS_RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid blanks regex"));
    let glyph_bullet_re = GLYPH_BULLET_RE
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*[•·][ \t]+").expect("valid glyph regex"));
    let star_bullet_re = STAR_BULLET_RE
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*\*[ \t]+").expect("valid star regex"));
    let numbered_re = NUMBERED_RE
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*(\d+)[).][ \t]+").expect("valid numbered regex"));
    let heading_re =
        HEADING_RE.get_or_init(|| Regex::new(r"(?m)^(#+)([^#\s])").expect("valid heading regex"));

    let s = md.replace("\r\n", "\n");
    let s = trailing_re.replace_all(&s, "");
    let s = blanks_re.replace_all(&s, "\n\n");
    let s = glyph_bullet_re.replace_all(&s, "- ");
    let s = star_bullet_re.replace_all(&s, "- ");
    let s = numbered_re.replace_all(&s, "$1. ");
    let s = heading_re.replace_all(&s, "$1 $2");
    s.trim().to_string()
}
