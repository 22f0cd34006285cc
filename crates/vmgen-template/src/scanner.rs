/*
 * scanner.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Splits template source into text and code segments.
//!
//! Recognized tags:
//!
//! - `<%= expr %>` interpolation, `<% code %>` statements, `<%# ... %>` comments
//! - `<%%` and `%%>` produce the literal `<%` and `%>`
//!
//! With percent lines enabled, a line starting with `%` is code up to the end
//! of the line (the newline is consumed) and a line starting with `%%` starts
//! with a literal `%`. With dash trimming enabled, `<%-` at the start of a line
//! removes the indentation before it and `-%>` swallows the newline after it.

use crate::lexer::SyntaxError;

/// Which ERB trim extensions are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimMode {
    /// Plain tags only.
    None,
    /// `%` code lines.
    Percent,
    /// `<%-` / `-%>` trimming.
    Dash,
    /// Both `%` code lines and `-` trimming (ERB's `%-`).
    #[default]
    PercentDash,
}

impl TrimMode {
    pub fn percent_lines(self) -> bool {
        matches!(self, TrimMode::Percent | TrimMode::PercentDash)
    }

    pub fn dash_trim(self) -> bool {
        matches!(self, TrimMode::Dash | TrimMode::PercentDash)
    }
}

/// A piece of template source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    /// Literal text; `offset` is where it starts in the source.
    Text { text: String, offset: usize },
    /// Statement code from `<% %>` or a `%` line; `offset` is where the code starts.
    Code { code: String, offset: usize },
    /// Interpolated expression from `<%= %>`.
    Output { code: String, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Code,
    Output,
    Comment,
}

pub(crate) fn scan(source: &str, trim: TrimMode) -> Result<Vec<Segment>, SyntaxError> {
    Scanner {
        source,
        trim,
        segments: Vec::new(),
        text: String::new(),
        text_offset: 0,
    }
    .run()
}

struct Scanner<'a> {
    source: &'a str,
    trim: TrimMode,
    segments: Vec<Segment>,
    text: String,
    text_offset: usize,
}

impl Scanner<'_> {
    fn run(mut self) -> Result<Vec<Segment>, SyntaxError> {
        let source = self.source;
        let bytes = source.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            let at_line_start = i == 0 || bytes[i - 1] == b'\n';

            if at_line_start && self.trim.percent_lines() && bytes[i] == b'%' {
                if bytes.get(i + 1) == Some(&b'%') {
                    self.push_text(i, "%");
                    i += 2;
                    continue;
                }
                let line_end = source[i..].find('\n').map_or(bytes.len(), |p| i + p);
                self.flush_text();
                self.segments.push(Segment::Code {
                    code: source[i + 1..line_end].to_string(),
                    offset: i + 1,
                });
                i = (line_end + 1).min(bytes.len());
                continue;
            }

            let rest = &source[i..];
            if rest.starts_with("<%%") {
                self.push_text(i, "<%");
                i += 3;
            } else if rest.starts_with("%%>") {
                self.push_text(i, "%>");
                i += 3;
            } else if rest.starts_with("<%") {
                i = self.scan_tag(i)?;
            } else if let Some(c) = rest.chars().next() {
                let mut buf = [0u8; 4];
                self.push_text(i, c.encode_utf8(&mut buf));
                i += c.len_utf8();
            } else {
                break;
            }
        }

        self.flush_text();
        Ok(self.segments)
    }

    /// Scan a tag starting at `start` (which points at `<%`); returns the
    /// offset just past the tag and any newline it swallowed.
    fn scan_tag(&mut self, start: usize) -> Result<usize, SyntaxError> {
        let source = self.source;
        let bytes = source.as_bytes();
        let mut i = start + 2;

        if self.trim.dash_trim() && bytes.get(i) == Some(&b'-') {
            i += 1;
            self.trim_indentation(start);
        }

        let kind = match bytes.get(i) {
            Some(b'=') => {
                i += 1;
                TagKind::Output
            }
            Some(b'#') => {
                i += 1;
                TagKind::Comment
            }
            _ => TagKind::Code,
        };

        let content_offset = i;
        let mut content = String::new();
        let close = loop {
            let Some(found) = source[i..].find("%>") else {
                return Err(SyntaxError::new("unterminated tag: missing `%>`", start));
            };
            let close = i + found;
            if close > content_offset && bytes[close - 1] == b'%' {
                // `%%>` inside a tag is a literal `%>`
                content.push_str(&source[i..close - 1]);
                content.push_str("%>");
                i = close + 2;
                continue;
            }
            content.push_str(&source[i..close]);
            break close;
        };

        let mut end = close + 2;
        if self.trim.dash_trim() && content.ends_with('-') {
            content.pop();
            if bytes.get(end) == Some(&b'\n') {
                end += 1;
            }
        }

        match kind {
            TagKind::Comment => {}
            TagKind::Code => {
                self.flush_text();
                self.segments.push(Segment::Code {
                    code: content,
                    offset: content_offset,
                });
            }
            TagKind::Output => {
                self.flush_text();
                self.segments.push(Segment::Output {
                    code: content,
                    offset: content_offset,
                });
            }
        }

        Ok(end)
    }

    /// `<%-`: drop the spaces/tabs between the start of the line and the tag,
    /// but only when nothing else precedes the tag on that line.
    fn trim_indentation(&mut self, tag_start: usize) {
        let line_begin = self.source[..tag_start].rfind('\n').map_or(0, |p| p + 1);
        let indent = &self.source[line_begin..tag_start];
        if indent.bytes().all(|b| b == b' ' || b == b'\t') && self.text.ends_with(indent) {
            self.text.truncate(self.text.len() - indent.len());
        }
    }

    fn push_text(&mut self, offset: usize, s: &str) {
        if self.text.is_empty() {
            self.text_offset = offset;
        }
        self.text.push_str(s);
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.segments.push(Segment::Text {
                text: std::mem::take(&mut self.text),
                offset: self.text_offset,
            });
        }
    }
}
