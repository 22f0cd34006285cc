/*
 * pragma.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rewriting `#pragma RubyVM reset source` sentinels into `#line` directives.
//!
//! Template code pasted into the generated file is preceded by `#line`
//! directives pointing at the template. The sentinel marks where that pasted
//! region ends; it is replaced by a directive pointing back at the generated
//! file itself, so compiler diagnostics after it name the right place.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::escape::to_quoted_c_string;

/// Sentinel, capturing the whitespace between `#` and `pragma`.
static SENTINEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#(\s*)pragma RubyVM reset source\n").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PragmaRewriter {
    /// Output path as a quoted C string literal.
    output_literal: String,
    line_offset: usize,
}

impl PragmaRewriter {
    pub fn new(output: &str, line_offset: usize) -> Self {
        Self {
            output_literal: to_quoted_c_string(output),
            line_offset,
        }
    }

    pub fn output_literal(&self) -> &str {
        &self.output_literal
    }

    pub fn line_offset(&self) -> usize {
        self.line_offset
    }

    /// Replace every line holding a sentinel; other lines are copied as is.
    pub fn replace_pragma(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rewritten = 0usize;
        for (index, line) in text.split_inclusive('\n').enumerate() {
            match SENTINEL.captures(line) {
                Some(caps) => {
                    let line_number = index + 1 + self.line_offset;
                    out.push('#');
                    out.push_str(&caps[1]);
                    out.push_str(&format!("line {} {}\n", line_number, self.output_literal));
                    rewritten += 1;
                }
                None => out.push_str(line),
            }
        }
        if rewritten > 0 {
            debug!(count = rewritten, "rewrote source pragmas");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sentinel_becomes_line_directive() {
        let rewriter = PragmaRewriter::new("vm.inc", 2);
        let text = "a\nb\nc\nd\n#pragma RubyVM reset source\nf\n";
        assert_eq!(
            rewriter.replace_pragma(text),
            "a\nb\nc\nd\n#line 7 \"vm.inc\"\nf\n"
        );
    }

    #[test]
    fn test_whitespace_after_hash_is_kept() {
        let rewriter = PragmaRewriter::new("vm.inc", 2);
        assert_eq!(
            rewriter.replace_pragma("# \tpragma RubyVM reset source\n"),
            "# \tline 3 \"vm.inc\"\n"
        );
    }

    #[test]
    fn test_whole_line_is_replaced() {
        let rewriter = PragmaRewriter::new("vm.inc", 0);
        assert_eq!(
            rewriter.replace_pragma("x\n  #pragma RubyVM reset source\n"),
            "x\n#line 2 \"vm.inc\"\n"
        );
    }

    #[test]
    fn test_sentinel_needs_newline() {
        let rewriter = PragmaRewriter::new("vm.inc", 2);
        let text = "a\n#pragma RubyVM reset source";
        assert_eq!(rewriter.replace_pragma(text), text);
    }

    #[test]
    fn test_text_without_sentinel_is_unchanged() {
        let rewriter = PragmaRewriter::new("vm.inc", 2);
        let text = "#pragma once\r\n/* #pragma RubyVM */\n\nlast";
        assert_eq!(rewriter.replace_pragma(text), text);
        assert_eq!(rewriter.replace_pragma(""), "");
    }

    #[test]
    fn test_output_path_is_escaped() {
        let rewriter = PragmaRewriter::new("out dir/\"q\".inc", 0);
        assert_eq!(rewriter.output_literal(), r#""out dir/\"q\".inc""#);
        assert_eq!(
            rewriter.replace_pragma("#pragma RubyVM reset source\n"),
            "#line 1 \"out dir/\\\"q\\\".inc\"\n"
        );
    }
}
