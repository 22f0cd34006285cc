/*
 * escape.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Escaping text for C sources.

/// Quote `text` as a C string literal.
///
/// Works on the UTF-8 bytes: printable ASCII is kept, except that `"` and `\`
/// are backslash-escaped and `?` is escaped so no trigraph can form. Control
/// bytes with a named escape use it; every other byte becomes a three-digit
/// octal escape.
pub fn to_quoted_c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for &byte in text.as_bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'?' => out.push_str("\\?"),
            0x07 => out.push_str("\\a"),
            0x08 => out.push_str("\\b"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            0x0b => out.push_str("\\v"),
            0x0c => out.push_str("\\f"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\{:03o}", byte)),
        }
    }
    out.push('"');
    out
}

/// Wrap `text` in a C block comment that cannot be closed or nested early.
pub fn to_comment(text: &str) -> String {
    let body = text.replace("*/", "*\\/").replace("/*", "/\\*");
    format!("/* {} */", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text() {
        assert_eq!(to_quoted_c_string("vm.inc"), "\"vm.inc\"");
        assert_eq!(to_quoted_c_string(""), "\"\"");
    }

    #[test]
    fn test_quotes_and_backslashes() {
        assert_eq!(to_quoted_c_string(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_trigraphs_cannot_form() {
        assert_eq!(to_quoted_c_string("??="), r#""\?\?=""#);
    }

    #[test]
    fn test_control_bytes() {
        assert_eq!(to_quoted_c_string("a\tb\nc\r"), r#""a\tb\nc\r""#);
        assert_eq!(to_quoted_c_string("\u{7}\u{8}\u{b}\u{c}"), r#""\a\b\v\f""#);
        assert_eq!(to_quoted_c_string("\0\u{1b}\u{7f}"), r#""\000\033\177""#);
    }

    #[test]
    fn test_non_ascii_bytes_are_octal() {
        // U+00E9 is C3 A9 in UTF-8
        assert_eq!(to_quoted_c_string("caf\u{e9}"), r#""caf\303\251""#);
    }

    #[test]
    fn test_comment() {
        assert_eq!(to_comment("getlocal"), "/* getlocal */");
        assert_eq!(to_comment("a */ b /* c"), "/* a *\\/ b /\\* c */");
    }
}
