//! Bracket and string aware scanning over script text
//!
//! All offsets are byte offsets into the borrowed source. Every delimiter the
//! scanner reacts to is ASCII, so returned spans always fall on UTF-8
//! character boundaries.

use crate::error::CipherError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Half-open byte range over a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Borrow the text this span covers
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Extracted substring together with the span it was found at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    text: &'a str,
    span: Span,
}

impl<'a> Match<'a> {
    /// Create a match for `span` within `source`
    pub fn new(source: &'a str, span: Span) -> Self {
        Self {
            text: span.slice(source),
            span,
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }
}

fn closer_for(open: u8) -> u8 {
    match open {
        b'{' => b'}',
        b'[' => b']',
        _ => b'"',
    }
}

/// Find the span of the object or array literal opening at `start`.
///
/// The byte at `start` must be `{` or `[`. Nested brackets and double-quoted
/// strings (with backslash escapes) are skipped; the returned span ends just
/// past the matching closing bracket.
pub fn find_closing_bracket(text: &str, start: usize) -> Result<Span> {
    let bytes = text.as_bytes();
    let first = match bytes.get(start) {
        Some(&b) if b == b'{' || b == b'[' => b,
        _ => {
            let found = text
                .get(start..)
                .and_then(|rest| rest.chars().next())
                .map(|c| format!("{:?}", c))
                .unwrap_or_else(|| "end of input".to_string());
            return Err(CipherError::MalformedInput(format!(
                "expected '{{' or '[' at offset {}, found {}",
                start, found
            )));
        }
    };

    let mut stack = vec![first];
    let mut i = start + 1;
    while let Some(&context) = stack.last() {
        let Some(&c) = bytes.get(i) else {
            return Err(CipherError::UnterminatedLiteral(start));
        };

        if context == b'"' {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == b'"' {
                stack.pop();
            }
        } else if c == closer_for(context) {
            stack.pop();
        } else if matches!(c, b'{' | b'[' | b'"') {
            stack.push(c);
        }
        i += 1;
    }

    Ok(Span::new(start, i))
}

/// Like [`find_closing_bracket`], but returns the literal text as a [`Match`]
pub fn literal_at(text: &str, start: usize) -> Result<Match<'_>> {
    let span = find_closing_bracket(text, start)?;
    Ok(Match::new(text, span))
}

/// Offset of the first comma in `text` that is not nested inside brackets,
/// parentheses or a quoted string.
pub fn find_top_level_comma(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == b'\\' {
                    i += 1;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }

    None
}

/// Split `text` on every top-level comma, trimming surrounding whitespace.
/// Trailing empty pieces (from a trailing comma) are dropped.
pub fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(i) = find_top_level_comma(rest) {
        pieces.push(rest[..i].trim());
        rest = &rest[i + 1..];
    }
    let last = rest.trim();
    if !last.is_empty() {
        pieces.push(last);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_closing_bracket_object() {
        let text = "{a:1,b:[2,3]}XYZ";
        let span = find_closing_bracket(text, 0).unwrap();
        assert_eq!(span, Span::new(0, 13));
        assert_eq!(span.len(), 13);
        assert!(!span.is_empty());
        assert_eq!(span.slice(text), "{a:1,b:[2,3]}");
        assert_eq!(&text[span.end..], "XYZ");
    }

    #[test]
    fn test_find_closing_bracket_embedded_offset() {
        let text = r#"var x = ["a]", {"k": "}"}, [[]]]; rest"#;
        let start = text.find('[').unwrap();
        let m = literal_at(text, start).unwrap();
        assert_eq!(m.as_str(), r#"["a]", {"k": "}"}, [[]]]"#);
        assert_eq!(m.start(), start);
        assert_eq!(&text[m.end()..], "; rest");
    }

    #[test]
    fn test_find_closing_bracket_escaped_quotes() {
        let text = r#"{"say \"}\" now":[1]} tail"#;
        let span = find_closing_bracket(text, 0).unwrap();
        assert_eq!(span.slice(text), r#"{"say \"}\" now":[1]}"#);
    }

    #[test]
    fn test_find_closing_bracket_escaped_backslash() {
        let text = r#"["a\\",1]x"#;
        let span = find_closing_bracket(text, 0).unwrap();
        assert_eq!(span.slice(text), r#"["a\\",1]"#);
    }

    #[test]
    fn test_find_closing_bracket_malformed_start() {
        let err = find_closing_bracket("abc{}", 0).unwrap_err();
        assert!(matches!(err, CipherError::MalformedInput(_)));

        let err = find_closing_bracket("{}", 10).unwrap_err();
        assert!(matches!(err, CipherError::MalformedInput(_)));
    }

    #[test]
    fn test_find_closing_bracket_unterminated() {
        assert!(matches!(
            find_closing_bracket("{a:[1,2}", 0),
            Err(CipherError::UnterminatedLiteral(0))
        ));
        assert!(matches!(
            find_closing_bracket(r#"x["abc\"]"#, 1),
            Err(CipherError::UnterminatedLiteral(1))
        ));
        assert!(matches!(
            find_closing_bracket("[\"\\", 0),
            Err(CipherError::UnterminatedLiteral(0))
        ));
    }

    #[test]
    fn test_find_closing_bracket_non_ascii() {
        let text = "é[\"ü\",{}]ö";
        let start = text.find('[').unwrap();
        let span = find_closing_bracket(text, start).unwrap();
        assert_eq!(span.slice(text), "[\"ü\",{}]");
    }

    #[test]
    fn test_find_top_level_comma() {
        assert_eq!(find_top_level_comma("1,2"), Some(1));
        assert_eq!(find_top_level_comma(r#""x,y",z"#), Some(5));
        assert_eq!(find_top_level_comma("f(a,b),c"), Some(6));
        assert_eq!(find_top_level_comma("{a:[1,2]}"), None);
        assert_eq!(find_top_level_comma(r#"'it\'s,',1"#), Some(8));
    }

    #[test]
    fn test_split_top_level_commas() {
        let pieces = split_top_level_commas("AJ:function(a){a.reverse()},\nVR:function(a,b){a.splice(0,b)},");
        assert_eq!(
            pieces,
            vec!["AJ:function(a){a.reverse()}", "VR:function(a,b){a.splice(0,b)}"]
        );
        assert!(split_top_level_commas("  ").is_empty());
    }
}
