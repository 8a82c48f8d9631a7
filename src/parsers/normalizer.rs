//! Comment and literal masking.
//!
//! The normalized text has exactly the byte length of the raw text. Comment
//! bodies and literal interiors are overwritten with [`FILLER`], newlines are
//! kept, so every offset and line number of the raw text stays valid.

use std::ops::Range;

use super::common::FILLER;

#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    /// Byte ranges of every comment, sorted, non-overlapping.
    pub comments: Vec<Range<usize>>,
    pub malformed: Vec<MalformedSpan>,
}

/// An unterminated comment or literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedSpan {
    pub offset: usize,
    pub construct: &'static str,
}

impl NormalizedText {
    pub fn in_comment(&self, offset: usize) -> bool {
        let idx = self.comments.partition_point(|c| c.end <= offset);
        self.comments
            .get(idx)
            .map(|c| c.start <= offset && offset < c.end)
            .unwrap_or(false)
    }
}

pub fn normalize(raw: &str) -> NormalizedText {
    let src = raw.as_bytes();
    let mut out: Vec<u8> = src
        .iter()
        .map(|&b| if b.is_ascii() { b } else { FILLER })
        .collect();
    let mut comments = Vec::new();
    let mut malformed = Vec::new();
    let len = src.len();
    let mut i = 0;

    while i < len {
        match src[i] {
            b'/' if src.get(i + 1) == Some(&b'/') => {
                let end = line_comment_end(src, i);
                blank(&mut out, i..end);
                comments.push(i..end);
                i = end;
            }
            b'/' if src.get(i + 1) == Some(&b'*') => {
                let end = match find(src, i + 2, b"*/") {
                    Some(close) => close + 2,
                    None => {
                        malformed.push(MalformedSpan {
                            offset: i,
                            construct: "block comment",
                        });
                        len
                    }
                };
                blank(&mut out, i..end);
                comments.push(i..end);
                i = end;
            }
            b'"' | b'\'' if !is_digit_separator(src, i) => {
                let (end, construct) = match src[i] {
                    b'"' if is_raw_string_prefix(src, i) => {
                        (mask_raw_string(src, &mut out, i), "raw string literal")
                    }
                    b'"' => (mask_quoted(src, &mut out, i, b'"'), "string literal"),
                    _ => (mask_quoted(src, &mut out, i, b'\''), "character literal"),
                };
                i = match end {
                    Some(end) => end,
                    None => {
                        // the rest of the file is treated as comment
                        malformed.push(MalformedSpan {
                            offset: i,
                            construct,
                        });
                        blank(&mut out, i + 1..len);
                        comments.push(i + 1..len);
                        len
                    }
                };
            }
            _ => i += 1,
        }
    }

    NormalizedText {
        text: out.into_iter().map(char::from).collect(),
        comments,
        malformed,
    }
}

fn blank(out: &mut [u8], range: Range<usize>) {
    for byte in &mut out[range] {
        if *byte != b'\n' {
            *byte = FILLER;
        }
    }
}

fn find(src: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    src.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}

/// A line comment runs to the first newline not escaped by a backslash.
fn line_comment_end(src: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < src.len() {
        if src[i] == b'\n' && !escaped_newline(src, i) {
            return i;
        }
        i += 1;
    }
    src.len()
}

fn escaped_newline(src: &[u8], newline: usize) -> bool {
    let mut j = newline;
    if j > 0 && src[j - 1] == b'\r' {
        j -= 1;
    }
    j > 0 && src[j - 1] == b'\\'
}

fn is_raw_string_prefix(src: &[u8], quote: usize) -> bool {
    quote > 0
        && src[quote - 1] == b'R'
        && (quote < 2 || !src[quote - 2].is_ascii_alphanumeric() || src[quote - 2] == b'8')
}

/// Masks `R"delim( ... )delim"`; the quotes and delimiters stay visible.
/// `None` when the literal never closes.
fn mask_raw_string(src: &[u8], out: &mut [u8], quote: usize) -> Option<usize> {
    let Some(open) = src[quote + 1..]
        .iter()
        .take(17)
        .position(|&b| b == b'(')
        .map(|pos| quote + 1 + pos)
    else {
        return mask_quoted(src, out, quote, b'"');
    };

    let mut terminator = Vec::with_capacity(open - quote + 1);
    terminator.push(b')');
    terminator.extend_from_slice(&src[quote + 1..open]);
    terminator.push(b'"');

    let close = find(src, open + 1, &terminator)?;
    blank(out, open + 1..close);
    Some(close + terminator.len())
}

/// Masks the interior of a quoted literal. `None` when an unescaped newline
/// or the end of the text comes first.
fn mask_quoted(src: &[u8], out: &mut [u8], open: usize, quote: u8) -> Option<usize> {
    let mut i = open + 1;
    while i < src.len() {
        match src[i] {
            b'\\' => {
                out[i] = FILLER;
                if let Some(next) = out.get_mut(i + 1) {
                    if *next != b'\n' {
                        *next = FILLER;
                    }
                }
                i += 2;
            }
            b if b == quote => return Some(i + 1),
            b'\n' => return None,
            _ => {
                out[i] = FILLER;
                i += 1;
            }
        }
    }
    None
}

/// `'` inside a number token, as in `1'000'000` or `0xFF'FF`. A prefixed
/// character literal such as `u8'a'` starts with a letter.
fn is_digit_separator(src: &[u8], quote: usize) -> bool {
    if src[quote] != b'\'' || quote == 0 || !src[quote - 1].is_ascii_alphanumeric() {
        return false;
    }
    let start = src[..quote]
        .iter()
        .rposition(|&b| !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'\'')))
        .map(|pos| pos + 1)
        .unwrap_or(0);
    src[start].is_ascii_digit()
}
