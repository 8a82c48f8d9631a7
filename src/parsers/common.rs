use anyhow::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::Range;
use std::path::Path;

/// Byte written over comment bodies and literal interiors.
pub const FILLER: u8 = b' ';

pub const TYPE_KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "bool",
    "auto", "wchar_t", "char16_t", "char32_t",
];

pub const QUALIFIERS: &[&str] = &[
    "const", "volatile", "static", "extern", "inline", "constexpr", "register", "thread_local",
    "mutable", "virtual", "explicit", "friend", "typename", "struct", "class", "union", "enum",
];

pub const STATEMENT_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "default", "break", "continue",
    "return", "goto", "sizeof", "new", "delete", "throw", "try", "catch", "using", "namespace",
    "typedef", "template", "operator", "this", "true", "false", "nullptr", "public", "private",
    "protected", "alignof", "decltype", "static_assert",
];

pub fn is_type_keyword(word: &str) -> bool {
    TYPE_KEYWORDS.contains(&word)
}

pub fn is_qualifier(word: &str) -> bool {
    QUALIFIERS.contains(&word)
}

pub fn is_statement_keyword(word: &str) -> bool {
    STATEMENT_KEYWORDS.contains(&word)
}

pub fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

pub fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Buffered whole-file read, sized from the file metadata.
pub fn read_source(file_path: &Path) -> Result<String> {
    let file = File::open(file_path)?;
    let file_size = file.metadata()?.len() as usize;

    let mut reader =
        BufReader::with_capacity(if file_size < 8192 { file_size.max(1) } else { 8192 }, file);

    let mut content = String::with_capacity(file_size);
    reader.read_to_string(&mut content)?;
    Ok(content)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Literal,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Absolute byte offsets into the unit text.
    pub start: usize,
    pub end: usize,
}

impl<'a> Token<'a> {
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

const TWO_CHAR_PUNCT: &[&str] = &["::", "->", "==", "!=", "<=", ">=", "&&", "||", "+=", "-="];

/// Tokenize a slice of normalized text. `base` is the absolute offset of the
/// slice so token offsets can be mapped back onto the raw text.
pub fn tokenize(text: &str, base: usize) -> Vec<Token<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let kind = if is_ident_start(b) {
            while i < bytes.len() && is_ident_continue(bytes[i]) {
                i += 1;
            }
            TokenKind::Ident
        } else if b.is_ascii_digit() {
            while i < bytes.len() && (is_ident_continue(bytes[i]) || bytes[i] == b'.') {
                i += 1;
            }
            TokenKind::Number
        } else if b == b'"' || b == b'\'' {
            i += 1;
            while i < bytes.len() && bytes[i] != b && bytes[i] != b'\n' {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b {
                i += 1;
            }
            TokenKind::Literal
        } else if text[i..].starts_with("...") {
            i += 3;
            TokenKind::Punct
        } else if i + 1 < bytes.len() && TWO_CHAR_PUNCT.contains(&&text[i..i + 2]) {
            i += 2;
            TokenKind::Punct
        } else {
            i += 1;
            TokenKind::Punct
        };

        tokens.push(Token {
            kind,
            text: &text[start..i],
            start: base + start,
            end: base + i,
        });
    }

    tokens
}

/// Identifiers of a normalized text, in order of appearance.
pub fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    tokenize(text, 0)
        .into_iter()
        .filter(|token| token.kind == TokenKind::Ident)
        .map(|token| token.text)
}

/// Index of the token closing the group opened at `open`, honouring nesting of
/// the same bracket pair.
pub fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let (opener, closer) = match tokens.get(open)?.text {
        "(" => ("(", ")"),
        "[" => ("[", "]"),
        "{" => ("{", "}"),
        "<" => ("<", ">"),
        _ => return None,
    };
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        if token.is(opener) {
            depth += 1;
        } else if token.is(closer) {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

/// Index of the token opening the group closed at `close`.
pub fn matching_open(tokens: &[Token<'_>], close: usize) -> Option<usize> {
    let (opener, closer) = match tokens.get(close)?.text {
        ")" => ("(", ")"),
        "]" => ("[", "]"),
        ">" => ("<", ">"),
        _ => return None,
    };
    let mut depth = 0usize;
    for idx in (0..=close).rev() {
        if tokens[idx].is(closer) {
            depth += 1;
        } else if tokens[idx].is(opener) {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

/// Split tokens on commas that sit outside any bracket group.
pub fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, token) in tokens.iter().enumerate() {
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            "," if depth == 0 => {
                parts.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        Self { starts }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.starts[line] + 1)
    }

    pub fn line_start(&self, offset: usize) -> usize {
        let (line, _) = self.line_col(offset);
        self.starts[line - 1]
    }
}

/// Raw text of `range` with every comment removed and trailing whitespace
/// trimmed from each line.
pub fn code_text(raw: &str, range: Range<usize>, comments: &[Range<usize>]) -> String {
    let mut kept = String::with_capacity(range.len());
    let mut cursor = range.start;
    for comment in comments
        .iter()
        .filter(|c| c.start < range.end && c.end > range.start)
    {
        let start = comment.start.max(range.start);
        if start > cursor {
            kept.push_str(&raw[cursor..start]);
        }
        cursor = cursor.max(comment.end.min(range.end));
    }
    if cursor < range.end {
        kept.push_str(&raw[cursor..range.end]);
    }

    kept.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Collapse every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Header guard identifier for a file name: `my-util.h` -> `MY_UTIL_H`.
pub fn guard_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
