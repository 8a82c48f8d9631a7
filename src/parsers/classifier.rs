//! Top-level declaration classifier.
//!
//! Walks normalized text once, tracking brace scope, parenthesis nesting and
//! conditional-compilation frames. Only constructs seen at scope depth 0 are
//! turned into [`Declaration`]s; anything inside a function body, type body or
//! initializer is never reclassified.

use regex::Regex;
use std::mem;
use std::ops::Range;
use std::sync::OnceLock;

use super::common::{
    code_text, collapse_whitespace, is_ident_continue, is_qualifier, is_statement_keyword,
    is_type_keyword, matching_close, matching_open, split_top_level, tokenize, LineIndex, Token,
    TokenKind,
};
use super::normalizer::NormalizedText;
use super::{
    BranchRef, DeclDetail, DeclKind, Declaration, HeaderGuard, IncludeDirective, Storage, UnitId,
};
use crate::core::{Diagnostic, DiagnosticKind, Location};

#[derive(Debug, Default)]
pub struct Classification {
    pub declarations: Vec<Declaration>,
    pub includes: Vec<IncludeDirective>,
    pub guard: Option<HeaderGuard>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn classify(
    unit: UnitId,
    file: &str,
    raw: &str,
    normalized: &NormalizedText,
    lines: &LineIndex,
) -> Classification {
    let mut classifier = Classifier {
        unit,
        file,
        raw,
        normalized,
        norm: normalized.text.as_bytes(),
        lines,
        braces: Vec::new(),
        paren: 0,
        frames: Vec::new(),
        next_frame: 0,
        stmt_start: None,
        pending: Pending::None,
        seen_code: false,
        guard_define: None,
        out: Classification::default(),
    };

    for span in &normalized.malformed {
        let message = if span.construct == "block comment" {
            format!("unterminated {}; remainder of file treated as comment", span.construct)
        } else {
            format!("unterminated {}", span.construct)
        };
        classifier.warn(DiagnosticKind::MalformedLiteral, span.offset, message);
    }

    classifier.run();
    classifier.out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BraceKind {
    /// Body of a free function definition.
    Function,
    /// struct/class/union/enum body; the statement continues to `;`.
    TypeBody,
    /// `= { .. }` or brace-init; the statement continues to `;`.
    Initializer,
    /// Braces inside a statement that is already being tracked.
    Nested,
    /// namespace, method bodies and anything unrecognised.
    Opaque,
    /// `extern "C" { .. }`: contents stay at top level.
    Transparent,
}

#[derive(Debug)]
struct Frame {
    id: usize,
    guard: bool,
    directives: Vec<String>,
}

#[derive(Debug)]
struct FunctionHead {
    name: String,
    signature: String,
    signature_span: Range<usize>,
    defaults: Vec<Range<usize>>,
    is_static: bool,
}

/// What a `name(...)` head in front of a `{` declares.
#[derive(Debug)]
enum Head {
    Free(FunctionHead),
    /// `Type::name(...)`, a method of a class defined elsewhere.
    Method,
}

#[derive(Debug, Default)]
enum Pending {
    #[default]
    None,
    Function(FunctionHead),
    Type,
    Initializer,
}

struct Classifier<'a> {
    unit: UnitId,
    file: &'a str,
    raw: &'a str,
    normalized: &'a NormalizedText,
    norm: &'a [u8],
    lines: &'a LineIndex,
    braces: Vec<(BraceKind, usize)>,
    paren: usize,
    frames: Vec<Frame>,
    next_frame: usize,
    stmt_start: Option<usize>,
    pending: Pending,
    seen_code: bool,
    guard_define: Option<usize>,
    out: Classification,
}

impl<'a> Classifier<'a> {
    fn run(&mut self) {
        let len = self.norm.len();
        let mut line_blank = true;
        let mut i = 0;

        while i < len {
            let b = self.norm[i];
            if b == b'\n' {
                line_blank = true;
                i += 1;
                continue;
            }
            if b.is_ascii_whitespace() {
                i += 1;
                continue;
            }
            if b == b'#' && line_blank {
                let end = self.directive_end(i);
                self.directive(i, end);
                i = end;
                continue;
            }

            line_blank = false;
            self.seen_code = true;
            let depth = self.scope_depth();
            if depth == 0 && self.stmt_start.is_none() && b != b'}' {
                self.stmt_start = Some(i);
            }

            match b {
                b'(' => self.paren += 1,
                b')' => self.paren = self.paren.saturating_sub(1),
                b'{' => self.open_brace(i),
                b'}' => self.close_brace(i),
                b';' if depth == 0 && self.paren == 0 => self.end_statement(i),
                _ => {}
            }
            i += 1;
        }

        self.finish();
    }

    fn scope_depth(&self) -> usize {
        self.braces
            .iter()
            .filter(|(kind, _)| *kind != BraceKind::Transparent)
            .count()
    }

    fn location(&self, offset: usize) -> Location {
        let (line, column) = self.lines.line_col(offset);
        Location {
            file: self.file.to_string(),
            line,
            column,
        }
    }

    fn warn(&mut self, kind: DiagnosticKind, offset: usize, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(kind, self.location(offset), message);
        self.out.diagnostics.push(diagnostic);
    }

    fn text(&self, range: Range<usize>) -> &'a str {
        &self.normalized.text[range]
    }

    fn code(&self, range: Range<usize>) -> String {
        code_text(self.raw, range, &self.normalized.comments)
    }

    fn active_conditions(&self) -> Vec<BranchRef> {
        self.frames
            .iter()
            .filter(|frame| !frame.guard)
            .map(|frame| BranchRef {
                frame: frame.id,
                branch: frame.directives.len() - 1,
                directives: frame.directives.clone(),
            })
            .collect()
    }

    fn push(&mut self, kind: DeclKind, name: &str, span: Range<usize>, detail: DeclDetail) {
        let line = self.lines.line_col(span.start).0;
        let conditions = self.active_conditions();
        self.out.declarations.push(Declaration {
            kind,
            name: name.to_string(),
            unit: self.unit,
            span,
            line,
            scope_depth: self.scope_depth(),
            conditions,
            detail,
        });
    }

    // ---------------------------------------------------------------- braces

    fn open_brace(&mut self, pos: usize) {
        if self.scope_depth() > 0
            || self.paren > 0
            || !matches!(self.pending, Pending::None)
        {
            self.braces.push((BraceKind::Nested, pos));
            return;
        }

        let start = self.stmt_start.unwrap_or(pos);
        let tokens = tokenize(self.text(start..pos), start);
        let kind = self.classify_head(&tokens);
        if kind == BraceKind::Transparent {
            self.stmt_start = None;
        }
        self.braces.push((kind, pos));
    }

    fn classify_head(&mut self, tokens: &[Token<'a>]) -> BraceKind {
        let Some(first) = tokens.first() else {
            return BraceKind::Opaque;
        };

        if first.is("extern") && tokens.len() == 2 && tokens[1].kind == TokenKind::Literal {
            return BraceKind::Transparent;
        }
        if first.is("namespace") {
            return BraceKind::Opaque;
        }
        if has_top_level(skip_template_prefix(tokens), "=") {
            self.pending = Pending::Initializer;
            return BraceKind::Initializer;
        }

        match self.function_head(tokens) {
            Some(Head::Free(head)) => {
                self.pending = Pending::Function(head);
                return BraceKind::Function;
            }
            Some(Head::Method) => return BraceKind::Opaque,
            None => {}
        }

        let body = skip_template_prefix(tokens);
        let body = match body.first() {
            Some(t) if t.is("typedef") => &body[1..],
            _ => body,
        };
        if body
            .first()
            .map(|t| matches!(t.text, "struct" | "class" | "union" | "enum"))
            .unwrap_or(false)
        {
            self.pending = Pending::Type;
            return BraceKind::TypeBody;
        }

        let brace_init = tokens.len() >= 2
            && !is_statement_keyword(first.text)
            && tokens
                .last()
                .map(|t| t.is_ident() || t.is("]"))
                .unwrap_or(false);
        if brace_init {
            self.pending = Pending::Initializer;
            return BraceKind::Initializer;
        }

        BraceKind::Opaque
    }

    /// `None` when the tokens do not end in a parameter list.
    fn function_head(&self, tokens: &[Token<'a>]) -> Option<Head> {
        let first = tokens.first()?;

        // trailing return type or constructor initializer list
        let mut end = tokens.len();
        let mut depth = 0i32;
        for (idx, token) in tokens.iter().enumerate() {
            match token.text {
                "(" | "[" => depth += 1,
                ")" | "]" => depth -= 1,
                "->" | ":" if depth == 0 && tokens[..idx].iter().any(|t| t.is(")")) => {
                    end = idx;
                    break;
                }
                _ => {}
            }
        }
        let head = &tokens[..end];

        let mut close = head.len();
        let open = loop {
            let last = head.get(close.checked_sub(1)?)?;
            if last.is_ident()
                && matches!(
                    last.text,
                    "const" | "override" | "final" | "volatile" | "mutable" | "noexcept"
                )
            {
                close -= 1;
                continue;
            }
            if !last.is(")") {
                return None;
            }
            let open = matching_open(&head[..close], close - 1)?;
            if open > 0 && matches!(head[open - 1].text, "noexcept" | "throw") {
                close = open - 1;
                continue;
            }
            break open;
        };

        let name_idx = open.checked_sub(1)?;
        let name = head[name_idx];
        if !name.is_ident()
            || is_statement_keyword(name.text)
            || is_type_keyword(name.text)
            || is_qualifier(name.text)
        {
            return None;
        }

        let type_tokens = skip_template_prefix(&head[..name_idx]);
        if type_tokens.is_empty() {
            return None;
        }
        if type_tokens
            .iter()
            .any(|t| is_statement_keyword(t.text) && !t.is("template"))
        {
            return None;
        }
        if type_tokens
            .last()
            .map(|t| t.is("::") || t.is("~"))
            .unwrap_or(false)
        {
            return Some(Head::Method);
        }

        let signature_span = first.start..head[head.len() - 1].end;
        let signature = collapse_whitespace(&self.code(signature_span.clone()));

        let defaults = split_top_level(&head[open + 1..close - 1])
            .into_iter()
            .filter_map(|param| {
                let eq = param.iter().position(|t| t.is("="))?;
                let last = param.last()?;
                Some(param[eq].start..last.end)
            })
            .collect();

        Some(Head::Free(FunctionHead {
            name: name.text.to_string(),
            signature,
            signature_span,
            defaults,
            is_static: type_tokens.iter().any(|t| t.is("static")),
        }))
    }

    fn close_brace(&mut self, pos: usize) {
        let Some((kind, open)) = self.braces.pop() else {
            self.warn(
                DiagnosticKind::StructuralAmbiguity,
                pos,
                "closing brace without matching opening brace ignored",
            );
            return;
        };
        if self.scope_depth() > 0 {
            return;
        }

        match kind {
            BraceKind::Function => {
                if let Pending::Function(head) = mem::take(&mut self.pending) {
                    let span = head.signature_span.start..pos + 1;
                    self.push(
                        DeclKind::FunctionSignature,
                        &head.name,
                        span,
                        DeclDetail::Function {
                            signature: head.signature,
                            signature_span: head.signature_span,
                            defaults: head.defaults,
                            is_static: head.is_static,
                        },
                    );
                }
                self.stmt_start = None;
                self.paren = 0;
            }
            BraceKind::Opaque => {
                self.stmt_start = None;
                self.pending = Pending::None;
                self.paren = 0;
            }
            BraceKind::Transparent => {
                if self.stmt_start.map(|start| start > open).unwrap_or(false) {
                    self.warn(
                        DiagnosticKind::StructuralAmbiguity,
                        pos,
                        "unterminated statement inside linkage block skipped",
                    );
                }
                self.stmt_start = None;
            }
            BraceKind::TypeBody | BraceKind::Initializer | BraceKind::Nested => {}
        }
    }

    // ------------------------------------------------------------ statements

    fn end_statement(&mut self, terminator: usize) {
        let Some(start) = self.stmt_start.take() else {
            return;
        };
        let pending = mem::take(&mut self.pending);
        self.paren = 0;

        let tokens = tokenize(self.text(start..terminator), start);
        if tokens.is_empty() {
            return;
        }

        match pending {
            Pending::Type => self.type_statement(&tokens, start, terminator),
            _ => self.plain_statement(&tokens, start, terminator),
        }
    }

    fn type_statement(&mut self, tokens: &[Token<'a>], start: usize, terminator: usize) {
        let body = skip_template_prefix(tokens);
        let (is_typedef, body) = match body.first() {
            Some(t) if t.is("typedef") => (true, &body[1..]),
            _ => (false, body),
        };

        let Some(open) = body.iter().position(|t| t.is("{")) else {
            return;
        };
        let Some(close) = matching_close(body, open) else {
            self.warn(
                DiagnosticKind::StructuralAmbiguity,
                start,
                "type body could not be delimited; left in place",
            );
            return;
        };
        let trailing = &body[close + 1..];

        let tag = body[1..open]
            .iter()
            .take_while(|t| !t.is(":"))
            .find(|t| t.is_ident() && !matches!(t.text, "class" | "struct"))
            .map(|t| t.text);

        let (name, has_declarators) = if is_typedef {
            match trailing.iter().rev().find(|t| t.is_ident()) {
                Some(alias) => (alias.text, false),
                None => return,
            }
        } else {
            match tag {
                Some(tag) => (tag, trailing.iter().any(|t| t.is_ident())),
                None => {
                    if trailing.iter().any(|t| t.is_ident()) {
                        self.warn(
                            DiagnosticKind::StructuralAmbiguity,
                            start,
                            "anonymous aggregate declares variables; left in place",
                        );
                    }
                    return;
                }
            }
        };

        let span = start..terminator + 1;
        let text = self.code(span.clone());
        self.push(
            DeclKind::TypeDecl,
            name,
            span,
            DeclDetail::Type {
                text,
                has_declarators,
            },
        );
    }

    fn plain_statement(&mut self, tokens: &[Token<'a>], start: usize, terminator: usize) {
        let first = tokens[0];

        if first.is("typedef") {
            self.typedef_statement(tokens, start, terminator);
            return;
        }
        if matches!(first.text, "extern" | "friend") || is_statement_keyword(first.text) {
            return;
        }
        // forward declarations: `struct Foo;`, `enum class Mode;`
        if matches!(first.text, "struct" | "class" | "union" | "enum")
            && (tokens.len() == 2
                || (tokens.len() == 3 && matches!(tokens[1].text, "class" | "struct")))
        {
            return;
        }

        self.variable_statement(tokens, start, terminator);
    }

    fn typedef_statement(&mut self, tokens: &[Token<'a>], start: usize, terminator: usize) {
        // typedef void (*callback_t)(int);
        let pointer_alias = tokens.windows(4).find_map(|w| {
            (w[0].is("(") && w[1].is("*") && w[2].is_ident() && w[3].is(")")).then_some(w[2].text)
        });
        let name = pointer_alias.or_else(|| {
            tokens
                .iter()
                .rev()
                .find(|t| t.is_ident() && !is_type_keyword(t.text) && !is_qualifier(t.text))
                .map(|t| t.text)
        });
        let Some(name) = name else {
            return;
        };

        let span = start..terminator + 1;
        let text = self.code(span.clone());
        self.push(
            DeclKind::TypeDecl,
            name,
            span,
            DeclDetail::Type {
                text,
                has_declarators: false,
            },
        );
    }

    fn variable_statement(&mut self, tokens: &[Token<'a>], start: usize, terminator: usize) {
        let boundary = declarator_boundary(tokens);
        let head = &tokens[..boundary];

        let Some(name_idx) = head.len().checked_sub(1) else {
            return;
        };
        let name = head[name_idx];
        let next = tokens.get(boundary);

        if !name.is_ident()
            || is_statement_keyword(name.text)
            || is_type_keyword(name.text)
            || is_qualifier(name.text)
        {
            let function_pointer = next.map(|t| t.is("(")).unwrap_or(false)
                && tokens.get(boundary + 1).map(|t| t.is("*")).unwrap_or(false);
            if function_pointer {
                self.warn(
                    DiagnosticKind::StructuralAmbiguity,
                    start,
                    "function pointer declarator not classified; left in place",
                );
            }
            return;
        }

        let mut type_end = name_idx;
        while type_end > 0 && matches!(head[type_end - 1].text, "*" | "&" | "&&") {
            type_end -= 1;
        }
        let type_tokens = &head[..type_end];
        if type_tokens.is_empty() || type_tokens.iter().any(|t| is_statement_keyword(t.text)) {
            return;
        }

        // `Type name(args);` is either a prototype or a constructed object
        if next.map(|t| t.is("(")).unwrap_or(false) {
            let Some(close) = matching_close(tokens, boundary) else {
                return;
            };
            if looks_like_parameters(&tokens[boundary + 1..close]) {
                return;
            }
        }

        let storage = if type_tokens.iter().any(|t| t.is("static")) {
            Storage::Internal
        } else if type_tokens.iter().any(|t| t.is("constexpr") || t.is("auto")) {
            Storage::Deduced
        } else {
            Storage::External
        };

        let type_start = type_tokens
            .iter()
            .find(|t| !matches!(t.text, "static" | "extern" | "inline" | "register" | "thread_local"))
            .map(|t| t.start)
            .unwrap_or(type_tokens[0].start);
        let type_text =
            collapse_whitespace(&self.code(type_start..type_tokens[type_tokens.len() - 1].end));

        let span = start..terminator + 1;
        let pointer = join_texts(&head[type_end..name_idx]);
        let declarator = format!("{pointer}{}{}", name.text, self.array_suffix(tokens, boundary));
        self.push_variable(name.text, &type_text, declarator, storage, &span, terminator);

        // further declarators: `uint8_t inFX, outFX;`
        let rest = split_top_level(&tokens[boundary..]);
        for part in rest.into_iter().skip(1) {
            let ptr_len = part
                .iter()
                .take_while(|t| matches!(t.text, "*" | "&" | "&&"))
                .count();
            let Some(name) = part.get(ptr_len).filter(|t| t.is_ident()) else {
                continue;
            };
            let suffix = self.array_suffix(part, ptr_len + 1);
            let declarator = format!("{}{}{}", join_texts(&part[..ptr_len]), name.text, suffix);
            self.push_variable(name.text, &type_text, declarator, storage, &span, terminator);
        }
    }

    fn push_variable(
        &mut self,
        name: &str,
        type_text: &str,
        declarator: String,
        storage: Storage,
        span: &Range<usize>,
        terminator: usize,
    ) {
        self.push(
            DeclKind::GlobalVariable,
            name,
            span.clone(),
            DeclDetail::Variable {
                type_text: type_text.to_string(),
                declarator,
                storage,
                terminator,
            },
        );
    }

    /// `[N][M]` groups following a declarator name, whitespace-collapsed.
    fn array_suffix(&self, tokens: &[Token<'a>], mut idx: usize) -> String {
        let mut suffix = String::new();
        while let Some(open) = tokens.get(idx).filter(|t| t.is("[")) {
            let Some(close) = matching_close(tokens, idx) else {
                break;
            };
            suffix.push_str(&collapse_whitespace(
                &self.code(open.start..tokens[close].end),
            ));
            idx = close + 1;
        }
        suffix
    }

    // ------------------------------------------------------------ directives

    /// End of the logical preprocessor line starting at `start`: the first
    /// newline that is neither escaped nor inside a comment.
    fn directive_end(&self, start: usize) -> usize {
        let raw = self.raw.as_bytes();
        let mut j = start;
        while j < self.norm.len() {
            if self.norm[j] == b'\n' && !self.normalized.in_comment(j) {
                let mut k = j;
                if k > 0 && raw[k - 1] == b'\r' {
                    k -= 1;
                }
                if k == 0 || raw[k - 1] != b'\\' {
                    return j;
                }
            }
            j += 1;
        }
        self.norm.len()
    }

    /// Directive keyword and the offset just after it.
    fn directive_keyword(&self, start: usize, end: usize) -> (&'a str, usize) {
        let text = self.text(start + 1..end);
        let trimmed = text.trim_start();
        let kw_start = start + 1 + (text.len() - trimmed.len());
        let kw_len = trimmed
            .bytes()
            .take_while(|b| is_ident_continue(*b))
            .count();
        (self.text(kw_start..kw_start + kw_len), kw_start + kw_len)
    }

    /// First identifier after `from` within the directive, with its range.
    fn directive_name(&self, from: usize, end: usize) -> Option<Range<usize>> {
        let text = self.text(from..end);
        let trimmed = text.trim_start();
        let name_start = from + (text.len() - trimmed.len());
        let len = trimmed
            .bytes()
            .take_while(|b| is_ident_continue(*b))
            .count();
        (len > 0).then_some(name_start..name_start + len)
    }

    fn directive(&mut self, start: usize, end: usize) {
        let (keyword, after) = self.directive_keyword(start, end);
        let line = collapse_whitespace(&self.code(start..end));

        match keyword {
            "if" | "ifdef" | "ifndef" => {
                let guard = keyword == "ifndef" && self.detect_guard(after, end);
                self.frames.push(Frame {
                    id: self.next_frame,
                    guard,
                    directives: vec![line],
                });
                self.next_frame += 1;
            }
            "elif" | "else" => {
                let frame = self.frames.last_mut().filter(|frame| !frame.guard);
                match frame {
                    Some(frame) => frame.directives.push(line),
                    None => self.warn(
                        DiagnosticKind::StructuralAmbiguity,
                        start,
                        format!("#{keyword} without matching #if ignored"),
                    ),
                }
            }
            "endif" => match self.frames.pop() {
                Some(frame) if frame.guard => {
                    let endif_start = self.lines.line_start(start);
                    if let Some(guard) = self.out.guard.as_mut() {
                        guard.endif_start = Some(endif_start);
                    }
                }
                Some(_) => {}
                None => self.warn(
                    DiagnosticKind::StructuralAmbiguity,
                    start,
                    "#endif without matching #if ignored",
                ),
            },
            "define" => {
                if self.guard_define != Some(start)
                    && self.scope_depth() == 0
                    && self.paren == 0
                    && self.stmt_start.is_none()
                {
                    self.macro_definition(start, after, end);
                }
            }
            "include" => {
                if self.scope_depth() == 0 {
                    let span = self.lines.line_start(start)..end;
                    self.include(&line, span);
                }
            }
            "pragma" if !self.seen_code && line.ends_with("once") => {
                let define_end = (end + 1).min(self.norm.len());
                self.out.guard = Some(HeaderGuard {
                    name: String::new(),
                    define_end,
                    endif_start: None,
                });
            }
            _ => {}
        }

        self.seen_code = true;
    }

    /// An `#ifndef X` that opens the file and is directly followed by
    /// `#define X` is a header guard.
    fn detect_guard(&mut self, after: usize, end: usize) -> bool {
        if self.seen_code || !self.frames.is_empty() || self.out.guard.is_some() {
            return false;
        }
        let Some(name) = self.directive_name(after, end) else {
            return false;
        };

        let next = (end..self.norm.len()).find(|&j| !self.norm[j].is_ascii_whitespace());
        let Some(next) = next.filter(|&j| self.norm[j] == b'#') else {
            return false;
        };
        let next_end = self.directive_end(next);
        let (keyword, after_define) = self.directive_keyword(next, next_end);
        let defined = self.directive_name(after_define, next_end);
        if keyword != "define" || defined.map(|r| self.text(r)) != Some(self.text(name.clone())) {
            return false;
        }

        self.guard_define = Some(next);
        self.out.guard = Some(HeaderGuard {
            name: self.text(name).to_string(),
            define_end: (next_end + 1).min(self.norm.len()),
            endif_start: None,
        });
        true
    }

    fn macro_definition(&mut self, start: usize, after: usize, end: usize) {
        let Some(name) = self.directive_name(after, end) else {
            self.warn(
                DiagnosticKind::StructuralAmbiguity,
                start,
                "#define without a macro name ignored",
            );
            return;
        };
        let kind = if self.norm.get(name.end) == Some(&b'(') {
            DeclKind::FunctionLikeMacro
        } else {
            DeclKind::ObjectMacro
        };

        let span = self.lines.line_start(start)..end;
        let text = self.code(start..end);
        let name = self.text(name).to_string();
        self.push(kind, &name, span, DeclDetail::Macro { text });
    }

    fn include(&mut self, line: &str, span: Range<usize>) {
        static INCLUDE: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = INCLUDE.get_or_init(|| Regex::new(r#"^#\s*include\s*([<"])([^>"]+)[>"]"#).ok());
        let Some(captures) = pattern.as_ref().and_then(|re| re.captures(line)) else {
            return;
        };

        let conditions = self.active_conditions();
        self.out.includes.push(IncludeDirective {
            target: captures[2].trim().to_string(),
            system: &captures[1] == "<",
            text: line.to_string(),
            span,
            conditions,
        });
    }

    fn finish(&mut self) {
        if let Some(&(_, open)) = self.braces.first() {
            self.warn(
                DiagnosticKind::StructuralAmbiguity,
                open,
                "block is never closed; its declaration is skipped",
            );
        } else if let Some(start) = self.stmt_start {
            self.warn(
                DiagnosticKind::StructuralAmbiguity,
                start,
                "unterminated top-level statement skipped",
            );
        }

        let unclosed: Vec<String> = self
            .frames
            .iter()
            .map(|frame| frame.directives[0].clone())
            .collect();
        for directive in unclosed {
            let end = self.norm.len();
            self.warn(
                DiagnosticKind::StructuralAmbiguity,
                end,
                format!("`{directive}` is never closed by #endif"),
            );
        }
    }
}

fn has_top_level(tokens: &[Token<'_>], text: &str) -> bool {
    let mut depth = 0i32;
    tokens.iter().any(|t| {
        match t.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            _ => {}
        }
        depth == 0 && t.is(text)
    })
}

fn skip_template_prefix<'t, 'a>(tokens: &'t [Token<'a>]) -> &'t [Token<'a>] {
    if tokens.len() > 1 && tokens[0].is("template") && tokens[1].is("<") {
        if let Some(close) = matching_close(tokens, 1) {
            return &tokens[close + 1..];
        }
    }
    tokens
}

/// Index of the first token that ends the type + name part of a declaration.
fn declarator_boundary(tokens: &[Token<'_>]) -> usize {
    let mut angle = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match token.text {
            "<" => angle += 1,
            ">" if angle > 0 => angle -= 1,
            "=" | "(" | "[" | "{" | "," if angle == 0 => return idx,
            _ => {}
        }
    }
    tokens.len()
}

/// Whether the tokens between a name's parentheses read as a parameter list
/// (`int a, const char* b`) rather than constructor arguments (`80`, `pin`).
fn looks_like_parameters(tokens: &[Token<'_>]) -> bool {
    if tokens.is_empty() {
        return true;
    }
    split_top_level(tokens).into_iter().all(|param| {
        if param.len() == 1 && param[0].is("...") {
            return true;
        }
        if param
            .iter()
            .any(|t| matches!(t.kind, TokenKind::Number | TokenKind::Literal))
            || param.iter().any(|t| matches!(t.text, "." | "->" | "(" | "+" | "-"))
        {
            return false;
        }
        if param
            .iter()
            .any(|t| is_type_keyword(t.text) || is_qualifier(t.text))
        {
            return true;
        }
        let idents = param.iter().filter(|t| t.is_ident()).count();
        idents >= 2 || param.iter().any(|t| matches!(t.text, "*" | "&"))
    })
}

fn join_texts(tokens: &[Token<'_>]) -> String {
    tokens.iter().map(|t| t.text).collect()
}
