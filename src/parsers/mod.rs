pub mod classifier;
pub mod common;
pub mod normalizer;

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::core::Diagnostic;
use classifier::Classification;
use common::LineIndex;
use normalizer::NormalizedText;

/// Index of a unit in the traversal-ordered unit list.
pub type UnitId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitRole {
    /// `.ino` / `.pde`, compiled by the IDE with an implicit `Arduino.h`.
    Sketch,
    /// `.cpp`, `.cc`, `.cxx`, `.c`
    Source,
    /// `.h`, `.hpp`
    Header,
}

impl UnitRole {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "ino" | "pde" => Some(Self::Sketch),
            "cpp" | "cc" | "cxx" | "c" => Some(Self::Source),
            "h" | "hpp" => Some(Self::Header),
            _ => None,
        }
    }

    pub fn has_implementation(self) -> bool {
        !matches!(self, Self::Header)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    ObjectMacro,
    FunctionLikeMacro,
    GlobalVariable,
    FunctionSignature,
    TypeDecl,
}

/// Linkage of a global variable as far as hoisting is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Storage {
    External,
    /// `static`
    Internal,
    /// `constexpr` or `auto`; no `extern` form exists.
    Deduced,
}

/// One `#if` frame a declaration sits in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Unique per unit.
    pub frame: usize,
    /// 0 for the opening branch, +1 per `#elif`/`#else`.
    pub branch: usize,
    /// Opening directive and every branch directive up to the active one.
    pub directives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclDetail {
    Macro {
        text: String,
    },
    Variable {
        type_text: String,
        declarator: String,
        storage: Storage,
        /// Offset of the terminating `;`.
        terminator: usize,
    },
    Function {
        signature: String,
        signature_span: Range<usize>,
        /// Raw spans of `= value` default arguments.
        defaults: Vec<Range<usize>>,
        is_static: bool,
    },
    Type {
        text: String,
        /// `struct S { .. } s;` also defines variables.
        has_declarators: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    pub unit: UnitId,
    /// Byte span of the whole construct in the raw text.
    pub span: Range<usize>,
    pub line: usize,
    pub scope_depth: usize,
    pub conditions: Vec<BranchRef>,
    pub detail: DeclDetail,
}

impl Declaration {
    pub fn conditional_depth(&self) -> usize {
        self.conditions.len()
    }

    /// Same unit, and the two sit in different branches of one `#if` frame.
    pub fn is_exclusive_with(&self, other: &Declaration) -> bool {
        self.unit == other.unit
            && self
                .conditions
                .iter()
                .zip(&other.conditions)
                .take_while(|(a, b)| a.frame == b.frame)
                .any(|(a, b)| a.branch != b.branch)
    }
}

/// `#include` at brace depth 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    pub target: String,
    pub system: bool,
    pub text: String,
    /// From the start of the directive's line to its terminating newline.
    pub span: Range<usize>,
    pub conditions: Vec<BranchRef>,
}

/// `#ifndef X` / `#define X` ... `#endif` wrapping a whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderGuard {
    pub name: String,
    /// Offset just past the guard's `#define` line.
    pub define_end: usize,
    /// Offset of the line holding the closing `#endif`.
    pub endif_start: Option<usize>,
}

/// One input file after normalization and classification. Immutable once built.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub id: UnitId,
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
    pub role: UnitRole,
    pub raw: String,
    pub normalized: NormalizedText,
    pub lines: LineIndex,
    pub declarations: Vec<Declaration>,
    pub includes: Vec<IncludeDirective>,
    pub guard: Option<HeaderGuard>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SourceUnit {
    /// Normalize and classify one file's text.
    pub fn parse(id: UnitId, path: &Path, role: UnitRole, raw: String) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let normalized = normalizer::normalize(&raw);
        let lines = LineIndex::new(&raw);
        let Classification {
            declarations,
            includes,
            guard,
            diagnostics,
        } = classifier::classify(id, &file_name, &raw, &normalized, &lines);

        Self {
            id,
            path: path.to_path_buf(),
            file_name,
            stem,
            role,
            raw,
            normalized,
            lines,
            declarations,
            includes,
            guard,
            diagnostics,
        }
    }

    pub fn declaration_text(&self, decl: &Declaration) -> &str {
        &self.raw[decl.span.clone()]
    }
}
