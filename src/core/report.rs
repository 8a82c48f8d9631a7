use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::interface::Decision;
use super::{Diagnostic, FatalKind};
use crate::parsers::{DeclKind, UnitRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Warning,
    Fatal(FatalKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fatal {
    pub kind: FatalKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitReport {
    pub path: PathBuf,
    pub file_name: String,
    pub role: UnitRole,
    pub declarations: usize,
    pub warnings: Vec<Diagnostic>,
    pub fatal: Option<Fatal>,
}

impl UnitReport {
    pub fn outcome(&self) -> Outcome {
        match (&self.fatal, self.warnings.is_empty()) {
            (Some(fatal), _) => Outcome::Fatal(fatal.kind),
            (None, false) => Outcome::Warning,
            (None, true) => Outcome::Success,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReport {
    pub name: String,
    pub kind: DeclKind,
    pub file: String,
    pub line: usize,
    pub decision: Decision,
}

/// A generated artifact that does not belong to a single unit (glue header,
/// data folder, build configuration) and could not be produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionReport {
    pub project_name: String,
    pub output_root: PathBuf,
    /// Per input file, in traversal order.
    pub units: Vec<UnitReport>,
    pub symbols: Vec<SymbolReport>,
    /// Written artifacts, relative to `output_root`.
    pub generated_files: Vec<PathBuf>,
    pub failures: Vec<ArtifactFailure>,
}

impl ConversionReport {
    pub fn fatal_count(&self) -> usize {
        self.units.iter().filter(|unit| unit.fatal.is_some()).count() + self.failures.len()
    }

    pub fn warning_count(&self) -> usize {
        self.units.iter().map(|unit| unit.warnings.len()).sum()
    }

    /// 0 when nothing was fatal, 1 otherwise.
    pub fn exit_status(&self) -> i32 {
        if self.fatal_count() == 0 {
            0
        } else {
            1
        }
    }

    pub fn unit(&self, file_name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|unit| unit.file_name == file_name)
    }

    /// Every decision taken for declarations named `name`, in traversal order.
    pub fn symbols_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SymbolReport> {
        self.symbols.iter().filter(move |symbol| symbol.name == name)
    }

    pub fn hoisted(&self) -> impl Iterator<Item = &SymbolReport> {
        self.symbols
            .iter()
            .filter(|symbol| symbol.decision.is_hoisted())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "ok"),
            Outcome::Warning => write!(f, "warning"),
            Outcome::Fatal(kind) => write!(f, "fatal ({kind:?})"),
        }
    }
}
