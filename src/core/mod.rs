pub mod converter;
pub mod diagnostics;
pub mod graph;
pub mod interface;
pub mod layout;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod scanner;

pub use converter::{convert, ConvertOptions, ProjectConverter};
pub use diagnostics::{ConvertError, Diagnostic, DiagnosticKind, FatalKind, Location};
pub use graph::{Edge, EdgeType, Node, NodeType, ReferenceGraph};
pub use interface::{Decision, GlueEntry, SharedInterface, SharedInterfaceBuilder};
pub use report::{ConversionReport, Outcome, SymbolReport, UnitReport};
pub use resolver::{CrossReferenceTable, DeclKey};
pub use scanner::FileScanner;
