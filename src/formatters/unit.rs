//! Per-file emitter.
//!
//! Every declaration site is annotated with where its declaration now lives;
//! moved macros and types are commented out line by line, definitions stay in
//! place. Each implementation unit gets an interface header holding its local
//! prototypes and an include of the glue header.

use std::path::PathBuf;

use crate::core::interface::{interface_text, Decision, SharedInterface};
use crate::core::ConvertError;
use crate::parsers::common::{code_text, collapse_whitespace, guard_name};
use crate::parsers::{DeclDetail, Declaration, SourceUnit, UnitRole};

use super::{ConditionalWriter, RewriteList};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    /// Relative to the output root.
    pub relative_path: PathBuf,
    pub contents: String,
}

/// Output of one input unit: implementation and interface, or the rewritten
/// header for header units.
#[derive(Debug, Clone)]
pub struct EmittedUnit {
    pub files: Vec<EmittedFile>,
}

pub struct UnitFormatter<'a> {
    interface: &'a SharedInterface,
    glue_name: &'a str,
}

impl<'a> UnitFormatter<'a> {
    pub fn new(interface: &'a SharedInterface, glue_name: &'a str) -> Self {
        Self {
            interface,
            glue_name,
        }
    }

    /// Emit an implementation unit. When `companion` is the header with the
    /// same stem, the generated interface is merged into it.
    pub fn format(
        &self,
        unit: &SourceUnit,
        companion: Option<&SourceUnit>,
    ) -> Result<EmittedUnit, ConvertError> {
        if unit.role == UnitRole::Header {
            return Ok(EmittedUnit {
                files: vec![EmittedFile {
                    relative_path: PathBuf::from("include").join(&unit.file_name),
                    contents: self.header(unit, None)?,
                }],
            });
        }

        let implementation_name = match unit.role {
            UnitRole::Sketch => format!("{}.cpp", unit.stem),
            _ => unit.file_name.clone(),
        };
        let local_block = self.local_block(unit);
        let interface = match companion {
            Some(header) => EmittedFile {
                relative_path: PathBuf::from("include").join(&header.file_name),
                contents: self.header(header, Some(&local_block))?,
            },
            None => EmittedFile {
                relative_path: PathBuf::from("include").join(format!("{}.h", unit.stem)),
                contents: self.generated_header(unit, &local_block),
            },
        };

        Ok(EmittedUnit {
            files: vec![
                EmittedFile {
                    relative_path: PathBuf::from("src").join(implementation_name),
                    contents: self.implementation(unit, companion)?,
                },
                interface,
            ],
        })
    }

    fn implementation(
        &self,
        unit: &SourceUnit,
        companion: Option<&SourceUnit>,
    ) -> Result<String, ConvertError> {
        let mut rewrite = RewriteList::new(&unit.file_name, &unit.raw);

        let header_name = companion
            .map(|header| header.file_name.clone())
            .unwrap_or_else(|| format!("{}.h", unit.stem));
        let at = first_code_line(unit);
        let mut prelude = String::new();
        if unit.role == UnitRole::Sketch && !includes(unit, "Arduino.h") {
            prelude.push_str("#include <Arduino.h>\n");
        }
        if !includes(unit, &header_name) {
            let include = format!("#include \"{header_name}\"\n");
            match self.header_anchor(unit) {
                Some(anchor) if anchor == unit.raw.len() && !unit.raw.ends_with('\n') => {
                    rewrite.insert(anchor, format!("\n{include}"));
                }
                Some(anchor) => rewrite.insert(anchor, include),
                None => prelude.push_str(&include),
            }
        }
        if !prelude.is_empty() {
            if at == unit.raw.len() && !unit.raw.is_empty() && !unit.raw.ends_with('\n') {
                prelude.insert(0, '\n');
            }
            rewrite.insert(at, prelude);
        }
        // after the prelude, so a moved first line stays below the includes
        self.declaration_edits(unit, &mut rewrite);

        rewrite.apply()
    }

    /// Just past the last unconditional include that precedes the first
    /// definition or moved declaration, where the IDE puts its generated
    /// prototypes. Local prototypes may name types from those includes.
    fn header_anchor(&self, unit: &SourceUnit) -> Option<usize> {
        let limit = unit
            .declarations
            .iter()
            .enumerate()
            .filter(|(index, decl)| match &decl.detail {
                DeclDetail::Function { .. } => true,
                DeclDetail::Macro { .. } | DeclDetail::Type { .. } => matches!(
                    self.interface.decision((unit.id, *index)),
                    Decision::Hoisted { .. } | Decision::MovedToLocal | Decision::Shadowed { .. }
                ),
                DeclDetail::Variable { .. } => false,
            })
            .map(|(_, decl)| decl.span.start)
            .min()
            .unwrap_or(unit.raw.len());

        unit.includes
            .iter()
            .filter(|include| include.conditions.is_empty() && include.span.end <= limit)
            .map(|include| (include.span.end + 1).min(unit.raw.len()))
            .max()
    }

    /// Header units keep their text with moved macros commented out; a guard
    /// is added when missing and the glue header is included right after it.
    fn header(&self, unit: &SourceUnit, local_block: Option<&str>) -> Result<String, ConvertError> {
        let mut rewrite = RewriteList::new(&unit.file_name, &unit.raw);

        let glue_include = format!("\n#include \"{}\"\n", self.glue_name);
        let block = local_block
            .filter(|block| !block.is_empty())
            .map(|block| format!("\n{block}\n"));

        match &unit.guard {
            Some(guard) => {
                rewrite.insert(guard.define_end, glue_include);
                if let Some(block) = block {
                    let at = guard.endif_start.unwrap_or(unit.raw.len());
                    let block = if at == unit.raw.len() && !unit.raw.ends_with('\n') {
                        format!("\n{block}")
                    } else {
                        block
                    };
                    rewrite.insert(at, block);
                }
            }
            None => {
                let name = guard_name(&unit.file_name);
                rewrite.insert(0, format!("#ifndef {name}\n#define {name}\n{glue_include}\n"));
                let mut tail = String::new();
                if !unit.raw.is_empty() && !unit.raw.ends_with('\n') {
                    tail.push('\n');
                }
                if let Some(block) = block {
                    tail.push_str(&block);
                }
                tail.push_str(&format!("\n#endif // {name}\n"));
                rewrite.insert(unit.raw.len(), tail);
            }
        }
        self.declaration_edits(unit, &mut rewrite);

        rewrite.apply()
    }

    fn generated_header(&self, unit: &SourceUnit, local_block: &str) -> String {
        let name = guard_name(&format!("{}.h", unit.stem));
        let mut out = format!(
            "#ifndef {name}\n#define {name}\n\n#include \"{}\"\n",
            self.glue_name
        );
        if !local_block.is_empty() {
            out.push('\n');
            out.push_str(local_block);
        }
        out.push_str(&format!("\n#endif // {name}\n"));
        out
    }

    /// Types and prototypes that stay private to the unit.
    fn local_block(&self, unit: &SourceUnit) -> String {
        let mut out = String::new();

        let types = self.interface.local_types(unit.id);
        if !types.is_empty() {
            out.push_str("//== Local Types ==\n");
            let mut writer = ConditionalWriter::new();
            for &index in types {
                let decl = &unit.declarations[index];
                writer.write(unit.id, &decl.conditions, &interface_text(decl));
            }
            out.push_str(&writer.finish());
        }

        let mut prototypes = self.interface.local_prototypes(unit).peekable();
        if prototypes.peek().is_some() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("//== Local Prototypes ==\n");
            let mut writer = ConditionalWriter::new();
            for index in prototypes {
                let decl = &unit.declarations[index];
                writer.write(unit.id, &decl.conditions, &interface_text(decl));
            }
            out.push_str(&writer.finish());
        }

        out
    }

    fn declaration_edits(&self, unit: &SourceUnit, rewrite: &mut RewriteList<'_>) {
        let glue = self.glue_name;
        let local = format!("{}.h", unit.stem);
        let mut annotated_statements = Vec::new();

        for (index, decl) in unit.declarations.iter().enumerate() {
            let decision = self.interface.decision((unit.id, index));
            match (&decl.detail, decision) {
                (DeclDetail::Macro { .. } | DeclDetail::Type { .. }, Decision::Hoisted { .. }) => {
                    comment_out(unit, decl, &format!("//-- moved to {glue}: "), rewrite);
                }
                (DeclDetail::Type { .. }, Decision::MovedToLocal) => {
                    comment_out(unit, decl, &format!("//-- moved to {local}: "), rewrite);
                }
                (DeclDetail::Macro { .. } | DeclDetail::Type { .. }, Decision::Shadowed { by_file }) => {
                    let prefix = format!("//-- shadowed by {} from {by_file}: ", decl.name);
                    comment_out(unit, decl, &prefix, rewrite);
                }
                (DeclDetail::Variable { terminator, .. }, Decision::Hoisted { .. }) => {
                    if !annotated_statements.contains(terminator) {
                        annotated_statements.push(*terminator);
                        annotate_after(unit, *terminator, &format!("extern in {glue}"), rewrite);
                    }
                }
                (DeclDetail::Variable { terminator, .. }, Decision::Shadowed { by_file }) => {
                    let note = format!("shadowed by {} from {by_file}", decl.name);
                    annotate_after(unit, *terminator, &note, rewrite);
                }
                (DeclDetail::Function { .. }, Decision::Hoisted { .. }) => {
                    annotate_function(unit, decl, &format!("prototype in {glue}"), rewrite);
                }
                (DeclDetail::Function { .. }, Decision::Local) if unit.role != UnitRole::Header => {
                    annotate_function(unit, decl, &format!("prototype in {local}"), rewrite);
                }
                (DeclDetail::Function { signature_span, .. }, Decision::Shadowed { by_file }) => {
                    // no prototype is emitted, so default arguments stay
                    let note = format!("shadowed by {} from {by_file}", decl.name);
                    annotate_line(unit, signature_span.start, &note, rewrite);
                }
                _ => {}
            }
        }
    }
}

fn includes(unit: &SourceUnit, target: &str) -> bool {
    unit.includes
        .iter()
        .any(|include| include.target == target && include.conditions.is_empty())
}

/// Start of the line holding the first byte of code, or the end of the text.
fn first_code_line(unit: &SourceUnit) -> usize {
    let first = unit
        .normalized
        .text
        .bytes()
        .enumerate()
        .find(|&(offset, byte)| !byte.is_ascii_whitespace() && !unit.normalized.in_comment(offset))
        .map(|(offset, _)| offset);
    match first {
        Some(offset) => unit.lines.line_start(offset),
        None => unit.raw.len(),
    }
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..].find('\n').map(|pos| from + pos).unwrap_or(text.len())
}

/// Whether the span covers whole lines, so every line can be commented out.
fn owns_lines(unit: &SourceUnit, decl: &Declaration) -> bool {
    let start = unit.lines.line_start(decl.span.start);
    let end = line_end(&unit.normalized.text, decl.span.end);
    unit.normalized.text[start..decl.span.start].trim().is_empty()
        && unit.normalized.text[decl.span.end..end].trim().is_empty()
}

fn comment_out(unit: &SourceUnit, decl: &Declaration, prefix: &str, rewrite: &mut RewriteList<'_>) {
    if !owns_lines(unit, decl) {
        let note = prefix.trim_start_matches("//").trim_end_matches([':', ' ']);
        rewrite.replace(decl.span.clone(), format!("/*{note} {} */", decl.name));
        return;
    }

    rewrite.insert(unit.lines.line_start(decl.span.start), prefix.to_string());
    let raw = unit.raw.as_bytes();
    for offset in decl.span.start..decl.span.end {
        if raw[offset] == b'\n' && offset + 1 < decl.span.end {
            rewrite.insert(offset + 1, prefix.to_string());
        }
    }
}

/// Appends a note after a statement's `;`. A line comment is only used when
/// nothing else follows on that line.
fn annotate_after(unit: &SourceUnit, terminator: usize, note: &str, rewrite: &mut RewriteList<'_>) {
    let at = terminator + 1;
    let end = line_end(&unit.raw, at);
    if unit.raw[at..end].trim().is_empty() {
        rewrite.insert(at, format!(" //-- {note}"));
    } else {
        rewrite.insert(at, format!(" /*-- {note} */"));
    }
}

/// A `//--` note on its own line above `at`, or inline when code precedes
/// `at` on its line.
fn annotate_line(unit: &SourceUnit, at: usize, note: &str, rewrite: &mut RewriteList<'_>) {
    let line_start = unit.lines.line_start(at);
    if unit.normalized.text[line_start..at].trim().is_empty() {
        rewrite.insert(line_start, format!("//-- {note}\n"));
    } else {
        rewrite.insert(at, format!("/*-- {note} */ "));
    }
}

/// Notes the prototype's home above the definition and comments out default
/// arguments, which may only appear once.
fn annotate_function(
    unit: &SourceUnit,
    decl: &Declaration,
    note: &str,
    rewrite: &mut RewriteList<'_>,
) {
    let DeclDetail::Function {
        signature_span,
        defaults,
        ..
    } = &decl.detail
    else {
        return;
    };

    annotate_line(unit, signature_span.start, note, rewrite);
    for default in defaults {
        let value = collapse_whitespace(&code_text(
            &unit.raw,
            default.clone(),
            &unit.normalized.comments,
        ));
        rewrite.replace(default.clone(), format!("/* {value} */"));
    }
}

impl EmittedUnit {
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter().map(|file| &file.relative_path)
    }
}
