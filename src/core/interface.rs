//! Shared-interface accumulation.
//!
//! [`SharedInterfaceBuilder`] is fed units in traversal order and decides, for
//! every top-level declaration, whether it moves into the shared glue header,
//! stays local to its unit, or is left alone. [`SharedInterfaceBuilder::freeze`]
//! closes the set over the types it mentions and hands out an immutable
//! [`SharedInterface`] for the emitters.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::resolver::{CrossReferenceTable, DeclKey};
use super::{Diagnostic, DiagnosticKind, Location};
use crate::parsers::common::identifiers;
use crate::parsers::{
    DeclDetail, DeclKind, Declaration, IncludeDirective, SourceUnit, Storage, UnitId, UnitRole,
};

/// What happened to one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Declared in the shared interface.
    Hoisted { referenced_by: Vec<String> },
    /// Only used by its own unit; function prototypes go to the unit's interface.
    Local,
    /// File-local type needed by the unit's own prototypes.
    MovedToLocal,
    /// Left exactly where it is.
    Kept { reason: String },
    /// An earlier declaration of the same name won.
    Shadowed { by_file: String },
    /// Could not be moved safely; left in place.
    Skipped { reason: String },
}

impl Decision {
    pub fn is_hoisted(&self) -> bool {
        matches!(self, Decision::Hoisted { .. })
    }
}

/// One name in the shared interface. Several variants exist only when the
/// same unit declares the name in mutually exclusive `#if` branches.
#[derive(Debug, Clone)]
pub struct GlueEntry {
    pub kind: DeclKind,
    pub name: String,
    pub home: UnitId,
    pub variants: Vec<DeclKey>,
    pub referenced_by: Vec<UnitId>,
}

/// Declaration text as it appears in any interface file: the full definition
/// for macros and types, `extern` for variables, a prototype for functions.
pub fn interface_text(decl: &Declaration) -> String {
    match &decl.detail {
        DeclDetail::Macro { text } => text.clone(),
        DeclDetail::Type { text, .. } => text.clone(),
        DeclDetail::Variable {
            type_text,
            declarator,
            ..
        } => format!("extern {type_text} {declarator};"),
        DeclDetail::Function { signature, .. } => format!("{signature};"),
    }
}

pub struct SharedInterfaceBuilder<'a> {
    units: &'a [SourceUnit],
    xref: &'a CrossReferenceTable,
    entries: Vec<GlueEntry>,
    by_name: HashMap<String, usize>,
    includes: Vec<IncludeDirective>,
    seen_includes: HashSet<String>,
    decisions: Vec<Vec<Decision>>,
    diagnostics: Vec<Vec<Diagnostic>>,
}

impl<'a> SharedInterfaceBuilder<'a> {
    pub fn new(units: &'a [SourceUnit], xref: &'a CrossReferenceTable) -> Self {
        Self {
            units,
            xref,
            entries: Vec::new(),
            by_name: HashMap::new(),
            includes: Vec::new(),
            seen_includes: HashSet::new(),
            decisions: units
                .iter()
                .map(|unit| vec![Decision::Local; unit.declarations.len()])
                .collect(),
            diagnostics: vec![Vec::new(); units.len()],
        }
    }

    /// Feed one unit. Units must arrive in traversal order; that order is the
    /// first-discovery order of the shared interface.
    pub fn add_unit(&mut self, unit: &SourceUnit) {
        for include in unit.includes.iter().filter(|include| include.system) {
            if include.target != "Arduino.h" && self.seen_includes.insert(include.target.clone()) {
                self.includes.push(include.clone());
            }
        }

        for (index, decl) in unit.declarations.iter().enumerate() {
            let decision = self.decide(unit, index, decl);
            self.decisions[unit.id][index] = decision;
        }
    }

    fn decide(&mut self, unit: &SourceUnit, index: usize, decl: &Declaration) -> Decision {
        let key = (unit.id, index);
        let referenced = self.xref.referencing_units(key);

        match (&decl.kind, &decl.detail) {
            (DeclKind::FunctionLikeMacro, _) => return kept("function-like macro"),
            (DeclKind::ObjectMacro, _) => {}
            (_, _) if unit.role == UnitRole::Header => return kept("declared in a header"),
            (_, DeclDetail::Variable { storage, .. }) => match storage {
                Storage::Internal => return kept("static variable"),
                Storage::Deduced => return kept("constexpr/auto variable has no extern form"),
                Storage::External if referenced.is_empty() => return Decision::Local,
                Storage::External => {}
            },
            (_, DeclDetail::Function { is_static, .. }) => {
                if *is_static || referenced.is_empty() {
                    return Decision::Local;
                }
            }
            (_, DeclDetail::Type {
                has_declarators, ..
            }) => {
                if referenced.is_empty() {
                    return Decision::Local;
                }
                if *has_declarators {
                    self.warn(
                        unit,
                        decl,
                        DiagnosticKind::StructuralAmbiguity,
                        format!("`{}` defines a type and variables in one statement; left in place", decl.name),
                    );
                    return Decision::Skipped {
                        reason: "type definition also declares variables".to_string(),
                    };
                }
            }
            (_, DeclDetail::Macro { .. }) => return Decision::Local,
        }

        self.hoist(unit, key, decl, referenced)
    }

    fn hoist(
        &mut self,
        unit: &SourceUnit,
        key: DeclKey,
        decl: &Declaration,
        referenced: Vec<UnitId>,
    ) -> Decision {
        if let Some(&entry_idx) = self.by_name.get(&decl.name) {
            let entry = &self.entries[entry_idx];
            let exclusive = entry.kind == decl.kind
                && entry
                    .variants
                    .iter()
                    .all(|&variant| self.declaration(variant).is_exclusive_with(decl));

            if !exclusive {
                let (winner_unit, winner_idx) = entry.variants[0];
                let winner = &self.units[winner_unit];
                let line = winner.declarations[winner_idx].line;
                let by_file = winner.file_name.clone();
                self.warn(
                    unit,
                    decl,
                    DiagnosticKind::DuplicateSymbol,
                    format!(
                        "`{}` already declared in {}:{}; this declaration is shadowed",
                        decl.name, by_file, line
                    ),
                );
                return Decision::Shadowed { by_file };
            }

            let entry = &mut self.entries[entry_idx];
            entry.variants.push(key);
            for unit_id in &referenced {
                if !entry.referenced_by.contains(unit_id) {
                    entry.referenced_by.push(*unit_id);
                }
            }
            entry.referenced_by.sort_unstable();
        } else {
            self.by_name.insert(decl.name.clone(), self.entries.len());
            self.entries.push(GlueEntry {
                kind: decl.kind,
                name: decl.name.clone(),
                home: unit.id,
                variants: vec![key],
                referenced_by: referenced.clone(),
            });
        }

        if let Some(branch) = decl.conditions.last() {
            self.warn(
                unit,
                decl,
                DiagnosticKind::ConditionalBranchAmbiguity,
                format!(
                    "`{}` is hoisted from inside `{}`; every branch is kept",
                    decl.name, branch.directives[0]
                ),
            );
        }

        Decision::Hoisted {
            referenced_by: self.file_names(&referenced),
        }
    }

    fn declaration(&self, key: DeclKey) -> &'a Declaration {
        &self.units[key.0].declarations[key.1]
    }

    fn file_names(&self, units: &[UnitId]) -> Vec<String> {
        units
            .iter()
            .map(|&unit| self.units[unit].file_name.clone())
            .collect()
    }

    fn warn(
        &mut self,
        unit: &SourceUnit,
        decl: &Declaration,
        kind: DiagnosticKind,
        message: String,
    ) {
        let (line, column) = unit.lines.line_col(decl.span.start);
        let location = Location {
            file: unit.file_name.clone(),
            line,
            column,
        };
        self.diagnostics[unit.id].push(Diagnostic::new(kind, location, message));
    }

    /// Close the interface over the types it names and stop accepting input.
    pub fn freeze(mut self) -> SharedInterface {
        self.promote_shared_types();
        let local_types = self.collect_local_types();

        debug!(
            entries = self.entries.len(),
            includes = self.includes.len(),
            "shared interface frozen"
        );

        SharedInterface {
            entries: self.entries,
            includes: self.includes,
            decisions: self.decisions,
            local_types,
            diagnostics: self.diagnostics,
        }
    }

    /// A file-local type named by anything in the shared interface has to
    /// move there too, or the glue header would not compile on its own.
    fn promote_shared_types(&mut self) {
        loop {
            let mentioned: HashSet<String> = self
                .entries
                .iter()
                .flat_map(|entry| entry.variants.iter())
                .flat_map(|&key| {
                    let text = interface_text(self.declaration(key));
                    identifiers(&text).map(str::to_string).collect::<Vec<_>>()
                })
                .collect();

            let promotable: Vec<DeclKey> = self
                .local_declarations(DeclKind::TypeDecl)
                .filter(|&key| {
                    let decl = self.declaration(key);
                    mentioned.contains(&decl.name) && !self.by_name.contains_key(&decl.name)
                })
                .collect();

            if promotable.is_empty() {
                break;
            }

            for key in promotable {
                let decl = self.declaration(key);
                if self.by_name.contains_key(&decl.name) {
                    continue;
                }
                if let DeclDetail::Type {
                    has_declarators: true,
                    ..
                } = decl.detail
                {
                    self.decisions[key.0][key.1] = Decision::Skipped {
                        reason: "type definition also declares variables".to_string(),
                    };
                    continue;
                }
                let units = self.units;
                let unit = &units[key.0];
                let referenced = self.xref.referencing_units(key);
                self.decisions[key.0][key.1] = self.hoist(unit, key, decl, referenced);
            }
        }
    }

    /// File-local types named by the unit's own local prototypes move into
    /// the unit's interface, ahead of the prototypes.
    fn collect_local_types(&mut self) -> Vec<Vec<usize>> {
        let units = self.units;
        let mut local_types = vec![Vec::new(); units.len()];

        for unit in units.iter().filter(|unit| unit.role.has_implementation()) {
            let mut mentioned: HashSet<String> = HashSet::new();
            for (index, decl) in unit.declarations.iter().enumerate() {
                if decl.kind == DeclKind::FunctionSignature
                    && self.decisions[unit.id][index] == Decision::Local
                {
                    mentioned.extend(identifiers(&interface_text(decl)).map(str::to_string));
                }
            }

            loop {
                let moved: Vec<usize> = unit
                    .declarations
                    .iter()
                    .enumerate()
                    .filter(|(index, decl)| {
                        decl.kind == DeclKind::TypeDecl
                            && self.decisions[unit.id][*index] == Decision::Local
                            && mentioned.contains(&decl.name)
                            && matches!(
                                decl.detail,
                                DeclDetail::Type {
                                    has_declarators: false,
                                    ..
                                }
                            )
                    })
                    .map(|(index, _)| index)
                    .collect();
                if moved.is_empty() {
                    break;
                }
                for index in moved {
                    let decl = &unit.declarations[index];
                    self.decisions[unit.id][index] = Decision::MovedToLocal;
                    mentioned.extend(identifiers(&interface_text(decl)).map(str::to_string));
                    local_types[unit.id].push(index);
                }
            }
            local_types[unit.id].sort_unstable();
        }

        local_types
    }

    fn local_declarations(&self, kind: DeclKind) -> impl Iterator<Item = DeclKey> + '_ {
        self.units.iter().flat_map(move |unit| {
            unit.declarations
                .iter()
                .enumerate()
                .filter(move |(index, decl)| {
                    decl.kind == kind && self.decisions[unit.id][*index] == Decision::Local
                })
                .map(move |(index, _)| (unit.id, index))
        })
    }
}

fn kept(reason: &str) -> Decision {
    Decision::Kept {
        reason: reason.to_string(),
    }
}

/// The frozen result of [`SharedInterfaceBuilder`]. Read-only.
#[derive(Debug, Clone)]
pub struct SharedInterface {
    entries: Vec<GlueEntry>,
    includes: Vec<IncludeDirective>,
    decisions: Vec<Vec<Decision>>,
    local_types: Vec<Vec<usize>>,
    diagnostics: Vec<Vec<Diagnostic>>,
}

impl SharedInterface {
    /// Entries in first-discovery order; names are unique.
    pub fn entries(&self) -> &[GlueEntry] {
        &self.entries
    }

    /// Library includes (`#include <...>`) the shared interface re-emits.
    pub fn includes(&self) -> &[IncludeDirective] {
        &self.includes
    }

    pub fn decision(&self, key: DeclKey) -> &Decision {
        &self.decisions[key.0][key.1]
    }

    pub fn decisions(&self, unit: UnitId) -> &[Decision] {
        &self.decisions[unit]
    }

    pub fn entry(&self, name: &str) -> Option<&GlueEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Indices of types that move into the unit's own interface.
    pub fn local_types(&self, unit: UnitId) -> &[usize] {
        &self.local_types[unit]
    }

    /// Indices of functions that get a prototype in the unit's own interface.
    pub fn local_prototypes<'s>(
        &'s self,
        unit: &'s SourceUnit,
    ) -> impl Iterator<Item = usize> + 's {
        unit.declarations
            .iter()
            .enumerate()
            .filter(move |(index, decl)| {
                decl.kind == DeclKind::FunctionSignature
                    && self.decisions[unit.id][*index] == Decision::Local
            })
            .map(|(index, _)| index)
    }

    pub fn diagnostics(&self, unit: UnitId) -> &[Diagnostic] {
        &self.diagnostics[unit]
    }
}
