use crate::core::interface::{interface_text, GlueEntry, SharedInterface};
use crate::parsers::common::guard_name;
use crate::parsers::{DeclKind, SourceUnit};

use super::ConditionalWriter;

/// Renders the frozen shared interface as the glue header every generated
/// file includes.
pub struct GlueFormatter {
    file_name: String,
    /// Emit `//-- from` provenance notes.
    provenance: bool,
}

const SECTIONS: &[(&str, DeclKind)] = &[
    ("Macros", DeclKind::ObjectMacro),
    ("Types", DeclKind::TypeDecl),
    ("Extern Variables", DeclKind::GlobalVariable),
    ("Function Prototypes", DeclKind::FunctionSignature),
];

impl GlueFormatter {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            provenance: true,
        }
    }

    pub fn with_provenance(mut self, provenance: bool) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self, units: &[SourceUnit], interface: &SharedInterface) -> String {
        let guard = guard_name(&self.file_name);
        let mut out = String::new();
        out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
        out.push_str("#include <Arduino.h>\n");

        // configuration macros come before the libraries they configure
        let (macros, rest) = SECTIONS.split_at(1);
        for (title, kind) in macros {
            out.push_str(&self.section(units, interface, title, *kind));
        }

        let mut includes = ConditionalWriter::new();
        for include in interface.includes() {
            let unit = units
                .iter()
                .position(|unit| unit.includes.contains(include))
                .unwrap_or_default();
            includes.write(unit, &include.conditions, &include.text);
        }
        let includes = includes.finish();
        if !includes.is_empty() && !out.ends_with("<Arduino.h>\n") {
            out.push('\n');
        }
        out.push_str(&includes);

        for (title, kind) in rest {
            out.push_str(&self.section(units, interface, title, *kind));
        }

        out.push_str(&format!("\n#endif // {guard}\n"));
        out
    }

    /// One titled section, empty when no entry has `kind`.
    fn section(
        &self,
        units: &[SourceUnit],
        interface: &SharedInterface,
        title: &str,
        kind: DeclKind,
    ) -> String {
        let mut entries: Vec<&GlueEntry> = interface
            .entries()
            .iter()
            .filter(|entry| entry.kind == kind)
            .collect();
        if entries.is_empty() {
            return String::new();
        }
        // discovery order, including types promoted after the first pass
        entries.sort_by_key(|entry| entry.variants[0]);

        let mut section = ConditionalWriter::new();
        for entry in entries {
            if self.provenance {
                section.write(entry.home, &[], &self.provenance_note(units, entry));
            }
            for &(unit, index) in &entry.variants {
                let decl = &units[unit].declarations[index];
                section.write(unit, &decl.conditions, &interface_text(decl));
            }
        }
        format!("\n//== {title} ==\n{}", section.finish())
    }

    fn provenance_note(&self, units: &[SourceUnit], entry: &GlueEntry) -> String {
        let home = &units[entry.home].file_name;
        let users: Vec<&str> = entry
            .referenced_by
            .iter()
            .map(|&unit| units[unit].file_name.as_str())
            .collect();

        match entry.kind {
            DeclKind::GlobalVariable | DeclKind::FunctionSignature if !users.is_empty() => {
                format!("//-- from {home} (used in {})", users.join(", "))
            }
            _ => format!("//-- from {home}"),
        }
    }
}
