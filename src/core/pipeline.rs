//! The in-memory conversion: normalize and classify every unit, resolve
//! cross-references, freeze the shared interface, emit every unit. No file
//! system access happens here.

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::interface::{SharedInterface, SharedInterfaceBuilder};
use super::resolver::CrossReferenceTable;
use super::ConvertError;
use crate::formatters::{EmittedFile, EmittedUnit, GlueFormatter, UnitFormatter};
use crate::parsers::{SourceUnit, UnitId, UnitRole};

/// One input file, already read.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub path: PathBuf,
    pub role: UnitRole,
    pub text: String,
}

impl SourceInput {
    /// `None` when the extension is not a sketch, source or header.
    pub fn new(path: impl AsRef<Path>, text: impl Into<String>) -> Option<Self> {
        let path = path.as_ref();
        let role = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| UnitRole::from_extension(&ext.to_ascii_lowercase()))?;
        Some(Self {
            path: path.to_path_buf(),
            role,
            text: text.into(),
        })
    }
}

/// Emission result for one implementation unit (with its companion header,
/// if any) or one standalone header.
#[derive(Debug)]
pub struct UnitEmission {
    pub units: Vec<UnitId>,
    pub result: Result<EmittedUnit, ConvertError>,
}

pub struct PipelineRun {
    pub units: Vec<SourceUnit>,
    pub interface: SharedInterface,
    pub glue: EmittedFile,
    pub emissions: Vec<UnitEmission>,
}

/// Run every stage over `sources`, which must already be in traversal order.
pub fn run(sources: Vec<SourceInput>, glue: &GlueFormatter) -> PipelineRun {
    let units: Vec<SourceUnit> = sources
        .into_par_iter()
        .enumerate()
        .map(|(id, source)| SourceUnit::parse(id, &source.path, source.role, source.text))
        .collect();

    let declarations: usize = units.iter().map(|unit| unit.declarations.len()).sum();
    info!(units = units.len(), declarations, "classified source units");

    let xref = CrossReferenceTable::build(&units);

    let mut builder = SharedInterfaceBuilder::new(&units, &xref);
    for unit in &units {
        builder.add_unit(unit);
    }
    let interface = builder.freeze();
    info!(entries = interface.entries().len(), "shared interface built");

    let glue_file = EmittedFile {
        relative_path: PathBuf::from("include").join(glue.file_name()),
        contents: glue.format(&units, &interface),
    };

    let emissions = emit_units(&units, &interface, glue.file_name(), &glue_file.relative_path);

    PipelineRun {
        units,
        interface,
        glue: glue_file,
        emissions,
    }
}

fn emit_units(
    units: &[SourceUnit],
    interface: &SharedInterface,
    glue_name: &str,
    glue_path: &Path,
) -> Vec<UnitEmission> {
    let formatter = UnitFormatter::new(interface, glue_name);

    let mut companions: HashMap<UnitId, UnitId> = HashMap::new();
    for unit in units.iter().filter(|unit| unit.role.has_implementation()) {
        let header = units.iter().find(|header| {
            header.role == UnitRole::Header
                && header.stem == unit.stem
                && !companions.values().any(|&taken| taken == header.id)
        });
        if let Some(header) = header {
            companions.insert(unit.id, header.id);
        }
    }

    let mut produced: HashMap<PathBuf, String> = HashMap::new();
    produced.insert(glue_path.to_path_buf(), glue_name.to_string());

    let mut emissions = Vec::with_capacity(units.len());
    for unit in units {
        if companions.values().any(|&header| header == unit.id) {
            continue;
        }

        let companion = companions.get(&unit.id).map(|&header| &units[header]);
        let mut owners = vec![unit.id];
        owners.extend(companion.map(|header| header.id));

        let result = formatter
            .format(unit, companion)
            .and_then(|emitted| claim_paths(&mut produced, unit, emitted));
        debug!(file = %unit.file_name, ok = result.is_ok(), "emitted unit");

        emissions.push(UnitEmission {
            units: owners,
            result,
        });
    }

    emissions
}

/// Two inputs must never be written to the same output path.
fn claim_paths(
    produced: &mut HashMap<PathBuf, String>,
    unit: &SourceUnit,
    emitted: EmittedUnit,
) -> Result<EmittedUnit, ConvertError> {
    for path in emitted.paths() {
        if let Some(other) = produced.get(path) {
            return Err(ConvertError::OutputCollision {
                path: path.clone(),
                other: other.clone(),
            });
        }
    }
    for path in emitted.paths() {
        produced.insert(path.clone(), unit.file_name.clone());
    }
    Ok(emitted)
}
