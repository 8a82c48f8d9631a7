use anyhow::Result;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::layout::ProjectLayout;
use super::pipeline::{self, PipelineRun, SourceInput};
use super::report::{ArtifactFailure, ConversionReport, Fatal, SymbolReport, UnitReport};
use super::{ConvertError, FileScanner};
use crate::formatters::{EmittedFile, GlueFormatter, PlatformIoIniFormatter};
use crate::parsers::common::read_source;

/// Library-side configuration; the CLI maps its flags onto this.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Defaults to `<project>/PlatformIO/<name>`.
    pub output_dir: Option<PathBuf>,
    pub glue_name: String,
    pub board_env: String,
    pub copy_data: bool,
    pub write_ini: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            glue_name: "arduinoGlue.h".to_string(),
            board_env: "myBoard".to_string(),
            copy_data: true,
            write_ini: true,
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn with_glue_name(mut self, glue_name: impl Into<String>) -> Self {
        self.glue_name = glue_name.into();
        self
    }

    pub fn with_board_env(mut self, board_env: impl Into<String>) -> Self {
        self.board_env = board_env.into();
        self
    }

    pub fn with_data_copy(mut self, copy_data: bool) -> Self {
        self.copy_data = copy_data;
        self
    }

    pub fn with_ini(mut self, write_ini: bool) -> Self {
        self.write_ini = write_ini;
        self
    }
}

/// Convert a sketch folder with default options.
pub fn convert(project_root: &Path) -> Result<ConversionReport> {
    ProjectConverter::new(ConvertOptions::default()).convert(project_root)
}

pub struct ProjectConverter {
    options: ConvertOptions,
    file_scanner: FileScanner,
}

impl ProjectConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            file_scanner: FileScanner::new(),
        }
    }

    /// Only a missing or unreadable project folder is an error; every
    /// per-file failure ends up in the report and the run goes on.
    pub fn convert(&self, project_root: &Path) -> Result<ConversionReport> {
        let layout = ProjectLayout::resolve(project_root, self.options.output_dir.as_deref())?;
        info!(project = %layout.name, output = %layout.output_root.display(), "converting sketch");

        let files = self.file_scanner.scan_directory(&layout.root, &layout.name)?;
        info!(files = files.len(), "found source units");

        let mut report = ConversionReport {
            project_name: layout.name.clone(),
            output_root: layout.output_root.clone(),
            ..ConversionReport::default()
        };

        let contents: Vec<_> = files
            .par_iter()
            .map(|file| {
                read_source(&file.path).map_err(|err| ConvertError::Read {
                    path: file.path.clone(),
                    source: into_io_error(err),
                })
            })
            .collect();

        let mut sources = Vec::with_capacity(files.len());
        for (file, content) in files.iter().zip(contents) {
            match content {
                Ok(text) => sources.push(SourceInput {
                    path: file.path.clone(),
                    role: file.role,
                    text,
                }),
                Err(err) => {
                    warn!(file = %file.file_name, "{err}");
                    report.units.push(UnitReport {
                        path: file.path.clone(),
                        file_name: file.file_name.clone(),
                        role: file.role,
                        declarations: 0,
                        warnings: Vec::new(),
                        fatal: Some(Fatal {
                            kind: err.fatal_kind(),
                            message: err.to_string(),
                        }),
                    });
                }
            }
        }

        let glue = GlueFormatter::new(self.options.glue_name.clone());
        let run = pipeline::run(sources, &glue);
        self.write_outputs(&layout, run, &mut report);
        self.write_collaborators(&layout, &mut report);

        // units that failed to read were recorded first; restore traversal order
        let order: Vec<&Path> = files.iter().map(|file| file.path.as_path()).collect();
        report
            .units
            .sort_by_key(|unit| order.iter().position(|path| *path == unit.path));

        info!(
            generated = report.generated_files.len(),
            warnings = report.warning_count(),
            fatal = report.fatal_count(),
            "conversion finished"
        );
        Ok(report)
    }

    fn write_outputs(&self, layout: &ProjectLayout, run: PipelineRun, report: &mut ConversionReport) {
        let PipelineRun {
            units,
            interface,
            glue,
            emissions,
        } = run;

        let mut fatals: Vec<Option<Fatal>> = vec![None; units.len()];

        match write_file(layout, &glue) {
            Ok(()) => report.generated_files.push(glue.relative_path.clone()),
            Err(err) => report.failures.push(ArtifactFailure {
                path: glue.relative_path.clone(),
                message: err.to_string(),
            }),
        }

        for emission in emissions {
            let outcome = emission.result.and_then(|emitted| {
                for file in &emitted.files {
                    write_file(layout, file)?;
                    report.generated_files.push(file.relative_path.clone());
                }
                Ok(())
            });
            if let Err(err) = outcome {
                warn!("{err}");
                for &unit in &emission.units {
                    fatals[unit] = Some(Fatal {
                        kind: err.fatal_kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        for (unit, fatal) in units.iter().zip(fatals) {
            let mut warnings = unit.diagnostics.clone();
            warnings.extend(interface.diagnostics(unit.id).iter().cloned());

            report.units.push(UnitReport {
                path: unit.path.clone(),
                file_name: unit.file_name.clone(),
                role: unit.role,
                declarations: unit.declarations.len(),
                warnings,
                fatal,
            });

            for (index, decl) in unit.declarations.iter().enumerate() {
                report.symbols.push(SymbolReport {
                    name: decl.name.clone(),
                    kind: decl.kind,
                    file: unit.file_name.clone(),
                    line: decl.line,
                    decision: interface.decision((unit.id, index)).clone(),
                });
            }
        }
    }

    fn write_collaborators(&self, layout: &ProjectLayout, report: &mut ConversionReport) {
        if self.options.copy_data {
            match layout.copy_data() {
                Ok(Some(copied)) => info!(copied, "data folder copied"),
                Ok(None) => debug!("no data folder"),
                Err(err) => report.failures.push(ArtifactFailure {
                    path: PathBuf::from("data"),
                    message: format!("{err:#}"),
                }),
            }
        }

        if self.options.write_ini {
            let ini = PlatformIoIniFormatter::new(self.options.board_env.clone());
            let path = layout.output_path(Path::new("platformio.ini"));
            match ini.format_to_file(&report.generated_files, &path) {
                Ok(true) => report.generated_files.push(PathBuf::from("platformio.ini")),
                Ok(false) => debug!("platformio.ini already present"),
                Err(err) => report.failures.push(ArtifactFailure {
                    path: PathBuf::from("platformio.ini"),
                    message: format!("{err:#}"),
                }),
            }
        }
    }
}

fn write_file(layout: &ProjectLayout, file: &EmittedFile) -> Result<(), ConvertError> {
    let path = layout.output_path(&file.relative_path);
    let write = |path: &Path| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &file.contents)
    };
    write(&path).map_err(|source| ConvertError::Write { path, source })
}

fn into_io_error(err: anyhow::Error) -> std::io::Error {
    match err.downcast::<std::io::Error>() {
        Ok(io) => io,
        Err(other) => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
    }
}

