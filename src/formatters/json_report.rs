use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::core::report::{ConversionReport, Outcome};

/// JSON rendering of a [`ConversionReport`].
pub struct JsonReportFormatter {
    /// Only counts, unit outcomes and hoisted symbols.
    minimal: bool,
    pretty: bool,
}

impl JsonReportFormatter {
    pub fn new() -> Self {
        Self {
            minimal: false,
            pretty: true,
        }
    }

    pub fn with_minimal(mut self, minimal: bool) -> Self {
        self.minimal = minimal;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn format_to_file(&self, report: &ConversionReport, output_path: &Path) -> Result<()> {
        let json_content = self.format_report(report)?;
        fs::write(output_path, json_content)
            .with_context(|| format!("failed to write report {}", output_path.display()))?;
        Ok(())
    }

    pub fn format_report(&self, report: &ConversionReport) -> Result<String> {
        let output = if self.minimal {
            let units: Vec<_> = report
                .units
                .iter()
                .map(|unit| {
                    json!({
                        "file": unit.file_name,
                        "outcome": self.outcome_code(unit.outcome()),
                        "warnings": unit.warnings.len()
                    })
                })
                .collect();
            let hoisted: Vec<_> = report
                .hoisted()
                .map(|symbol| json!([symbol.name, symbol.file, symbol.line]))
                .collect();

            json!({
                "meta": {
                    "project": report.project_name,
                    "units": report.units.len(),
                    "symbols": report.symbols.len(),
                    "warnings": report.warning_count(),
                    "fatal": report.fatal_count(),
                    "format": "compact"
                },
                "units": units,
                "hoisted": hoisted,
                "generated": report.generated_files
            })
        } else {
            let mut full = serde_json::to_value(report)?;
            full["meta"] = json!({
                "warnings": report.warning_count(),
                "fatal": report.fatal_count(),
                "exit_status": report.exit_status(),
                "format": "full"
            });
            full
        };

        Ok(if self.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        })
    }

    fn outcome_code(&self, outcome: Outcome) -> &'static str {
        match outcome {
            Outcome::Success => "success",
            Outcome::Warning => "warning",
            Outcome::Fatal(_) => "fatal",
        }
    }
}

impl Default for JsonReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}
