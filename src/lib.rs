//! # sketchport
//!
//! Converts a flat Arduino sketch folder into a PlatformIO project.
//!
//! Every `.ino`, `.cpp` and `.h` in the folder is scanned for top-level
//! declarations. Object-like macros, and variables, functions and types used
//! by more than one file, are collected into one shared glue header
//! (`arduinoGlue.h`); everything else gets a prototype in the file's own
//! header. Original definitions stay where they are, annotated with where
//! their declaration now lives.
//!
//! ## Pipeline
//!
//! 1. **Normalize**: mask comments and literal contents, offsets unchanged
//! 2. **Classify**: tag scope-depth-0 constructs per file
//! 3. **Resolve**: find which files mention each declared name
//! 4. **Build**: decide and freeze the shared interface
//! 5. **Emit**: rewrite every file and write the project
//!
//! ```no_run
//! let report = sketchport::convert(std::path::Path::new("Blink"))?;
//! std::process::exit(report.exit_status());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod core;
pub mod formatters;
pub mod parsers;

pub use crate::core::{convert, ConversionReport, ConvertOptions, ProjectConverter};
