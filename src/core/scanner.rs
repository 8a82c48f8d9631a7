use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::parsers::UnitRole;

#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub role: UnitRole,
}

pub struct FileScanner;

impl FileScanner {
    pub fn new() -> Self {
        Self
    }

    /// Source units of a sketch folder in traversal order: the main sketch
    /// (`<project_name>.ino`) first, then everything else by file name.
    ///
    /// The folder is flat, so only its direct children are listed; generated
    /// output living below the project root is never picked up.
    pub fn scan_directory(&self, root_path: &Path, project_name: &str) -> Result<Vec<FileInfo>> {
        let entries: Vec<_> = WalkDir::new(root_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .collect::<Result<_, _>>()
            .with_context(|| format!("failed to list {}", root_path.display()))?;

        let mut files: Vec<FileInfo> = entries
            .par_iter()
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                let role = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(|ext| UnitRole::from_extension(&ext.to_ascii_lowercase()))?;
                Some(FileInfo {
                    path: path.to_path_buf(),
                    file_name: entry.file_name().to_string_lossy().into_owned(),
                    role,
                })
            })
            .collect();

        let main_sketch = format!("{project_name}.ino");
        files.sort_by(|a, b| {
            (a.file_name != main_sketch, &a.file_name).cmp(&(b.file_name != main_sketch, &b.file_name))
        });

        Ok(files)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}
