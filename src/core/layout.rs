use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a sketch folder lives and where its converted project goes.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub name: String,
    pub output_root: PathBuf,
}

impl ProjectLayout {
    /// The project name is the sketch folder's name. Without an explicit
    /// output directory the project is generated in
    /// `<root>/PlatformIO/<name>`.
    pub fn resolve(project_root: &Path, output: Option<&Path>) -> Result<Self> {
        let root = project_root
            .canonicalize()
            .with_context(|| format!("project folder {} not found", project_root.display()))?;
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("cannot derive a project name from {}", root.display()))?;

        let output_root = match output {
            Some(output) => output.to_path_buf(),
            None => root.join("PlatformIO").join(&name),
        };

        Ok(Self {
            root,
            name,
            output_root,
        })
    }

    pub fn output_path(&self, relative: &Path) -> PathBuf {
        self.output_root.join(relative)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Copy `<root>/data` to `<output>/data`, replacing an earlier copy.
    /// Returns the number of files copied, or `None` without a data folder.
    pub fn copy_data(&self) -> Result<Option<usize>> {
        let source = self.data_dir();
        if !source.is_dir() {
            return Ok(None);
        }
        let target = self.output_root.join("data");
        if target.exists() {
            fs::remove_dir_all(&target)
                .with_context(|| format!("failed to remove {}", target.display()))?;
        }

        let mut copied = 0usize;
        for entry in WalkDir::new(&source).follow_links(false) {
            let entry = entry.with_context(|| format!("failed to walk {}", source.display()))?;
            let relative = entry
                .path()
                .strip_prefix(&source)
                .with_context(|| format!("unexpected path {}", entry.path().display()))?;
            let destination = target.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination)
                    .with_context(|| format!("failed to create {}", destination.display()))?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &destination)
                    .with_context(|| format!("failed to copy {}", entry.path().display()))?;
                copied += 1;
            }
        }

        Ok(Some(copied))
    }
}
