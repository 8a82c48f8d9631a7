use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Starter `platformio.ini` for a converted project. The board section is
/// left commented out; only the environment name is filled in.
pub struct PlatformIoIniFormatter {
    board_env: String,
}

impl PlatformIoIniFormatter {
    pub fn new(board_env: impl Into<String>) -> Self {
        Self {
            board_env: board_env.into(),
        }
    }

    /// Writes the file unless one exists. Returns whether it was written.
    pub fn format_to_file(&self, generated_files: &[PathBuf], output_path: &Path) -> Result<bool> {
        if output_path.exists() {
            return Ok(false);
        }
        fs::write(output_path, self.format(generated_files))
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        Ok(true)
    }

    pub fn format(&self, generated_files: &[PathBuf]) -> String {
        let env = &self.board_env;
        let mut out = String::new();
        out.push_str("; PlatformIO Project Configuration File\n");
        out.push_str(";\n");
        out.push_str("; Please visit documentation for the other options and examples\n");
        out.push_str("; https://docs.platformio.org/page/projectconf.html\n");
        out.push_str(";\n");
        out.push_str("; Converted sources:\n");
        for path in generated_files {
            out.push_str(&format!(";   {}\n", path.to_string_lossy().replace('\\', "/")));
        }
        out.push('\n');
        out.push_str("[platformio]\n");
        out.push_str("workspace_dir = .pio.nosync\n");
        out.push_str(&format!("default_envs = {env}\n\n"));
        out.push_str(&format!("[env:{env}]\n"));
        out.push_str(";-- esp32\n");
        out.push_str(";platform = espressif32\n");
        out.push_str(";board = esp32dev\n");
        out.push_str(";-- esp8266\n");
        out.push_str(";platform = espressif8266\n");
        out.push_str(";board = esp12e\n");
        out.push_str(";-- avr\n");
        out.push_str(";platform = atmelavr\n");
        out.push_str(";board = uno\n");
        out.push('\n');
        out.push_str("framework = arduino\n");
        out.push_str("monitor_speed = 115200\n");
        out.push_str("build_flags =\n");
        out.push_str("\t-D DEBUG\n");
        out.push('\n');
        out.push_str("lib_ldf_mode = deep+\n");
        out.push('\n');
        out.push_str("lib_deps =\n");
        out
    }
}

impl Default for PlatformIoIniFormatter {
    fn default() -> Self {
        Self::new("myBoard")
    }
}
