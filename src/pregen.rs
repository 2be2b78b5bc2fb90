//! Optional pre-build CSS generation.
//!
//! Some sites generate part of their stylesheet (theme variables, holiday
//! palettes) with a script before bundling. The step is a capability: the
//! build asks for it and gets back an outcome, and only an outcome of
//! [`CssGeneration::Ok`] means the script ran. A missing interpreter or
//! script, or a failing run, is reported and the build carries on with
//! whatever CSS is already on disk.

use crate::context::BuildContext;
use std::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssGeneration {
    /// The script ran and exited successfully.
    Ok,
    /// Disabled, or the interpreter or script isn't available.
    ToolMissing,
    /// The script ran (or tried to) and failed.
    Failed(String),
}

/// Run the configured CSS generator in the source directory.
pub fn generate_css(ctx: &BuildContext) -> CssGeneration {
    let generator = &ctx.config.css_generator;
    if !generator.enabled {
        debug!("css generation disabled");
        return CssGeneration::ToolMissing;
    }

    let script = ctx.source_path(&generator.script);
    if !script.is_file() {
        warn!(script = %script.display(), "css generation script not found, skipping");
        return CssGeneration::ToolMissing;
    }
    let command = match which::which(&generator.command) {
        Ok(path) => path,
        Err(_) => {
            warn!(command = %generator.command, "css generator not on PATH, skipping");
            return CssGeneration::ToolMissing;
        }
    };

    let outcome = match Command::new(&command)
        .arg(&generator.script)
        .current_dir(&ctx.source_dir)
        .output()
    {
        Ok(output) if output.status.success() => CssGeneration::Ok,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            CssGeneration::Failed(format!("{}: {}", output.status, stderr.trim()))
        }
        Err(e) => CssGeneration::Failed(e.to_string()),
    };

    match &outcome {
        CssGeneration::Ok => info!(script = %generator.script, "generated theme css"),
        CssGeneration::Failed(reason) => {
            warn!(script = %generator.script, %reason, "css generation failed, continuing")
        }
        CssGeneration::ToolMissing => {}
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_context, write_file};
    use tempfile::TempDir;

    #[test]
    fn disabled_generator_reports_tool_missing() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = test_context(tmp.path());
        ctx.config.css_generator.enabled = false;
        assert_eq!(generate_css(&ctx), CssGeneration::ToolMissing);
    }

    #[test]
    fn missing_script_reports_tool_missing() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = test_context(tmp.path());
        ctx.config.css_generator.enabled = true;
        assert_eq!(generate_css(&ctx), CssGeneration::ToolMissing);
    }

    #[test]
    fn missing_command_reports_tool_missing() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = test_context(tmp.path());
        write_file(tmp.path(), "gen.js", "");
        ctx.config.css_generator.enabled = true;
        ctx.config.css_generator.script = "gen.js".into();
        ctx.config.css_generator.command = "definitely-not-a-real-interpreter-xyz".into();
        assert_eq!(generate_css(&ctx), CssGeneration::ToolMissing);
    }

    #[cfg(unix)]
    #[test]
    fn successful_run_reports_ok() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = test_context(tmp.path());
        write_file(tmp.path(), "gen.sh", "echo 'a{}' > out.css\n");
        ctx.config.css_generator.enabled = true;
        ctx.config.css_generator.command = "sh".into();
        ctx.config.css_generator.script = "gen.sh".into();

        assert_eq!(generate_css(&ctx), CssGeneration::Ok);
        assert!(tmp.path().join("out.css").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_run_reports_failed() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = test_context(tmp.path());
        write_file(tmp.path(), "gen.sh", "echo boom >&2\nexit 3\n");
        ctx.config.css_generator.enabled = true;
        ctx.config.css_generator.command = "sh".into();
        ctx.config.css_generator.script = "gen.sh".into();

        match generate_css(&ctx) {
            CssGeneration::Failed(reason) => assert!(reason.contains("boom"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
