//! Build command.

use std::path::Path;

use anyhow::{Context, Result};
use trellis_build::{emit, BuildConfigAssembler, BuildEnv, Mode};

use crate::config::{project_root, ConfigFile};

/// Run the build command.
pub async fn run(config_path: &Path, mode: Mode, write_output: bool, print: bool) -> Result<()> {
    tracing::info!("Building {} site...", mode);

    let file_config = ConfigFile::load(config_path)?;
    let layout = file_config.layout(&project_root(config_path));

    let config = BuildConfigAssembler::new(layout)
        .assemble(mode, &BuildEnv::from_process())
        .context("Failed to assemble build configuration")?;

    if print {
        println!("{}", config.to_json()?);
    }

    if !write_output {
        return Ok(());
    }

    let report = emit(&config).context("Failed to write build output")?;

    tracing::info!(
        "Built {} pages with {} assets in {}ms",
        report.pages,
        report.assets,
        report.duration_ms
    );

    tracing::info!("Output: {}", config.output_path.display());

    Ok(())
}
