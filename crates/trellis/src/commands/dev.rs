//! Development server command.

use std::path::Path;

use anyhow::{Context, Result};
use trellis_build::{emit, BuildConfigAssembler, BuildEnv, Mode};
use trellis_server::{DevServer, DevServerConfig};

use crate::config::{project_root, ConfigFile};

/// Run the dev server.
pub async fn run(config_path: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let root = project_root(config_path);
    let mut layout = ConfigFile::load(config_path)?.layout(&root);
    if let Some(port) = port {
        layout.dev_port = port;
    }
    layout.open_browser = layout.open_browser && open;

    let assembler = BuildConfigAssembler::new(layout);
    let env = BuildEnv::from_process().serving(true);

    let config = assembler
        .assemble(Mode::Development, &env)
        .context("Failed to assemble build configuration")?;
    emit(&config).context("Failed to write build output")?;

    // Only present when assembled for serving
    let Some(options) = config.dev_server.clone() else {
        anyhow::bail!("Development build has no dev-server options");
    };

    tracing::info!("Starting development server on port {}", options.port);

    let layout = assembler.layout();
    let server_config = DevServerConfig {
        root: layout.root.clone(),
        build_dir: config.output_path.clone(),
        static_dir: options.static_dir,
        watch_dirs: vec![layout.source_dir.clone()],
        watch_files: options.watch_files,
        port: options.port,
        open: options.open,
        history_api_fallback: options.history_api_fallback,
        hot: options.hot,
        ..Default::default()
    };

    let rebuild = assembler.clone();
    DevServer::new(server_config)
        .on_change(move || {
            let config = rebuild
                .assemble(Mode::Development, &env)
                .map_err(|e| e.to_string())?;
            emit(&config).map_err(|e| e.to_string())?;
            Ok(())
        })
        .start()
        .await?;

    Ok(())
}
