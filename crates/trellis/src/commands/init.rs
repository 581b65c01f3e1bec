//! Scaffold a new project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::project_root;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing trellis project...");

    let root = project_root(config_path);
    scaffold(&root, config_path, yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'trellis dev' to start the development server.");

    Ok(())
}

/// Write the starter files under `root`. Existing files are kept unless `overwrite`.
fn scaffold(root: &Path, config_path: &Path, overwrite: bool) -> Result<()> {
    let files = [
        (config_path.to_path_buf(), DEFAULT_CONFIG),
        (root.join("src/app.js"), DEFAULT_APP),
        (root.join("src/pages/index.page"), DEFAULT_INDEX),
        (root.join("src/styles/base.pcss"), DEFAULT_BASE_STYLES),
    ];

    for (path, content) in files {
        if path.exists() && !overwrite {
            tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", path.display());
    }

    let assets = root.join("public/assets");
    if !assets.exists() {
        fs::create_dir_all(&assets).context("Failed to create public/assets directory")?;
        tracing::info!("Created {}", assets.display());
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Trellis Configuration

[paths]
# Source root; style fragments are collected from here
src = "src"

# Page templates, relative to src
pages = "pages"

# Static files, served in development and partly copied into the build
public = "public"

# Build output
build = "build"

[styles]
# Style fragment extension
extension = "pcss"

# Generated style entry, relative to src
generated_file = "styles.js"

[pages]
extension = "page"

[assets]
# Folders under public copied into the build
copy = ["assets"]

[server]
port = 8888
open = true
"#;

const DEFAULT_APP: &str = r#"import "./styles";

const API_URL = process.env.API_URL;

console.log(`API at ${API_URL}`);
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Home</title>
  </head>
  <body>
    <main>
      <h1>Hello from trellis</h1>
    </main>
  </body>
</html>
"#;

const DEFAULT_BASE_STYLES: &str = r#"body {
  margin: 0;
  font-family: system-ui, sans-serif;
}
"#;
