use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    outbox_common::logging::init();

    let config_path = find_config_file()?;
    let config_content = std::fs::read_to_string(&config_path).map_err(|e| {
        anyhow::anyhow!("failed to read config from {}: {e}", config_path.display())
    })?;
    let controller: outbox::Controller = ron::from_str(&config_content)?;

    controller.run().await
}

/// Finds the configuration file using the following precedence:
/// 1. `OUTBOX_CONFIG` environment variable
/// 2. `./outbox.config.ron` (current working directory)
/// 3. `/etc/outbox/outbox.config.ron` (system-wide config)
fn find_config_file() -> anyhow::Result<PathBuf> {
    if let Ok(env_path) = std::env::var("OUTBOX_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("OUTBOX_CONFIG points to non-existent file: {}", path.display());
    }

    let default_paths = [
        PathBuf::from("./outbox.config.ron"),
        PathBuf::from("/etc/outbox/outbox.config.ron"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "no configuration file found. Tried:\n  - OUTBOX_CONFIG environment variable\n{paths_tried}"
    )
}
