//! `devrun check` - validate configuration and print the catalog

use crate::server::catalog::Catalog;
use crate::server::load_config;
use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration, validate projects and print what would be served
pub fn run(extra: Option<&Path>) -> Result<()> {
    let config = load_config(extra)?;
    let catalog = Catalog::from_config(&config.projects).context("Invalid project configuration")?;

    println!("devrun v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  listen:  http://{}:{}",
        config.server.host, config.server.port
    );
    println!("  history: {}", config.history_path().display());
    println!(
        "  shell:   {}",
        config.supervisor.to_manager_config().shell
    );
    println!();

    if catalog.projects().is_empty() {
        println!("No projects configured. Add [[projects]] to config/local.toml.");
        return Ok(());
    }

    for project in catalog.projects() {
        println!("{} ({})  {}", project.id, project.name, project.root.display());
        if !project.root.is_dir() {
            println!("  ! root directory does not exist");
        }
        for service in &project.services {
            let default_marker = if project.default_service.as_deref() == Some(service.name.as_str()) {
                " *"
            } else {
                ""
            };
            let port = service
                .port
                .map(|p| format!("  :{p}"))
                .unwrap_or_default();
            println!("  - {}{}: {}{}", service.name, default_marker, service.cmd, port);
        }
    }

    Ok(())
}
