//! # File Server - Entry Point
//! src/main.rs
//!
//! Lee la configuración (CLI + entorno), inicia el logging y corre el
//! servidor hasta que el proceso termine.

use file_server::config::Config;
use file_server::server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("file_server=info")),
        )
        .init();

    info!("=== File Server (principal / respaldo) ===");

    let config = Config::new();
    config.log_summary();

    if let Err(e) = std::fs::create_dir_all(&config.root_dir) {
        error!(root = %config.root_dir, error = %e, "no se pudo crear el directorio raíz");
        std::process::exit(1);
    }

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "error fatal");
            std::process::exit(1);
        }
    };

    // Esto bloquea el thread principal
    if let Err(e) = server.run() {
        error!(error = %e, "error fatal");
        std::process::exit(1);
    }
}
