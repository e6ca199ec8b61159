//! # Errores del Servidor
//! src/error.rs
//!
//! Taxonomía de errores:
//! - `ConfigError`: configuración inválida (fatal al arrancar)
//! - `ServerError`: fallos de la instancia (bind fatal, I/O)
//! - `StoreError`: fallos del almacén de recursos, que el handler traduce a
//!   códigos HTTP (404, 400, 500)

use std::io;
use thiserror::Error;

/// Errores de validación de la configuración
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workers must be >= 1")]
    NoWorkers,

    #[error("root directory must not be empty")]
    EmptyRoot,

    #[error("backup host must not be empty")]
    EmptyBackupHost,
}

/// Errores a nivel de instancia del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No se pudo abrir el puerto: la instancia no sirve
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errores del almacén de recursos
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Nombre que escaparía del directorio raíz (`..`, rutas absolutas)
    #[error("invalid resource path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
