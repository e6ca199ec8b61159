//! # Almacén de Recursos
//! src/store/mod.rs
//!
//! Lectura, escritura y borrado de recursos bajo un único directorio raíz.
//! Un recurso es un archivo regular en `root/<nombre>`.
//!
//! No hay locking propio: escrituras concurrentes al mismo nombre quedan
//! con la semántica del sistema de archivos (gana la última).
//!
//! Los nombres con `..`, rutas absolutas o `\` se rechazan con
//! [`StoreError::InvalidPath`] para que nadie salga del directorio raíz.

use crate::error::StoreError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Almacén de recursos respaldado por el sistema de archivos
#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    /// Crea un almacén sobre `root` (no crea el directorio)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directorio raíz
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resuelve un nombre de recurso a su ruta dentro de la raíz
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains('\\') {
            return Err(StoreError::InvalidPath(name.to_string()));
        }

        let relative = Path::new(name);
        let only_normal = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

        if !only_normal {
            return Err(StoreError::InvalidPath(name.to_string()));
        }

        Ok(self.root.join(relative))
    }

    /// Lee el contenido completo de un recurso.
    ///
    /// Un directorio cuenta como inexistente.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(name)?;

        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StoreError::NotFound(name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        }

        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
            _ => StoreError::Io(e),
        })
    }

    /// Escribe (crea o reemplaza) un recurso
    pub fn write(&self, name: &str, content: &[u8]) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Elimina un recurso si existe y es un archivo regular
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;

        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StoreError::NotFound(name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        }

        fs::remove_file(&path)?;
        Ok(())
    }
}
