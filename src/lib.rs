//! # File Server
//! src/lib.rs
//!
//! Servidor HTTP de archivos con control de admisión: cuando el pool de
//! workers llega a la mitad de su capacidad, las conexiones nuevas se
//! redirigen (302) a una instancia de respaldo en vez de encolarse.
//!
//! ## Arquitectura
//!
//! - `config`: configuración por CLI / variables de entorno
//! - `error`: errores de configuración, servidor y almacén
//! - `http`: parsing de requests, construcción de responses, MIME
//! - `store`: lectura/escritura/borrado de recursos bajo el directorio raíz
//! - `router`: rutas de respuesta fija (`error400`, `error500`, `info`, `metrics`)
//! - `metrics`: contadores y latencias
//! - `server`: control de admisión, pool de workers, handler y loop de aceptación
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use file_server::config::Config;
//! use file_server::server::Server;
//!
//! let server = Server::new(Config::default()).expect("configuración inválida");
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod router;
pub mod server;
pub mod store;
