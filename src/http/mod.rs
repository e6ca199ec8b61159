//! # Módulo HTTP
//!
//! Subconjunto simplificado de HTTP/1.1, implementado desde cero:
//!
//! - Parsing de requests (request line, headers, body por Content-Length)
//! - Construcción de responses
//! - Códigos de estado
//! - Tipos MIME por extensión
//!
//! Una conexión lleva un solo request y se cierra tras la respuesta:
//! no hay keep-alive ni chunked transfer encoding.

pub mod mime;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales
pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
