//! # Construcción de Respuestas HTTP
//!
//! API para construir respuestas y serializarlas sobre la conexión.
//!
//! ## Formato
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 27\r\n
//! Connection: close\r\n
//! \r\n
//! <html><h1>Hola</h1></html>
//! ```
//!
//! `Content-Length` siempre se calcula en bytes del body al serializar,
//! así que es correcto también para contenido multibyte.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use file_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "text/plain")
//!     .with_body("ñandú");
//!
//! let text = String::from_utf8(response.to_bytes()).unwrap();
//! assert!(text.contains("Content-Length: 7\r\n"));
//! ```

use super::StatusCode;
use std::collections::HashMap;
use std::io::{self, Write};

/// Respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Headers extra (Content-Length no se guarda aquí)
    headers: HashMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (si ya existe, se sobrescribe)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de [`Response::with_header`]
    pub fn add_header(&mut self, name: &str, value: &str) {
        if name.eq_ignore_ascii_case("Content-Length") {
            return;
        }
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body desde un string
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    /// Establece el body desde bytes (archivos binarios)
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Respuesta HTML con el status dado
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::{Response, StatusCode};
    ///
    /// let response = Response::html(StatusCode::Created, "<html><h1>Creado</h1></html>");
    /// assert_eq!(response.header("Content-Type"), Some("text/html"));
    /// ```
    pub fn html(status: StatusCode, body: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/html")
            .with_body(body)
    }

    /// Respuesta de texto plano
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/plain")
            .with_body(body)
    }

    /// Respuesta JSON exitosa (200 OK)
    pub fn json(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// Respuesta 200 con el contenido de un archivo
    pub fn file(mime: &str, content: Vec<u8>) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", mime)
            .with_body_bytes(content)
    }

    /// 302 Found hacia `location`, sin body
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::http::{Response, StatusCode};
    ///
    /// let response = Response::redirect("http://localhost:8081/index.html");
    /// assert_eq!(response.status(), StatusCode::Found);
    /// assert_eq!(response.header("Location"), Some("http://localhost:8081/index.html"));
    /// ```
    pub fn redirect(location: &str) -> Self {
        Self::new(StatusCode::Found)
            .with_header("Location", location)
            .with_header("Connection", "close")
    }

    /// Respuesta de error HTML: `<html><h1>Error N: mensaje</h1></html>`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = format!(
            "<html><h1>Error {}: {}</h1></html>",
            status.as_u16(),
            message
        );
        Self::html(status, &body)
    }

    /// Serializa: status line, headers, Content-Length, línea vacía, body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(128 + self.body.len());

        // 1. Status line
        result.extend_from_slice(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());

        // 2. Headers
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        result.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());

        // 3. Línea vacía + body
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    /// Escribe la respuesta completa sobre la conexión
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene un header (el nombre no distingue mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
