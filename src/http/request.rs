//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser incremental que lee un request directamente desde la conexión.
//!
//! ## Formato de un Request
//!
//! ```text
//! PUT /notas.txt HTTP/1.1\r\n
//! Host: localhost:8000\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hola!
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path VERSION` (la versión se ignora)
//! 2. **Headers**: Pares `Name: Value` hasta una línea vacía
//! 3. **Body**: Se lee aparte con [`Request::read_body`], según `Content-Length`

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read};
use thiserror::Error;

/// Recurso servido cuando el path está vacío
pub const DEFAULT_RESOURCE: &str = "index.html";

/// Máximo de headers aceptados por request
const MAX_HEADERS: usize = 100;

/// Largo máximo de una línea (request line o header), incluido el `\r\n`
pub const MAX_LINE_BYTES: usize = 8 * 1024;

/// Máximo tamaño de body aceptado (10 MiB)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Métodos HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// POST - Eco del body (no se persiste)
    POST,

    /// PUT - Escribir un recurso
    PUT,

    /// DELETE - Eliminar un recurso
    DELETE,

    /// Cualquier otro método (responde 405)
    Other(String),
}

impl Method {
    /// Parsea un método HTTP desde un string. Nunca falla: lo desconocido
    /// queda en `Other` para que el dispatch decida.
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::Other(m) => m,
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Error)]
pub enum ParseError {
    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,

    /// Formato inválido de la request line
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// Header malformado
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Request line o header más largo que [`MAX_LINE_BYTES`]
    #[error("Line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Content-Length no numérico o demasiado grande
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("I/O error while reading request: {0}")]
    Io(#[from] io::Error),
}

/// Request parseado (sin body)
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Nombre del recurso, sin la barra inicial (ej: "docs/a.txt")
    path: String,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    version: String,

    /// Valor de Content-Length si vino declarado
    content_length: Option<usize>,
}

impl Request {
    /// Lee request line y headers desde la conexión.
    ///
    /// Retorna `Ok(None)` si el cliente cerró sin enviar nada.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Option<Self>, ParseError> {
        let request_line = match read_line(reader)? {
            Some(line) => line,
            None => return Ok(None),
        };

        let (method, path, version) = Self::parse_request_line(&request_line)?;
        let headers = Self::read_headers(reader)?;
        let content_length = Self::parse_content_length(&headers)?;

        Ok(Some(Request {
            method,
            path,
            headers,
            version,
            content_length,
        }))
    }

    /// Parsea un request completo desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use file_server::http::Request;
    ///
    /// let request = Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    /// assert_eq!(request.path(), "index.html");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let mut reader = buffer;
        Self::read_from(&mut reader)?.ok_or(ParseError::EmptyRequest)
    }

    /// Parsea la request line: `METHOD /path [VERSION]`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() < 2 || parts.len() > 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::parse(parts[0]);
        let path = Self::resource_name(parts[1]);
        let version = parts.get(2).copied().unwrap_or("HTTP/1.0").to_string();

        Ok((method, path, version))
    }

    /// Convierte el target del request en nombre de recurso.
    ///
    /// "/docs/a.txt?v=1" -> "docs/a.txt", "/" -> "index.html"
    fn resource_name(target: &str) -> String {
        let without_query = match target.find('?') {
            Some(pos) => &target[..pos],
            None => target,
        };
        let name = without_query.strip_prefix('/').unwrap_or(without_query);

        if name.is_empty() {
            DEFAULT_RESOURCE.to_string()
        } else {
            name.to_string()
        }
    }

    /// Lee headers hasta la línea vacía (o EOF)
    fn read_headers<R: BufRead>(reader: &mut R) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        while let Some(line) = read_line(reader)? {
            if line.is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Err(ParseError::InvalidHeader("too many headers".to_string()));
            }

            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
                }
                None => return Err(ParseError::InvalidHeader(line)),
            }
        }

        Ok(headers)
    }

    fn parse_content_length(headers: &HashMap<String, String>) -> Result<Option<usize>, ParseError> {
        let raw = match headers.get("content-length") {
            Some(value) => value,
            None => return Ok(None),
        };

        let length: usize = raw
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(raw.clone()))?;

        if length > MAX_BODY_BYTES {
            return Err(ParseError::InvalidContentLength(raw.clone()));
        }

        Ok(Some(length))
    }

    /// Lee el body del request.
    ///
    /// Con `Content-Length` lee exactamente esa cantidad de bytes. Sin él,
    /// si `drain_buffered` es true se toman los bytes que ya están en el
    /// buffer del lector (sin bloquear), si no el body queda vacío.
    pub fn read_body<R: Read>(
        &self,
        reader: &mut BufReader<R>,
        drain_buffered: bool,
    ) -> io::Result<Vec<u8>> {
        match self.content_length {
            Some(length) => {
                let mut body = vec![0u8; length];
                reader.read_exact(&mut body)?;
                Ok(body)
            }
            None if drain_buffered => {
                let body = reader.buffer().to_vec();
                reader.consume(body.len());
                Ok(body)
            }
            None => Ok(Vec::new()),
        }
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene un header (el nombre no distingue mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Content-Length declarado, 0 si no vino
    pub fn content_length(&self) -> usize {
        self.content_length.unwrap_or(0)
    }
}

/// Lee una línea terminada en `\n` y le quita el `\r\n`.
/// Retorna `None` en EOF.
///
/// Nunca acumula más de `MAX_LINE_BYTES + 1` bytes.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ParseError> {
    let mut raw = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_BYTES as u64 + 1)
        .read_until(b'\n', &mut raw)?;
    if read == 0 {
        return Ok(None);
    }
    if read > MAX_LINE_BYTES {
        return Err(ParseError::LineTooLong(MAX_LINE_BYTES));
    }

    while matches!(raw.last(), Some(b'\n') | Some(b'\r')) {
        raw.pop();
    }

    String::from_utf8(raw)
        .map(Some)
        .map_err(|_| ParseError::InvalidRequestLine)
}
