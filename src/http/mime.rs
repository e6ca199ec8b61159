//! # Tipos MIME
//! src/http/mime.rs
//!
//! Tabla fija sufijo → Content-Type. Lo desconocido es `text/plain`.

/// Content-Type por defecto
pub const DEFAULT_MIME: &str = "text/plain";

const MIME_TABLE: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
];

/// Obtiene el Content-Type según la extensión del nombre
///
/// # Ejemplo
/// ```
/// use file_server::http::mime::mime_for;
///
/// assert_eq!(mime_for("index.html"), "text/html");
/// assert_eq!(mime_for("foto.JPG"), "image/jpeg");
/// assert_eq!(mime_for("notas"), "text/plain");
/// ```
pub fn mime_for(name: &str) -> &'static str {
    let extension = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_MIME,
    };

    MIME_TABLE
        .iter()
        .find(|(suffix, _)| *suffix == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME)
}
