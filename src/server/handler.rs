//! # Manejador de Conexiones
//! src/server/handler.rs
//!
//! Ciclo de vida completo de una conexión admitida:
//!
//! 1. Retardo simulado (configurable) para hacer visible la saturación
//! 2. Request line + headers (si el cliente no envió nada, se abandona)
//! 3. Rutas fijas del [`Router`]
//! 4. Dispatch por método contra el [`ResourceStore`]
//! 5. Respuesta y cierre de la conexión, en todos los caminos

use crate::config::Config;
use crate::error::StoreError;
use crate::http::mime::mime_for;
use crate::http::{Method, ParseError, Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::router::{InstanceInfo, RouteContext, Router};
use crate::store::ResourceStore;
use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Cookie fija de demostración
pub const DEMO_COOKIE: &str = "session=demo-file-server; Path=/";

/// Cuánto esperar, como máximo, a que el cliente termine de enviar antes de cerrar
const LINGER_TIMEOUT: Duration = Duration::from_millis(100);

/// Resultado de atender una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// El cliente cerró sin enviar nada
    Abandoned,
    /// Se escribió una respuesta con este status
    Responded(StatusCode),
}

/// Atiende conexiones admitidas. Se comparte entre workers vía `Arc`.
pub struct ConnectionHandler {
    store: ResourceStore,
    router: Router,
    context: RouteContext,
    delay: Duration,
    io_timeout: Option<Duration>,
    demo_cookie: bool,
}

impl ConnectionHandler {
    /// Handler sin retardo, sin timeouts y sin cookie
    pub fn new(store: ResourceStore, router: Router, context: RouteContext) -> Self {
        Self {
            store,
            router,
            context,
            delay: Duration::ZERO,
            io_timeout: None,
            demo_cookie: false,
        }
    }

    pub fn from_config(config: &Config, metrics: MetricsCollector) -> Self {
        let context = RouteContext {
            instance: InstanceInfo::from_config(config),
            metrics,
        };

        Self::new(
            ResourceStore::new(&config.root_dir),
            Router::with_fixed_routes(),
            context,
        )
        .with_delay(config.simulated_delay())
        .with_io_timeout(config.io_timeout())
        .with_demo_cookie(config.demo_cookie)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_demo_cookie(mut self, enabled: bool) -> Self {
        self.demo_cookie = enabled;
        self
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Atiende una conexión TCP de punta a punta y la cierra
    pub fn handle_connection(&self, stream: TcpStream) {
        let start = Instant::now();
        let peer = peer_label(&stream);

        if let Some(timeout) = self.io_timeout {
            if let Err(e) = stream
                .set_read_timeout(Some(timeout))
                .and_then(|_| stream.set_write_timeout(Some(timeout)))
            {
                warn!(%peer, error = %e, "no se pudo configurar el timeout");
            }
        }

        let mut writer = &stream;
        match self.serve(&stream, &mut writer) {
            Ok(Outcome::Responded(status)) => {
                let latency = start.elapsed();
                let latency_ms = latency.as_secs_f64() * 1000.0;
                self.context.metrics.record_request(status.as_u16(), latency);

                if status.is_server_error() {
                    warn!(%peer, status = status.as_u16(), latency_ms, "respuesta de error enviada");
                } else {
                    info!(%peer, status = status.as_u16(), latency_ms, "respuesta enviada");
                }
            }
            Ok(Outcome::Abandoned) => debug!(%peer, "cliente cerró sin enviar datos"),
            Err(e) => warn!(%peer, error = %e, "error de I/O en la conexión"),
        }

        close_connection(&stream);
    }

    /// Atiende un request sobre cualquier par lector/escritor.
    ///
    /// Retorna `Err` solo si la conexión ya no permite escribir la respuesta.
    pub fn serve<R: Read, W: Write>(&self, reader: R, writer: &mut W) -> io::Result<Outcome> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let mut reader = BufReader::new(reader);

        let request = match Request::read_from(&mut reader) {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(Outcome::Abandoned),
            Err(ParseError::Io(e)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "request malformado");
                let response = self.finish(Response::error(StatusCode::BadRequest, &e.to_string()));
                response.write_to(writer)?;
                return Ok(Outcome::Responded(response.status()));
            }
        };

        info!(
            method = request.method().as_str(),
            path = request.path(),
            version = request.version(),
            "atendiendo"
        );
        if let Some(agent) = request.header("User-Agent") {
            debug!(user_agent = agent, "header");
        }
        if let Some(cookie) = request.header("Cookie") {
            debug!(cookie, "header");
        }

        let dispatched = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&request, &mut reader)));
        let response = match dispatched {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "error leyendo el body");
                Response::error(StatusCode::InternalServerError, "error interno del servidor")
            }
            Err(_) => {
                error!(path = request.path(), "panic atendiendo el request");
                Response::error(StatusCode::InternalServerError, "error interno del servidor")
            }
        };

        let response = self.finish(response);
        response.write_to(writer)?;
        Ok(Outcome::Responded(response.status()))
    }

    /// Rutas fijas primero, después dispatch por método
    fn dispatch<R: Read>(&self, request: &Request, reader: &mut BufReader<R>) -> io::Result<Response> {
        if let Some(response) = self.router.route(request, &self.context) {
            return Ok(response);
        }

        let path = request.path();
        let response = match request.method() {
            Method::GET => self.get_resource(path),
            Method::POST => {
                let body = request.read_body(reader, false)?;
                echo_response(&body)
            }
            Method::PUT => {
                let body = request.read_body(reader, true)?;
                self.put_resource(path, &body)
            }
            Method::DELETE => self.delete_resource(path),
            Method::Other(_) => Response::text(StatusCode::MethodNotAllowed, "Metodo no permitido"),
        };

        Ok(response)
    }

    fn get_resource(&self, path: &str) -> Response {
        let mut response = match self.store.read(path) {
            Ok(content) => Response::file(mime_for(path), content),
            Err(e) => store_error_response(e),
        };

        if self.demo_cookie && response.status().is_success() {
            response.add_header("Set-Cookie", DEMO_COOKIE);
        }
        response
    }

    fn put_resource(&self, path: &str, body: &[u8]) -> Response {
        match self.store.write(path, body) {
            Ok(()) => Response::html(StatusCode::Created, "<html><h1>Recurso creado con PUT</h1></html>"),
            Err(e) => store_error_response(e),
        }
    }

    fn delete_resource(&self, path: &str) -> Response {
        match self.store.delete(path) {
            Ok(()) => Response::html(StatusCode::Ok, "<html><h1>Recurso eliminado</h1></html>"),
            Err(e) => store_error_response(e),
        }
    }

    /// Headers comunes a todas las respuestas
    fn finish(&self, mut response: Response) -> Response {
        response.add_header("Server", env!("CARGO_PKG_NAME"));
        response.add_header("Connection", "close");
        response
    }
}

fn store_error_response(error: StoreError) -> Response {
    match error {
        StoreError::NotFound(_) => Response::error(StatusCode::NotFound, "recurso no encontrado"),
        StoreError::InvalidPath(name) => {
            warn!(path = %name, "ruta rechazada");
            Response::error(StatusCode::BadRequest, "ruta invalida")
        }
        StoreError::Io(e) => {
            warn!(error = %e, "error de I/O en el almacén");
            Response::error(StatusCode::InternalServerError, "error interno del servidor")
        }
    }
}

/// Eco HTML del body de un POST (no se persiste)
fn echo_response(body: &[u8]) -> Response {
    let text = String::from_utf8_lossy(body);
    let html = format!("<html><h1>POST recibido</h1><p>{}</p></html>", escape_html(&text));
    Response::html(StatusCode::Ok, &html)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn peer_label(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Cierra la conexión: FIN de escritura y drenado breve de lo que el cliente
/// todavía tenga en vuelo, para que el cierre no descarte la respuesta con un RST.
pub(crate) fn close_connection(stream: &TcpStream) {
    let _ = stream.shutdown(Shutdown::Write);
    let _ = stream.set_read_timeout(Some(LINGER_TIMEOUT));

    let mut reader = stream;
    let mut scratch = [0u8; 4096];
    let deadline = Instant::now() + LINGER_TIMEOUT;
    while Instant::now() < deadline {
        match reader.read(&mut scratch) {
            Ok(0) | Err(_) => break,
            Ok(_) => continue,
        }
    }

    let _ = stream.shutdown(Shutdown::Both);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Directorio raíz temporal, se borra al terminar el test
    struct TempRoot(PathBuf);

    impl TempRoot {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!(
                "file_server_handler_{}_{}",
                std::process::id(),
                COUNTER.fetch_add(1, Ordering::SeqCst)
            ));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempRoot {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn handler() -> (ConnectionHandler, TempRoot) {
        let root = TempRoot::new();
        let mut config = Config::default();
        config.root_dir = root.path().to_string_lossy().to_string();
        config.simulated_delay_ms = 0;
        (ConnectionHandler::from_config(&config, MetricsCollector::new()), root)
    }

    /// Envía bytes crudos y retorna (outcome, respuesta como texto)
    fn send(handler: &ConnectionHandler, raw: &[u8]) -> (Outcome, String) {
        let mut out = Vec::new();
        let outcome = handler.serve(raw, &mut out).unwrap();
        (outcome, String::from_utf8_lossy(&out).to_string())
    }

    fn body_of(response: &str) -> &str {
        response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
    }

    #[test]
    fn test_get_existing_resource() {
        let (handler, _root) = handler();
        handler.store().write("index.html", "<h1>¡Hola!</h1>".as_bytes()).unwrap();

        let (outcome, text) = send(&handler, b"GET / HTTP/1.1\r\n\r\n");

        assert_eq!(outcome, Outcome::Responded(StatusCode::Ok));
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains(&format!("Content-Length: {}\r\n", "<h1>¡Hola!</h1>".len())));
        assert!(text.contains("Connection: close\r\n"));
        assert_eq!(body_of(&text), "<h1>¡Hola!</h1>");
        assert!(!text.contains("Set-Cookie"));
    }

    #[test]
    fn test_get_missing_resource() {
        let (handler, _root) = handler();
        let (outcome, text) = send(&handler, b"GET /nada.html HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::NotFound));
        assert!(text.contains("Error 404"));
    }

    #[test]
    fn test_get_with_demo_cookie() {
        let (handler, _root) = handler();
        let handler = handler.with_demo_cookie(true);
        handler.store().write("a.txt", b"x").unwrap();

        let (_, text) = send(&handler, b"GET /a.txt HTTP/1.1\r\n\r\n");
        assert!(text.contains(&format!("Set-Cookie: {}\r\n", DEMO_COOKIE)));

        let (_, text) = send(&handler, b"GET /b.txt HTTP/1.1\r\n\r\n");
        assert!(!text.contains("Set-Cookie"));
    }

    #[test]
    fn test_put_then_get() {
        let (handler, _root) = handler();

        let (outcome, _) = send(
            &handler,
            b"PUT /nota.txt HTTP/1.1\r\nContent-Length: 5\r\n\r\nhola!sobra",
        );
        assert_eq!(outcome, Outcome::Responded(StatusCode::Created));
        assert_eq!(handler.store().read("nota.txt").unwrap(), b"hola!");

        let (_, text) = send(&handler, b"GET /nota.txt HTTP/1.1\r\n\r\n");
        assert!(text.contains("Content-Length: 5\r\n"));
        assert_eq!(body_of(&text), "hola!");
    }

    #[test]
    fn test_put_without_content_length_drains_buffer() {
        let (handler, _root) = handler();
        let (outcome, _) = send(&handler, b"PUT /libre.txt HTTP/1.1\r\n\r\ncontenido libre");

        assert_eq!(outcome, Outcome::Responded(StatusCode::Created));
        assert_eq!(handler.store().read("libre.txt").unwrap(), b"contenido libre");
    }

    #[test]
    fn test_put_short_body_is_500() {
        let (handler, _root) = handler();
        let (outcome, _) = send(&handler, b"PUT /corto.txt HTTP/1.1\r\nContent-Length: 50\r\n\r\nabc");

        assert_eq!(outcome, Outcome::Responded(StatusCode::InternalServerError));
        assert!(handler.store().read("corto.txt").is_err());
    }

    #[test]
    fn test_post_echo() {
        let (handler, _root) = handler();
        let (outcome, text) = send(
            &handler,
            b"POST /form HTTP/1.1\r\nContent-Length: 9\r\n\r\n<b>x</b>!",
        );

        assert_eq!(outcome, Outcome::Responded(StatusCode::Ok));
        assert_eq!(
            body_of(&text),
            "<html><h1>POST recibido</h1><p>&lt;b&gt;x&lt;/b&gt;!</p></html>"
        );
        assert!(handler.store().read("form").is_err());
    }

    #[test]
    fn test_delete_existing() {
        let (handler, _root) = handler();
        handler.store().write("borrar.txt", b"x").unwrap();

        let (outcome, _) = send(&handler, b"DELETE /borrar.txt HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::Ok));

        let (outcome, _) = send(&handler, b"GET /borrar.txt HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::NotFound));
    }

    #[test]
    fn test_delete_missing() {
        let (handler, _root) = handler();
        let (outcome, _) = send(&handler, b"DELETE /nada.txt HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::NotFound));
        assert_eq!(fs::read_dir(handler.store().root()).unwrap().count(), 0);
    }

    #[test]
    fn test_unsupported_method() {
        let (handler, _root) = handler();
        let (outcome, text) = send(&handler, b"PATCH /a.txt HTTP/1.1\r\nContent-Length: 1\r\n\r\nx");

        assert_eq!(outcome, Outcome::Responded(StatusCode::MethodNotAllowed));
        assert_eq!(body_of(&text), "Metodo no permitido");
        assert_eq!(fs::read_dir(handler.store().root()).unwrap().count(), 0);
    }

    #[test]
    fn test_fixed_routes_before_files() {
        let (handler, _root) = handler();
        handler.store().write("error400", b"no deberia servirse").unwrap();

        let (outcome, _) = send(&handler, b"GET /error400 HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::BadRequest));

        let (outcome, _) = send(&handler, b"PUT /error500 HTTP/1.1\r\nContent-Length: 1\r\n\r\nx");
        assert_eq!(outcome, Outcome::Responded(StatusCode::InternalServerError));
        assert!(handler.store().read("error500").is_err());

        let (outcome, text) = send(&handler, b"GET /info HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::Ok));
        assert!(text.contains("application/json"));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let (handler, _root) = handler();
        let (outcome, _) = send(&handler, b"GET /../../etc/passwd HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::BadRequest));
    }

    #[test]
    fn test_malformed_request() {
        let (handler, _root) = handler();
        let (outcome, text) = send(&handler, b"\x00\x01\x02garbage\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::BadRequest));
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_empty_connection_is_abandoned() {
        let (handler, _root) = handler();
        let (outcome, text) = send(&handler, b"");
        assert_eq!(outcome, Outcome::Abandoned);
        assert!(text.is_empty());
    }

    #[test]
    fn test_delay_is_applied() {
        let (handler, _root) = handler();
        let handler = handler.with_delay(Duration::from_millis(50));
        let start = Instant::now();
        send(&handler, b"GET /x HTTP/1.1\r\n\r\n");
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_oversized_header_is_400() {
        let (handler, _root) = handler();
        let mut raw = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(1024 * 1024));
        raw.extend_from_slice(b"\r\n\r\n");

        let (outcome, text) = send(&handler, &raw);
        assert_eq!(outcome, Outcome::Responded(StatusCode::BadRequest));
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    fn panicking_route(_req: &Request, _ctx: &RouteContext) -> Response {
        panic!("fallo dentro del handler")
    }

    #[test]
    fn test_panic_in_dispatch_is_500() {
        let root = TempRoot::new();
        let mut router = Router::new();
        router.register(None, "explota", panicking_route);
        let context = RouteContext {
            instance: InstanceInfo::from_config(&Config::default()),
            metrics: MetricsCollector::new(),
        };
        let handler = ConnectionHandler::new(ResourceStore::new(root.path().to_path_buf()), router, context);

        let (outcome, text) = send(&handler, b"GET /explota HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::InternalServerError));
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(text.contains("Connection: close\r\n"));

        // El handler sigue sirviendo después del panic
        let (outcome, _) = send(&handler, b"GET /nada.txt HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Responded(StatusCode::NotFound));
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_failure_is_500() {
        use std::os::unix::fs::PermissionsExt;

        let (handler, root) = handler();
        let locked = root.path().join("bloqueado");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("fijo.txt"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Como root los permisos no aplican: no hay forma de provocar el fallo
        let privileged = fs::write(locked.join("permiso.tmp"), b"").is_ok();
        let result = if privileged {
            None
        } else {
            Some(send(&handler, b"DELETE /bloqueado/fijo.txt HTTP/1.1\r\n\r\n"))
        };
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let Some((outcome, text)) = result else {
            return;
        };
        assert_eq!(outcome, Outcome::Responded(StatusCode::InternalServerError));
        assert!(text.contains("Error 500"));
        assert!(locked.join("fijo.txt").exists());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
