//! # Rutas de Respuesta Fija
//! src/router/mod.rs
//!
//! Tabla ordenada de rutas reservadas que se consulta antes de servir
//! archivos. Cada entrada es (filtro de método, nombre, handler); la
//! primera que coincide responde y el sistema de archivos no se toca.
//!
//! ```text
//! Request → Router ─┬─ coincide → Handler → Response
//!                   └─ no coincide → dispatch por método (GET/PUT/...)
//! ```
//!
//! Rutas por defecto:
//!
//! | Método | Nombre     | Respuesta                         |
//! |--------|------------|-----------------------------------|
//! | *      | `error400` | 400 fijo                          |
//! | *      | `error500` | 500 fijo                          |
//! | GET    | `info`     | JSON con la descripción del nodo  |
//! | GET    | `metrics`  | JSON con las métricas             |

use crate::config::Config;
use crate::http::{Method, Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use serde::Serialize;

/// Descripción fija de la instancia (expuesta en `info`)
#[derive(Debug, Clone, Serialize)]
pub struct InstanceInfo {
    pub server: &'static str,
    pub version: &'static str,
    pub role: &'static str,
    pub port: u16,
    pub capacity: usize,
    pub threshold: usize,
}

impl InstanceInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            server: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            role: if config.is_backup() { "backup" } else { "primary" },
            port: config.port,
            capacity: config.workers,
            threshold: config.threshold(),
        }
    }
}

/// Estado compartido que reciben los handlers
#[derive(Clone)]
pub struct RouteContext {
    pub instance: InstanceInfo,
    pub metrics: MetricsCollector,
}

/// Un handler recibe el request y el contexto y retorna una Response
pub type Handler = fn(&Request, &RouteContext) -> Response;

struct Route {
    /// `None` = cualquier método
    method: Option<Method>,
    path: String,
    handler: Handler,
}

impl Route {
    fn matches(&self, request: &Request) -> bool {
        self.path == request.path()
            && self
                .method
                .as_ref()
                .map_or(true, |method| method == request.method())
    }
}

/// Tabla ordenada de rutas fijas
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Crea un router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Router con las rutas reservadas por defecto
    pub fn with_fixed_routes() -> Self {
        let mut router = Self::new();
        router.register(None, "error400", bad_request_handler);
        router.register(None, "error500", server_error_handler);
        router.register(Some(Method::GET), "info", info_handler);
        router.register(Some(Method::GET), "metrics", metrics_handler);
        router
    }

    /// Registra una ruta al final de la tabla
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::router::{Router, RouteContext};
    /// use file_server::http::{Method, Request, Response};
    ///
    /// fn ping(_req: &Request, _ctx: &RouteContext) -> Response {
    ///     Response::json(r#"{"pong": true}"#)
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Some(Method::GET), "ping", ping);
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn register(&mut self, method: Option<Method>, path: &str, handler: Handler) {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handler,
        });
    }

    /// Busca la primera ruta que coincide y la ejecuta.
    ///
    /// `None` si ninguna coincide: el request sigue al dispatch por método.
    pub fn route(&self, request: &Request, context: &RouteContext) -> Option<Response> {
        self.routes
            .iter()
            .find(|route| route.matches(request))
            .map(|route| (route.handler)(request, context))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::with_fixed_routes()
    }
}

// === Handlers de las rutas reservadas ===

fn bad_request_handler(_req: &Request, _ctx: &RouteContext) -> Response {
    Response::error(StatusCode::BadRequest, "peticion incorrecta")
}

fn server_error_handler(_req: &Request, _ctx: &RouteContext) -> Response {
    Response::error(StatusCode::InternalServerError, "error interno del servidor")
}

fn info_handler(_req: &Request, ctx: &RouteContext) -> Response {
    match serde_json::to_string(&ctx.instance) {
        Ok(body) => Response::json(&body),
        Err(e) => Response::error(StatusCode::InternalServerError, &e.to_string()),
    }
}

fn metrics_handler(_req: &Request, ctx: &RouteContext) -> Response {
    match serde_json::to_string(&ctx.metrics.snapshot()) {
        Ok(body) => Response::json(&body),
        Err(e) => Response::error(StatusCode::InternalServerError, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RouteContext {
        RouteContext {
            instance: InstanceInfo::from_config(&Config::default()),
            metrics: MetricsCollector::new(),
        }
    }

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap()
    }

    fn ping_handler(_req: &Request, _ctx: &RouteContext) -> Response {
        Response::json(r#"{"ping": 1}"#)
    }

    fn pong_handler(_req: &Request, _ctx: &RouteContext) -> Response {
        Response::json(r#"{"ping": 2}"#)
    }

    #[test]
    fn test_router_creation() {
        assert!(Router::new().is_empty());
        assert_eq!(Router::with_fixed_routes().len(), 4);
    }

    #[test]
    fn test_no_match_falls_through() {
        let router = Router::with_fixed_routes();
        assert!(router.route(&request("GET /index.html HTTP/1.1\r\n\r\n"), &context()).is_none());
    }

    #[test]
    fn test_error_routes_any_method() {
        let router = Router::with_fixed_routes();
        let ctx = context();

        for method in ["GET", "POST", "PUT", "DELETE", "PATCH"] {
            let raw = format!("{} /error400 HTTP/1.1\r\n\r\n", method);
            let response = router.route(&request(&raw), &ctx).unwrap();
            assert_eq!(response.status(), StatusCode::BadRequest);

            let raw = format!("{} /error500 HTTP/1.1\r\n\r\n", method);
            let response = router.route(&request(&raw), &ctx).unwrap();
            assert_eq!(response.status(), StatusCode::InternalServerError);
        }
    }

    #[test]
    fn test_info_route() {
        let router = Router::with_fixed_routes();
        let response = router.route(&request("GET /info HTTP/1.1\r\n\r\n"), &context()).unwrap();

        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let json: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(json["role"], "primary");
        assert_eq!(json["capacity"], 4);
        assert_eq!(json["threshold"], 2);
    }

    #[test]
    fn test_info_requires_get() {
        let router = Router::with_fixed_routes();
        assert!(router.route(&request("DELETE /info HTTP/1.1\r\n\r\n"), &context()).is_none());
    }

    #[test]
    fn test_metrics_route() {
        let router = Router::with_fixed_routes();
        let ctx = context();
        ctx.metrics.record_redirected();

        let response = router.route(&request("GET /metrics HTTP/1.1\r\n\r\n"), &ctx).unwrap();
        let json: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(json["redirected"], 1);
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = Router::new();
        router.register(None, "ping", ping_handler);
        router.register(None, "ping", pong_handler);

        let response = router.route(&request("GET /ping HTTP/1.1\r\n\r\n"), &context()).unwrap();
        assert_eq!(response.body(), br#"{"ping": 1}"#);
    }
}
