//! # Servidor TCP con Control de Admisión
//! src/server/tcp.rs
//!
//! Loop de aceptación: por cada conexión, el [`AdmissionController`]
//! reserva un slot del [`WorkerPool`] o la conexión se redirige.
//!
//! ```text
//! LISTENING → accept → ADMIT    → pool.execute(handler) ─┐
//!                    → REDIRECT → 302 + cierre (síncrono) ┴→ LISTENING
//! ```
//!
//! El loop nunca espera a los workers. La redirección se escribe en el
//! propio thread del loop: es una respuesta corta, la pausa es acotada.

use super::admission::AdmissionController;
use super::handler::{close_connection, peer_label, ConnectionHandler};
use super::pool::WorkerPool;
use crate::config::Config;
use crate::error::ServerError;
use crate::http::Response;
use crate::metrics::MetricsCollector;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Timeout de escritura de la respuesta de redirección
const REDIRECT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Instancia del servidor de archivos
pub struct Server {
    config: Config,
    controller: AdmissionController,
    pool: WorkerPool,
    handler: Arc<ConnectionHandler>,
    metrics: MetricsCollector,
    redirect_location: String,
}

impl Server {
    /// Valida la configuración e inicia el pool de workers
    pub fn new(config: Config) -> Result<Self, ServerError> {
        config.validate()?;

        let metrics = MetricsCollector::new();
        let handler = ConnectionHandler::from_config(&config, metrics.clone());
        let pool = WorkerPool::new(config.workers)?;

        Ok(Self {
            controller: AdmissionController::from_config(&config),
            redirect_location: config.redirect_location(),
            handler: Arc::new(handler),
            pool,
            metrics,
            config,
        })
    }

    /// Abre el puerto configurado. Un fallo aquí es fatal.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.address();
        TcpListener::bind(&address).map_err(|source| ServerError::Bind { address, source })
    }

    /// Abre el puerto y atiende conexiones indefinidamente
    pub fn run(&self) -> Result<(), ServerError> {
        let listener = self.bind()?;
        info!(
            address = %self.config.address(),
            url = %format!("http://localhost:{}/index.html", self.config.port),
            "servidor escuchando"
        );
        self.serve(listener)
    }

    /// Loop de aceptación sobre un listener ya abierto
    pub fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.accept(stream),
                Err(e) => error!(error = %e, "error al aceptar conexión"),
            }
        }
        Ok(())
    }

    /// Decide admitir o redirigir una conexión recién aceptada
    fn accept(&self, stream: TcpStream) {
        let peer = peer_label(&stream);

        match self.controller.admit(&self.pool) {
            Ok(slot) => {
                self.metrics.record_admitted();
                info!(
                    %peer,
                    active = self.pool.active(),
                    queued = self.pool.queued(),
                    "conexión admitida"
                );

                let handler = Arc::clone(&self.handler);
                self.pool.execute(slot, move || handler.handle_connection(stream));
            }
            Err(active) => {
                self.metrics.record_redirected();
                info!(
                    %peer,
                    active,
                    threshold = self.controller.threshold(),
                    location = %self.redirect_location,
                    "servidor lleno, redirigiendo"
                );

                if let Err(e) = write_redirect(&stream, &self.redirect_location) {
                    warn!(%peer, error = %e, "no se pudo enviar la redirección");
                }
                close_connection(&stream);
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

/// Escribe el 302 hacia el servidor de respaldo
fn write_redirect(stream: &TcpStream, location: &str) -> io::Result<()> {
    stream.set_write_timeout(Some(REDIRECT_WRITE_TIMEOUT))?;

    let mut response = Response::redirect(location);
    response.add_header("Server", env!("CARGO_PKG_NAME"));

    let mut writer = stream;
    response.write_to(&mut writer)
}
