//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor de archivos con soporte
//! para argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### Servidor principal + respaldo
//! ```bash
//! ./file_server --port 8000 --workers 4 --root ./www
//! ./file_server --port 8081 --workers 4 --root ./www
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8000 WORKERS=8 SIMULATED_DELAY_MS=0 ./file_server
//! ```

use crate::error::ConfigError;
use clap::Parser;
use std::time::Duration;
use tracing::info;

/// Configuración de una instancia del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "file_server")]
#[command(about = "Servidor HTTP de archivos con redirección al servidor de respaldo")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8000", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio raíz de los recursos servidos
    #[arg(long = "root", default_value = "./www", env = "ROOT_DIR")]
    pub root_dir: String,

    // === Workers ===

    /// Capacidad del pool de workers
    #[arg(short, long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    // === Respaldo ===

    /// Fuerza el rol de servidor de respaldo (nunca redirige)
    #[arg(long, env = "BACKUP")]
    pub backup: bool,

    /// Host del servidor de respaldo al que se redirige
    #[arg(long = "backup-host", default_value = "localhost", env = "BACKUP_HOST")]
    pub backup_host: String,

    /// Puerto del servidor de respaldo. La instancia que escucha en él es el respaldo.
    #[arg(long = "backup-port", default_value = "8081", env = "BACKUP_PORT")]
    pub backup_port: u16,

    // === Latencia y timeouts ===

    /// Retardo simulado antes de procesar cada conexión admitida (ms)
    #[arg(long = "delay-ms", default_value = "5000", env = "SIMULATED_DELAY_MS")]
    pub simulated_delay_ms: u64,

    /// Timeout de lectura/escritura por conexión en ms (0 = sin timeout)
    #[arg(long = "io-timeout-ms", default_value = "0", env = "IO_TIMEOUT_MS")]
    pub io_timeout_ms: u64,

    /// Agrega una cookie de demostración a las respuestas de archivos exitosas
    #[arg(long = "demo-cookie", env = "DEMO_COOKIE")]
    pub demo_cookie: bool,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use file_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8000");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Umbral de saturación: la mitad de la capacidad (división entera)
    ///
    /// # Ejemplo
    /// ```rust
    /// use file_server::config::Config;
    ///
    /// let mut config = Config::default();
    /// config.workers = 5;
    /// assert_eq!(config.threshold(), 2);
    /// ```
    pub fn threshold(&self) -> usize {
        self.workers / 2
    }

    /// Indica si esta instancia es el servidor de respaldo
    pub fn is_backup(&self) -> bool {
        self.backup || self.port == self.backup_port
    }

    /// URL a la que se redirigen las conexiones cuando el pool está saturado
    pub fn redirect_location(&self) -> String {
        format!("http://{}:{}/index.html", self.backup_host, self.backup_port)
    }

    /// Retardo simulado como `Duration`
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }

    /// Timeout de I/O por conexión, `None` si está deshabilitado
    pub fn io_timeout(&self) -> Option<Duration> {
        if self.io_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.io_timeout_ms))
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.root_dir.trim().is_empty() {
            return Err(ConfigError::EmptyRoot);
        }
        if self.backup_host.trim().is_empty() {
            return Err(ConfigError::EmptyBackupHost);
        }
        Ok(())
    }

    /// Registra un resumen de la configuración efectiva
    pub fn log_summary(&self) {
        let role = if self.is_backup() { "respaldo" } else { "principal" };
        info!(
            address = %self.address(),
            root = %self.root_dir,
            role,
            "configuración cargada"
        );
        info!(
            workers = self.workers,
            threshold = self.threshold(),
            redirect = %self.redirect_location(),
            "pool de workers"
        );
        info!(
            delay_ms = self.simulated_delay_ms,
            io_timeout_ms = self.io_timeout_ms,
            demo_cookie = self.demo_cookie,
            "latencia y timeouts"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto (igual a la del CLI)
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            root_dir: "./www".to_string(),
            workers: 4,
            backup: false,
            backup_host: "localhost".to_string(),
            backup_port: 8081,
            simulated_delay_ms: 5000,
            io_timeout_ms: 0,
            demo_cookie: false,
        }
    }
}
