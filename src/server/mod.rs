//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! - `admission`: decide admitir o redirigir cada conexión
//! - `pool`: pool fijo de workers con reserva atómica de slots
//! - `handler`: ciclo de vida de una conexión admitida
//! - `tcp`: loop de aceptación

pub mod admission;
pub mod handler;
pub mod pool;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use admission::{Admission, AdmissionController};
pub use handler::{ConnectionHandler, Outcome};
pub use pool::{SlotReservation, WorkerPool};
pub use tcp::Server;
