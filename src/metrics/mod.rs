//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! - Contadores de requests por status
//! - Conexiones admitidas / redirigidas
//! - Latencias (p50, p95, p99)

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};
