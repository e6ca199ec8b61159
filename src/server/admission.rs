//! # Control de Admisión
//! src/server/admission.rs
//!
//! Decide, por cada conexión aceptada y antes de parsear nada, si se
//! atiende localmente o se redirige al servidor de respaldo.
//!
//! Regla: se redirige si `activos >= capacidad / 2` (división entera) y la
//! instancia no es el respaldo. El respaldo nunca redirige: si se satura,
//! las conexiones esperan en la cola del pool.

use super::pool::{SlotReservation, WorkerPool};
use crate::config::Config;

/// Resultado de evaluar una conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Se entrega a un worker
    Admit,
    /// Se responde 302 hacia el respaldo
    Redirect,
}

/// Predicado de admisión sin estado propio
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    capacity: usize,
    is_backup: bool,
}

impl AdmissionController {
    pub fn new(capacity: usize, is_backup: bool) -> Self {
        Self {
            capacity,
            is_backup,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.workers, config.is_backup())
    }

    /// Umbral de saturación
    pub fn threshold(&self) -> usize {
        self.capacity / 2
    }

    pub fn is_backup(&self) -> bool {
        self.is_backup
    }

    /// Evalúa el predicado para una ocupación dada
    ///
    /// # Ejemplo
    /// ```
    /// use file_server::server::{Admission, AdmissionController};
    ///
    /// let primary = AdmissionController::new(4, false);
    /// assert_eq!(primary.decide(1), Admission::Admit);
    /// assert_eq!(primary.decide(2), Admission::Redirect);
    ///
    /// let backup = AdmissionController::new(4, true);
    /// assert_eq!(backup.decide(100), Admission::Admit);
    /// ```
    pub fn decide(&self, active: usize) -> Admission {
        if !self.is_backup && active >= self.threshold() {
            Admission::Redirect
        } else {
            Admission::Admit
        }
    }

    /// Evalúa y reserva un slot en una sola operación atómica.
    ///
    /// `Err(active)` trae la ocupación observada cuando toca redirigir.
    pub fn admit(&self, pool: &WorkerPool) -> Result<SlotReservation, usize> {
        pool.try_reserve(|active| self.decide(active) == Admission::Admit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_half_capacity() {
        assert_eq!(AdmissionController::new(4, false).threshold(), 2);
        assert_eq!(AdmissionController::new(5, false).threshold(), 2);
        assert_eq!(AdmissionController::new(1, false).threshold(), 0);
    }

    #[test]
    fn test_primary_admits_below_threshold() {
        for capacity in 1..=16 {
            let controller = AdmissionController::new(capacity, false);
            for active in 0..controller.threshold() {
                assert_eq!(controller.decide(active), Admission::Admit);
            }
        }
    }

    #[test]
    fn test_primary_redirects_at_or_above_threshold() {
        for capacity in 1..=16 {
            let controller = AdmissionController::new(capacity, false);
            for active in controller.threshold()..=capacity * 2 {
                assert_eq!(controller.decide(active), Admission::Redirect);
            }
        }
    }

    #[test]
    fn test_backup_never_redirects() {
        let controller = AdmissionController::new(4, true);
        for active in 0..1000 {
            assert_eq!(controller.decide(active), Admission::Admit);
        }
    }

    #[test]
    fn test_from_config_backup_port() {
        let mut config = Config::default();
        assert!(!AdmissionController::from_config(&config).is_backup());
        config.port = config.backup_port;
        assert!(AdmissionController::from_config(&config).is_backup());
    }

    #[test]
    fn test_admit_reserves_slots_until_threshold() {
        let pool = WorkerPool::new(4).unwrap();
        let controller = AdmissionController::new(4, false);

        let first = controller.admit(&pool).unwrap();
        let second = controller.admit(&pool).unwrap();
        assert_eq!(pool.active(), 2);

        // Tercera conexión con active=2: redirigir
        assert_eq!(controller.admit(&pool).unwrap_err(), 2);
        assert_eq!(pool.active(), 2);

        drop(first);
        assert_eq!(pool.active(), 1);
        let _third = controller.admit(&pool).unwrap();
        drop(second);
    }

    #[test]
    fn test_backup_admit_exceeds_capacity() {
        let pool = WorkerPool::new(2).unwrap();
        let controller = AdmissionController::new(2, true);

        let slots: Vec<_> = (0..5).map(|_| controller.admit(&pool).unwrap()).collect();
        assert_eq!(pool.active(), 5);
        drop(slots);
        assert_eq!(pool.active(), 0);
    }
}
