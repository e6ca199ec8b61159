//! # Pool de Workers
//! src/server/pool.rs
//!
//! Pool de tamaño fijo de threads del sistema operativo. Los trabajos se
//! encolan en una cola FIFO (Mutex + Condvar) y cada worker los toma de a uno.
//!
//! La ocupación (`active`) es un `AtomicUsize` que se reserva con
//! [`WorkerPool::try_reserve`] antes de encolar y se libera al soltar la
//! [`SlotReservation`], que viaja con el trabajo hasta que termina.

use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Slot ocupado del pool. Soltarlo libera la ocupación.
#[derive(Debug)]
pub struct SlotReservation {
    active: Arc<AtomicUsize>,
}

impl Drop for SlotReservation {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

struct PoolQueue {
    jobs: VecDeque<(Job, SlotReservation)>,
    closed: bool,
}

struct Shared {
    queue: Mutex<PoolQueue>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolQueue> {
        // Los trabajos corren fuera del lock, la cola sigue consistente
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Pool de workers de capacidad fija
pub struct WorkerPool {
    shared: Arc<Shared>,
    active: Arc<AtomicUsize>,
    workers: Vec<JoinHandle<()>>,
    capacity: usize,
}

impl WorkerPool {
    /// Crea el pool e inicia `capacity` threads `worker-N`
    pub fn new(capacity: usize) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(PoolQueue {
                jobs: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn(move || worker_loop(shared))?;
            workers.push(handle);
        }

        Ok(Self {
            shared,
            active: Arc::new(AtomicUsize::new(0)),
            workers,
            capacity,
        })
    }

    /// Reserva un slot si `admit(active)` se cumple.
    ///
    /// Lectura, evaluación e incremento son una sola operación atómica
    /// (compare-and-swap). `Err` trae la ocupación observada.
    pub fn try_reserve<F>(&self, admit: F) -> Result<SlotReservation, usize>
    where
        F: Fn(usize) -> bool,
    {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                if admit(active) {
                    Some(active + 1)
                } else {
                    None
                }
            })
            .map(|_| SlotReservation {
                active: Arc::clone(&self.active),
            })
    }

    /// Encola un trabajo con su slot reservado. El slot se libera cuando el
    /// trabajo termina, aunque haga panic.
    pub fn execute<F>(&self, slot: SlotReservation, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.lock();
        if queue.closed {
            return;
        }
        queue.jobs.push_back((Box::new(job), slot));
        drop(queue);

        self.shared.available.notify_one();
    }

    /// Slots ocupados (en ejecución o esperando en la cola)
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Trabajos esperando un worker libre
    pub fn queued(&self) -> usize {
        self.shared.lock().jobs.len()
    }
}

impl Drop for WorkerPool {
    /// Cierra la cola, deja terminar lo encolado y espera a los workers
    fn drop(&mut self) {
        self.shared.lock().closed = true;
        self.shared.available.notify_all();

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    let name = thread::current().name().unwrap_or("worker").to_string();
    debug!(worker = %name, "worker iniciado");

    loop {
        let (job, slot) = {
            let mut queue = shared.lock();
            loop {
                if let Some(next) = queue.jobs.pop_front() {
                    break next;
                }
                if queue.closed {
                    debug!(worker = %name, "worker detenido");
                    return;
                }
                queue = shared
                    .available
                    .wait(queue)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(worker = %name, "el trabajo hizo panic");
        }
        drop(slot);
    }
}
