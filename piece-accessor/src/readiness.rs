use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::{debug, error};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum ReadyState {
    Pending,
    Ready,
    Failed(Arc<Error>),
}

/// One-shot gate: blocks callers until initialisation either succeeds or fails for good.
#[derive(Debug)]
pub struct ReadyBarrier {
    state: Mutex<ReadyState>,
    fired: Condvar,
}

impl Default for ReadyBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadyBarrier {
    pub fn new() -> Self {
        ReadyBarrier {
            state: Mutex::new(ReadyState::Pending),
            fired: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReadyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the outcome of initialisation and wakes every waiter.
    ///
    /// # Panics
    ///
    /// Firing an already fired barrier is a programming error and panics.
    pub fn fire_ready(&self, outcome: Result<()>) {
        let mut state = self.lock();
        if !matches!(*state, ReadyState::Pending) {
            drop(state);
            panic!("readiness barrier fired twice");
        }

        *state = match outcome {
            Ok(()) => {
                debug!("readiness barrier: ready");
                ReadyState::Ready
            }
            Err(err) => {
                error!("readiness barrier: initialisation failed: {}", err);
                ReadyState::Failed(Arc::new(err))
            }
        };
        drop(state);
        self.fired.notify_all();
    }

    /// Blocks until the barrier fires, then returns the stored outcome.
    pub fn await_ready(&self) -> Result<()> {
        let mut state = self.lock();
        while let ReadyState::Pending = *state {
            state = self
                .fired
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        match &*state {
            ReadyState::Failed(err) => Err(Error::Barrier(Arc::clone(err))),
            _ => Ok(()),
        }
    }

    pub fn is_fired(&self) -> bool {
        !matches!(*self.lock(), ReadyState::Pending)
    }
}
