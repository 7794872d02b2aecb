use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use log::trace;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Bounds how many fetch or unseal operations run at once.
#[derive(Debug, Clone)]
pub enum Throttle {
    /// Every acquire succeeds immediately.
    Noop,
    Fixed(Slots),
}

/// A pool of `capacity` slots, each travelling through the channel while free.
#[derive(Debug, Clone)]
pub struct Slots {
    capacity: usize,
    free: Receiver<()>,
    release: Sender<()>,
}

impl Throttle {
    /// A zero concurrency limit disables throttling.
    pub fn from_concurrency(limit: usize) -> Self {
        match limit {
            0 => Throttle::Noop,
            n => Throttle::fixed(n),
        }
    }

    /// # Panics
    ///
    /// Panics when `capacity` is zero; use [`Throttle::Noop`] for no limit.
    pub fn fixed(capacity: usize) -> Self {
        assert!(capacity > 0, "a fixed throttle needs at least one slot");

        let (release, free) = channel::bounded(capacity);
        for _ in 0..capacity {
            // The channel is sized to hold every slot.
            let _ = release.try_send(());
        }
        Throttle::Fixed(Slots {
            capacity,
            free,
            release,
        })
    }

    /// `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Throttle::Noop => None,
            Throttle::Fixed(slots) => Some(slots.capacity),
        }
    }

    /// Waits for a free slot. Fails with [`Error::Cancelled`] if `cancel` fires first,
    /// in which case no permit is held. [`Throttle::Noop`] never waits, so it never
    /// looks at `cancel`.
    pub fn acquire(&self, cancel: &CancelToken) -> Result<Permit> {
        let slots = match self {
            Throttle::Noop => return Ok(Permit { release: None }),
            Throttle::Fixed(slots) => slots,
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        select! {
            recv(slots.free) -> slot => {
                slot.map_err(|_| Error::Cancelled)?;
                let permit = Permit {
                    release: Some(slots.release.clone()),
                };
                // Both arms may be ready at once; cancellation wins.
                if cancel.is_cancelled() {
                    drop(permit);
                    return Err(Error::Cancelled);
                }
                trace!("throttle: slot acquired");
                Ok(permit)
            },
            recv(cancel.done()) -> _ => Err(Error::Cancelled),
        }
    }
}

/// A held throttle slot, returned when dropped.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct Permit {
    release: Option<Sender<()>>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            // The slot came out of this channel, so there is always room for it.
            let _ = release.try_send(());
            trace!("throttle: slot released");
        }
    }
}
