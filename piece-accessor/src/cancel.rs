use std::sync::{Arc, Mutex};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

/// Cancellation signal shared by every clone of the token.
///
/// Nothing is ever sent on the channel; cancelling drops the only sender, which
/// disconnects the receiver and wakes every `select!` waiting on [`CancelToken::done`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        CancelToken {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    /// Cancels the token and all its clones. Cancelling twice is harmless.
    pub fn cancel(&self) {
        let sender = match self.inner.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.receiver.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Becomes ready (with a disconnect error) once the token is cancelled.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.receiver
    }
}
