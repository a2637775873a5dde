//! Cooperative cancellation.
//!
//! The hosting process records interrupt and stop requests in a
//! [`CancelToken`]; the listing polls it at checkpoints inside its long
//! loops. A checkpoint that finds a request first puts the terminal back to
//! its default style and flushes, then either fails with
//! [`ListError::Interrupted`] or runs the suspend hook and carries on.

use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::ListError;

const NONE: u8 = 0;
const INTERRUPT: u8 = 1;
const STOP: u8 = 2;

/// A pending request from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelRequest {
    /// Terminate the listing.
    Interrupt,
    /// Pause, then resume where the listing left off.
    Stop,
}

static NEVER: AtomicU8 = AtomicU8::new(NONE);

/// Shared flag polled at checkpoints.
///
/// The flag is a `'static` atomic so that a signal handler can set it
/// without touching anything else.
#[derive(Debug, Clone, Copy)]
pub struct CancelToken {
    state: &'static AtomicU8,
    suspend: Option<fn()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::inert()
    }
}

impl CancelToken {
    pub fn new(state: &'static AtomicU8) -> Self {
        Self { state, suspend: None }
    }

    /// A token nobody can trigger.
    pub fn inert() -> Self {
        Self::new(&NEVER)
    }

    /// Hook run when a stop request is honored, after output is restored.
    pub fn with_suspend(mut self, hook: fn()) -> Self {
        self.suspend = Some(hook);
        self
    }

    /// Records a request. Safe to call from a signal handler.
    pub fn request(&self, request: CancelRequest) {
        // an interrupt is never downgraded to a stop
        let value = match request {
            CancelRequest::Interrupt => INTERRUPT,
            CancelRequest::Stop => STOP,
        };
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                (cur != INTERRUPT).then_some(value)
            });
    }

    pub fn pending(&self) -> Option<CancelRequest> {
        decode(self.state.load(Ordering::SeqCst))
    }

    fn take(&self) -> Option<CancelRequest> {
        decode(self.state.swap(NONE, Ordering::SeqCst))
    }

    /// Honors a pending request, if any.
    ///
    /// # Arguments
    /// * `out` - Listing output; receives `restore` and is flushed first
    /// * `restore` - Bytes that return the terminal to its default style
    ///
    /// # Returns
    /// * `Err(ListError::Interrupted)` for an interrupt, `Ok(())` otherwise
    pub fn checkpoint<W: Write + ?Sized>(
        &self,
        out: &mut W,
        restore: &[u8],
    ) -> Result<(), ListError> {
        let Some(request) = self.take() else {
            return Ok(());
        };
        log::debug!("honoring {request:?} at checkpoint");
        if !restore.is_empty() {
            out.write_all(restore)?;
        }
        out.flush()?;
        match request {
            CancelRequest::Interrupt => Err(ListError::Interrupted),
            CancelRequest::Stop => {
                if let Some(hook) = self.suspend {
                    hook();
                }
                Ok(())
            }
        }
    }
}

fn decode(value: u8) -> Option<CancelRequest> {
    match value {
        INTERRUPT => Some(CancelRequest::Interrupt),
        STOP => Some(CancelRequest::Stop),
        _ => None,
    }
}
