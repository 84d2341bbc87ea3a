//! Cooperative cancellation shared between the signal handler and the dispatcher

use crate::core::error::{RailError, RailResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once when the user asks to stop; never reset.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
  cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  /// Token that is cancelled on SIGINT, SIGTERM or SIGHUP.
  ///
  /// Can only be installed once per process. The process keeps running after the
  /// signal so the dispatcher can stop and reap the runner.
  pub fn install_signal_handler() -> RailResult<Self> {
    let token = Self::new();
    let flag = Arc::clone(&token.cancelled);
    ctrlc::set_handler(move || {
      flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| RailError::message(format!("Failed to install signal handler: {}", e)))?;
    Ok(token)
  }

  #[cfg(test)]
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }
}
