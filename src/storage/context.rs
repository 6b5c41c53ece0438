//! Request-scoped context handed to every storage operation.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{LinkVaultError, Result};

/// Carries cancellation, an optional deadline and the resolved user id.
///
/// Cloning is cheap; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    user_id: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            user_id: None,
        }
    }

    /// A timeout too large to represent leaves the context without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// A context cancelled together with its parent but with its own token.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            user_id: self.user_id.clone(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Checked by backends before an operation starts.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(LinkVaultError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(LinkVaultError::DeadlineExceeded);
        }
        Ok(())
    }
}
