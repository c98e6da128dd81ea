// Authenticator contract and cancellation context

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use super::token::AccessToken;
use crate::error::{AuthError, Result};

/// Capability every authentication strategy implements
///
/// Strategies keep their retry and timeout policies to themselves. Callers
/// poll [`Authenticator::access_token`] cheaply and schedule attempts
/// independently.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Run one authentication attempt with no cancellation signal
    async fn authenticate(&self) -> Result<()> {
        self.authenticate_with_context(&AuthContext::background())
            .await
    }

    /// Run one authentication attempt bound to `ctx`
    ///
    /// Must return [`AuthError::Cancelled`] or
    /// [`AuthError::DeadlineExceeded`] promptly once `ctx` fires, and must
    /// not publish a token after that point.
    async fn authenticate_with_context(&self, ctx: &AuthContext) -> Result<()>;

    /// Store holding the most recently obtained token
    fn access_token(&self) -> Arc<dyn AccessToken>;
}

/// Cancellation and deadline signal for an authentication attempt
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Fires the [`AuthContext`] it was created with
///
/// Dropping the handle does not cancel.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl AuthContext {
    /// Context that never fires
    pub fn background() -> Self {
        Self::default()
    }

    /// Context fired by the returned handle
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx })
    }

    /// Context that expires after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: None,
            deadline: Some(deadline),
        }
    }

    /// Keep this context's cancel signal, expiring no later than `timeout` from now
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Error if the context has already fired
    pub fn check(&self) -> Result<()> {
        if let Some(rx) = &self.cancel {
            if *rx.borrow() {
                return Err(AuthError::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(AuthError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Resolves with the reason once the context fires
    pub async fn done(&self) -> AuthError {
        let cancelled = async {
            if let Some(rx) = &self.cancel {
                let mut rx = rx.clone();
                if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                    return;
                }
            }
            // No handle left, or none to begin with
            std::future::pending::<()>().await
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => AuthError::Cancelled,
            _ = expired => AuthError::DeadlineExceeded,
        }
    }

    /// Drive `fut` until it completes or the context fires
    ///
    /// The future is dropped on cancellation; a result that races with
    /// the signal loses.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
        T: Send,
    {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            result = fut => {
                self.check()?;
                result
            }
        }
    }

    /// Publish a freshly obtained token unless the context has fired
    pub fn commit_token(&self, store: &dyn AccessToken, data: &[u8]) -> Result<()> {
        self.check()?;
        store.write(data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryAccessToken;

    #[tokio::test]
    async fn test_background_never_fires() {
        let ctx = AuthContext::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.deadline().is_none());

        let value = ctx.run(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_cancel_fires_done() {
        let (ctx, handle) = AuthContext::with_cancel();
        assert!(ctx.check().is_ok());

        handle.cancel();
        assert!(matches!(ctx.check(), Err(AuthError::Cancelled)));
        assert!(matches!(ctx.done().await, AuthError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_future() {
        let (ctx, handle) = AuthContext::with_cancel();

        let task = tokio::spawn(async move {
            ctx.run(async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(AuthError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (ctx, handle) = AuthContext::with_cancel();
        drop(handle);

        assert!(ctx.check().is_ok());
        let ctx = ctx.child_with_timeout(Duration::from_millis(20));
        assert!(matches!(ctx.done().await, AuthError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_timeout_fires() {
        let ctx = AuthContext::with_timeout(Duration::from_millis(20));

        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AuthError::DeadlineExceeded)));
        assert!(matches!(ctx.check(), Err(AuthError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_already_fired_context_skips_future() {
        let (ctx, handle) = AuthContext::with_cancel();
        handle.cancel();

        let result: Result<()> = ctx
            .run(async { panic!("future must not be polled") })
            .await;
        assert!(matches!(result, Err(AuthError::Cancelled)));
    }

    #[tokio::test]
    async fn test_child_keeps_earlier_deadline() {
        let parent = AuthContext::with_timeout(Duration::from_secs(1));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let child = parent.child_with_timeout(Duration::from_millis(1));
        assert!(child.deadline() < parent.deadline());
    }

    #[tokio::test]
    async fn test_child_inherits_cancel() {
        let (parent, handle) = AuthContext::with_cancel();
        let child = parent.child_with_timeout(Duration::from_secs(60));

        handle.cancel();
        assert!(matches!(child.check(), Err(AuthError::Cancelled)));
    }

    #[test]
    fn test_commit_token_respects_cancellation() {
        let store = MemoryAccessToken::new();
        let (ctx, handle) = AuthContext::with_cancel();

        ctx.commit_token(&store, b"first").unwrap();
        assert_eq!(store.read().unwrap(), b"first".to_vec());

        handle.cancel();
        let err = ctx.commit_token(&store, b"second").unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
        assert_eq!(store.read().unwrap(), b"first".to_vec());
    }
}
