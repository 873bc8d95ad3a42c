//! Cache-write strategies.

use std::future::Future;

use tessera_core::Offload;
use tracing::debug;

use crate::error::CacheWriteError;
use crate::offload::OffloadManager;

/// How the fallback connector carries out cache writes.
///
/// Chosen when the connector is built and fixed afterwards.
///
/// # Cancellation
///
/// An inline write is part of the operation's future and is cancelled with it.
/// A background write is owned by the offload implementation and keeps
/// running after the operation that triggered it returns or is dropped.
#[derive(Debug, Clone)]
pub enum CacheWrites<D = OffloadManager> {
    /// Await every write before the operation returns.
    Inline,
    /// Hand every write to an offload implementation and return at once.
    Background(D),
}

impl Default for CacheWrites<OffloadManager> {
    fn default() -> Self {
        Self::Background(OffloadManager::default())
    }
}

impl<D> CacheWrites<D>
where
    D: Offload,
{
    /// Returns `true` for [`CacheWrites::Inline`].
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline)
    }

    /// Carries out `work` according to the strategy.
    ///
    /// Inline writes return their own outcome. Background writes return `Ok`
    /// as soon as the work is handed over; their outcome is logged.
    pub async fn dispatch<W>(&self, kind: &'static str, work: W) -> Result<(), CacheWriteError>
    where
        W: Future<Output = Result<(), CacheWriteError>> + Send + 'static,
    {
        match self {
            Self::Inline => work.await,
            Self::Background(offload) => {
                offload.spawn(kind, async move {
                    if let Err(error) = work.await {
                        debug!(kind, ?error, "Background cache write failed");
                    }
                });
                Ok(())
            }
        }
    }

    /// Waits for background writes dispatched so far. No-op for inline writes.
    pub async fn drain(&self) {
        if let Self::Background(offload) = self {
            offload.drain().await;
        }
    }
}
