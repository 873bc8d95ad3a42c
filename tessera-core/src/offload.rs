//! Background execution seam.

use std::future::Future;

use smol_str::SmolStr;

/// Runs futures in the background, detached from the caller.
///
/// Connectors that decorate other connectors use it for work the caller
/// should not wait for, such as refreshing or invalidating a cache.
///
/// Implementations are cheap handles: clones must share the same state (put
/// it behind an `Arc`), so that [`drain`](Offload::drain) on any clone waits
/// for work spawned through all of them.
///
/// A spawned future belongs to the implementation. It is not cancelled when
/// the code that spawned it returns or is dropped.
///
/// ```ignore
/// use tessera_core::Offload;
///
/// fn invalidate<O: Offload>(offload: &O, key: String) {
///     offload.spawn("cache_remove", async move {
///         drop(key);
///     });
/// }
/// ```
pub trait Offload: Send + Sync + Clone {
    /// Starts `future` in the background.
    ///
    /// `kind` groups tasks in logs and metrics, e.g. `"cache_upsert"`.
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Resolves once every task spawned so far has finished.
    ///
    /// Used on shutdown and by tests that observe background effects. The
    /// default resolves immediately.
    fn drain(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
