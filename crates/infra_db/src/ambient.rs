//! Ambient connection binding
//!
//! Binds one [`ConnectionHandle`] to the extent of a future, so that every
//! repository call made while that future runs can find the handle without
//! it being passed down explicitly. The binding lives in a tokio task-local:
//! it is visible to everything polled inside the bound future (including
//! sub-futures driven by `join!` or `select!`) and to nothing else. Two
//! bound futures polled side by side in the same task each see their own
//! handle.
//!
//! `tokio::spawn` starts a fresh task without the binding. Wrap the spawned
//! future in [`propagate`] to carry it across.

use std::future::Future;

use crate::connection::ConnectionHandle;

tokio::task_local! {
    static AMBIENT_HANDLE: ConnectionHandle;
}

/// Returns the handle bound to the current extent, if any
pub fn lookup() -> Option<ConnectionHandle> {
    AMBIENT_HANDLE.try_with(ConnectionHandle::clone).ok()
}

pub fn is_bound() -> bool {
    AMBIENT_HANDLE.try_with(|_| ()).is_ok()
}

/// Runs `task` with `handle` bound for its whole extent
///
/// The binding is removed when `task` completes, fails, or is dropped.
pub async fn run_bound<F>(handle: ConnectionHandle, task: F) -> F::Output
where
    F: Future,
{
    AMBIENT_HANDLE.scope(handle, task).await
}

/// Carries the current binding (if any) into `task`
///
/// Intended for futures handed to `tokio::spawn` from inside a unit of
/// work. The spawned task must finish before the unit of work does;
/// afterwards its statements fail with `HandleReleased`.
pub fn propagate<F>(task: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let bound = lookup();
    async move {
        match bound {
            Some(handle) => run_bound(handle, task).await,
            None => task.await,
        }
    }
}
