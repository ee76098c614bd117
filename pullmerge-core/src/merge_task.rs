// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Runtime-agnostic task spawning with cancellation on drop.
//!
//! A merge runs one coordinator task plus one pump task per source. Each of
//! them is owned through a [`MergeTask`]: dropping the handle cancels the task,
//! and the spawned future is dropped at its next wake-up, releasing everything
//! it owns (source streams, demand handles, output senders).

use crate::cancellation_token::{CancellationToken, DropGuard};
use core::future::Future;
use futures::future::select;
use futures::pin_mut;

/// Handle to a spawned background task, cancelled on drop.
///
/// # Runtime Support
///
/// - **Tokio**: `tokio::spawn` (default, `runtime-tokio`)
/// - **smol**: `smol::spawn` (`runtime-smol` without `runtime-tokio`)
///
/// # Example
///
/// ```rust
/// use pullmerge_core::MergeTask;
///
/// # #[tokio::main]
/// # async fn main() {
/// let task = MergeTask::spawn(async {
///     futures::future::pending::<()>().await;
/// });
///
/// assert!(!task.is_cancelled());
/// drop(task); // the pending future is dropped at its next wake-up
/// # }
/// ```
#[derive(Debug)]
pub struct MergeTask {
    token: CancellationToken,
    _guard: DropGuard,
}

impl MergeTask {
    /// Spawn `future` on the configured runtime, racing it against cancellation.
    pub fn spawn<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let guarded = async move {
            let cancelled = task_token.cancelled();
            pin_mut!(cancelled);
            pin_mut!(future);
            // The losing side is dropped together with this block
            let _ = select(future, cancelled).await;
        };

        #[cfg(feature = "runtime-tokio")]
        tokio::spawn(guarded);

        #[cfg(all(feature = "runtime-smol", not(feature = "runtime-tokio")))]
        smol::spawn(guarded).detach();

        Self {
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    /// Signal the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the task was cancelled through this handle or by drop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
