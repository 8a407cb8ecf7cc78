//! Per-screen view-state coordinators.
//!
//! A coordinator follows one or more gateway live sequences, republishes the
//! latest value through a [`watch`] channel, and forwards user intents to the
//! gateway as independent tasks. Dropping a coordinator cancels its
//! subscriptions; intents already launched keep running.

mod add_document;
mod contractors;
mod documents;
mod edit_document;

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::LiveSequence;

pub use add_document::AddDocumentCoordinator;
pub use contractors::ContractorsCoordinator;
pub use documents::DocumentsCoordinator;
pub use edit_document::EditDocumentCoordinator;

/// Observable value holder shared between a coordinator and its subscription tasks.
pub type Holder<T> = Arc<watch::Sender<T>>;

pub(crate) fn holder<T>(initial: T) -> Holder<T> {
    let (sender, _) = watch::channel(initial);
    Arc::new(sender)
}

/// Set of subscription tasks owned by one coordinator.
pub struct CoordinatorScope {
    name: &'static str,
    subscriptions: Vec<JoinHandle<()>>,
}

impl CoordinatorScope {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            subscriptions: Vec::new(),
        }
    }

    /// Follow the sequence produced by `open`, publishing each value into
    /// `holder` after passing it through `present`.
    ///
    /// A sequence error is logged and leaves the holder at its last value.
    pub fn follow<T, V, Open, Present>(
        &mut self,
        open: Open,
        holder: Holder<V>,
        mut present: Present,
    ) where
        T: Send + 'static,
        V: Send + Sync + 'static,
        Open: Future<Output = LiveSequence<T>> + Send + 'static,
        Present: FnMut(T) -> V + Send + 'static,
    {
        let scope = self.name;
        let handle = tokio::spawn(async move {
            let mut sequence = open.await;
            while let Some(next) = sequence.next().await {
                match next {
                    Ok(value) => {
                        holder.send_replace(present(value));
                    }
                    Err(err) => {
                        warn!(scope, error = %err, "live sequence terminated");
                        break;
                    }
                }
            }
        });
        self.subscriptions.push(handle);
    }

    /// Run an intent to completion independently of the scope.
    pub fn launch<F>(&self, intent: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(intent)
    }

    pub fn cancel(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        for handle in self.subscriptions.drain(..) {
            handle.abort();
        }
        debug!(scope = self.name, "coordinator subscriptions cancelled");
    }
}

impl Drop for CoordinatorScope {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Case-insensitive substring match; an empty needle matches everything.
pub(crate) fn matches_text(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
