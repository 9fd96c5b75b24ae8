//! Deferred finalisation of compositions.
//!
//! A composition pass is a synchronous, pure evaluation of the whole tree.
//! Components that read a [`Deferred`] value which has not been resolved yet
//! return [`Suspended`]; the pass records a pending handle for it, skips the
//! component's subtree and finishes the rest of the tree. The [`Scheduler`]
//! then waits for every pending handle and reruns the entire pass from
//! scratch. Once a pass completes with nothing pending, every deferred
//! assertion registered during that pass is checked exactly once, and all
//! failures are reported together.
//!
//! Everything here runs on a single task; there is no parallelism and no
//! cancellation. Callers needing a deadline wrap [`Scheduler::settle`] in
//! their own timeout.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::compose::{ComposeOptions, Composer};
use crate::node::Node;
use crate::relation::RelationTable;
use crate::{WeaveError, WeaveResult};

/// Signal returned by a component whose inputs are not ready.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Suspended;

impl fmt::Display for Suspended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("waiting on a deferred value")
    }
}

/// Read side of a value supplied after an external computation completes.
///
/// Handles are cheap to clone and persist across passes; the value, once
/// resolved, is visible to every later pass.
#[derive(Clone, Debug)]
pub struct Deferred<T> {
    label: Arc<str>,
    rx: watch::Receiver<Option<T>>,
}

/// Write side of a [`Deferred`] value.
#[derive(Debug)]
pub struct Resolver<T> {
    tx: watch::Sender<Option<T>>,
}

/// Create a connected resolver/handle pair.
///
/// ```
/// use docweave::schedule::deferred;
///
/// let (resolver, handle) = deferred::<String>("image-tag");
/// assert_eq!(handle.get(), None);
/// resolver.resolve("1.14".into());
/// assert_eq!(handle.get().as_deref(), Some("1.14"));
/// ```
#[must_use]
pub fn deferred<T>(label: impl Into<Arc<str>>) -> (Resolver<T>, Deferred<T>) {
    let (tx, rx) = watch::channel(None);
    (
        Resolver { tx },
        Deferred {
            label: label.into(),
            rx,
        },
    )
}

impl<T: Clone + 'static> Deferred<T> {
    /// Current value, if resolved.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Label used in logs and errors.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    fn waiter(&self) -> Pending {
        let mut rx = self.rx.clone();
        Pending {
            label: Arc::clone(&self.label),
            ready: Box::pin(async move { rx.wait_for(Option::is_some).await.is_ok() }),
        }
    }
}

impl<T> Resolver<T> {
    /// Supply the value, waking any scheduler waiting on it.
    pub fn resolve(&self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

/// Handle the scheduler awaits before retrying a pass.
struct Pending {
    label: Arc<str>,
    ready: Pin<Box<dyn Future<Output = bool>>>,
}

impl Pending {
    async fn wait(self) -> WeaveResult<()> {
        if self.ready.await {
            Ok(())
        } else {
            Err(Arc::new(WeaveError::ResolverDropped {
                label: self.label.to_string(),
            }))
        }
    }
}

struct DeferredAssertion {
    owner: String,
    message: String,
    check: Box<dyn Fn() -> bool>,
}

/// State accumulated by one pass: pending handles and assertions.
#[derive(Default)]
pub(crate) struct PassState {
    pending: Vec<Pending>,
    assertions: Vec<DeferredAssertion>,
}

/// Per-component view of the running pass.
pub struct Scope<'p> {
    owner: &'p str,
    state: &'p mut PassState,
}

impl<'p> Scope<'p> {
    pub(crate) fn new(owner: &'p str, state: &'p mut PassState) -> Self {
        Self { owner, state }
    }

    /// Name of the component being rendered.
    #[must_use]
    pub const fn owner(&self) -> &str {
        self.owner
    }

    /// Read a deferred value, suspending the component when unresolved.
    ///
    /// # Errors
    ///
    /// Returns [`Suspended`] when `handle` has no value yet; the handle is
    /// recorded so the scheduler can wait for it.
    pub fn read<T: Clone + 'static>(&mut self, handle: &Deferred<T>) -> Result<T, Suspended> {
        if let Some(value) = handle.get() {
            return Ok(value);
        }
        self.state.pending.push(handle.waiter());
        Err(Suspended)
    }

    /// Register an invariant checked once composition has settled.
    ///
    /// `check` runs after the final pass; when it returns `false` the
    /// composition fails with `message` alongside every other failure.
    pub fn defer_assert<F>(&mut self, message: impl Into<String>, check: F)
    where
        F: Fn() -> bool + 'static,
    {
        self.state.assertions.push(DeferredAssertion {
            owner: self.owner.to_owned(),
            message: message.into(),
            check: Box::new(check),
        });
    }
}

/// Outcome of one composition pass.
pub struct Pass {
    pub(crate) documents: Vec<Value>,
    pub(crate) state: PassState,
    pub(crate) suspended: usize,
}

impl Pass {
    /// Returns `true` when no component suspended during the pass.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.suspended == 0
    }

    /// Number of subtrees abandoned during the pass.
    #[must_use]
    pub const fn suspended(&self) -> usize {
        self.suspended
    }

    /// Labels of the deferred values the pass is waiting on.
    #[must_use]
    pub fn pending_labels(&self) -> Vec<&str> {
        self.state.pending.iter().map(|p| &*p.label).collect()
    }

    /// Validate deferred assertions and release the documents.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::Unsettled`] when the pass suspended, and
    /// [`WeaveError::Assertions`] holding every failed invariant otherwise.
    pub fn finalize(self) -> WeaveResult<Vec<Value>> {
        if !self.is_settled() {
            return Err(Arc::new(WeaveError::Unsettled {
                pending: self.suspended,
            }));
        }
        let failures: Vec<WeaveError> = self
            .state
            .assertions
            .iter()
            .filter(|assertion| !(assertion.check)())
            .map(|assertion| WeaveError::Invariant {
                owner: assertion.owner.clone(),
                message: assertion.message.clone(),
            })
            .collect();
        debug!(
            checked = self.state.assertions.len(),
            failed = failures.len(),
            "deferred assertions evaluated"
        );
        match WeaveError::try_aggregate(failures) {
            Some(err) => Err(Arc::new(err)),
            None => Ok(self.documents),
        }
    }
}

/// Drives composition passes until the tree settles.
pub struct Scheduler<'t> {
    composer: Composer<'t>,
}

impl<'t> Scheduler<'t> {
    /// Create a scheduler over `table` with default options.
    #[must_use]
    pub fn new(table: &'t RelationTable) -> Self {
        Self {
            composer: Composer::new(table),
        }
    }

    /// Override composition options.
    #[must_use]
    pub fn with_options(mut self, options: ComposeOptions) -> Self {
        self.composer = self.composer.with_options(options);
        self
    }

    /// Compose `tree`, retrying whole passes until nothing is pending.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal composition error of any pass, returns
    /// [`WeaveError::ResolverDropped`] when a pending value can never
    /// resolve, [`WeaveError::Unsettled`] when a component suspended without
    /// reading a deferred value, and [`WeaveError::Assertions`] when deferred
    /// invariants fail on the settled pass.
    pub async fn settle(&self, tree: &Node) -> WeaveResult<Vec<Value>> {
        let mut passes = 0_usize;
        loop {
            passes += 1;
            let pass = self.composer.pass(tree)?;
            if pass.is_settled() {
                debug!(passes, "composition settled");
                return pass.finalize();
            }
            let Pass {
                state, suspended, ..
            } = pass;
            if state.pending.is_empty() {
                return Err(Arc::new(WeaveError::Unsettled { pending: suspended }));
            }
            debug!(
                passes,
                suspended,
                waiting = state.pending.len(),
                "pass suspended; waiting on deferred values"
            );
            for pending in state.pending {
                pending.wait().await?;
            }
        }
    }
}
