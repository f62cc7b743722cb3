//! Lock-guarded store shared between ingestion workers.

use crate::error::{GraphError, Result};
use crate::graph::{CodeGraph, MergeOutcome};
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard};

/// A [`CodeGraph`] behind an `Arc<Mutex<>>`.
///
/// Workers build partial graphs without touching the shared store; merging
/// them is the only synchronized operation.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<Mutex<CodeGraph>>,
}

impl SharedGraph {
    /// Share an existing graph.
    pub fn new(graph: CodeGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Merge a batch of partial graphs atomically.
    ///
    /// One exclusive lock is held for the whole batch. The partials are merged
    /// into a staged copy which replaces the store only if every merge
    /// succeeded, so a failed batch leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LockPoisoned`] if a previous holder panicked, or
    /// the first fatal merge error.
    pub fn merge_batch(&self, partials: &[CodeGraph]) -> Result<Vec<MergeOutcome>> {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let mut outcomes = Vec::with_capacity(partials.len());
        for partial in partials {
            outcomes.push(staged.merge(partial)?);
        }
        *guard = staged;
        info!(
            "Merged batch of {} partial graphs ({} entities, {} edges)",
            partials.len(),
            guard.entity_count(),
            guard.edge_count()
        );
        Ok(outcomes)
    }

    /// Run `f` with shared access to the store.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LockPoisoned`] if a previous holder panicked.
    pub fn read<R>(&self, f: impl FnOnce(&CodeGraph) -> R) -> Result<R> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LockPoisoned`] if a previous holder panicked.
    pub fn write<R>(&self, f: impl FnOnce(&mut CodeGraph) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Clone the current contents.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LockPoisoned`] if a previous holder panicked.
    pub fn snapshot(&self) -> Result<CodeGraph> {
        self.read(Clone::clone)
    }

    /// Take the graph out, cloning only if other handles are still alive.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LockPoisoned`] if a previous holder panicked.
    pub fn into_inner(self) -> Result<CodeGraph> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().map_err(|_| GraphError::LockPoisoned),
            Err(shared) => {
                debug!("SharedGraph still referenced elsewhere; cloning contents");
                let guard = shared.lock().map_err(|_| GraphError::LockPoisoned)?;
                Ok(guard.clone())
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, CodeGraph>> {
        self.inner.lock().map_err(|_| GraphError::LockPoisoned)
    }
}
