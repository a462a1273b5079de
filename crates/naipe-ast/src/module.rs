//! Process-wide lifecycle for the AST module.
//!
//! [`initialize_module`] and [`shutdown_module`] bracket the module's only
//! global state: atomic counters of constructed and released nodes, kept as
//! a leak diagnostic. Both hooks are safe to call unconditionally and more
//! than once; collaborators never need to branch on whether the module
//! carries pooled state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);
static RELEASED: AtomicUsize = AtomicUsize::new(0);

/// Initialize the module's internal state. Call once before constructing
/// nodes; extra calls are no-ops.
pub fn initialize_module() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    tracing::debug!("abstract syntax tree module initialized");
}

/// Shut the module down after the last release. Warns when nodes were
/// constructed but never released.
pub fn shutdown_module() {
    if !INITIALIZED.swap(false, Ordering::SeqCst) {
        return;
    }
    let constructed = CONSTRUCTED.swap(0, Ordering::SeqCst);
    let released = RELEASED.swap(0, Ordering::SeqCst);
    if constructed > released {
        tracing::warn!(
            constructed,
            released,
            "abstract syntax tree module shut down with live nodes"
        );
    } else {
        tracing::debug!(constructed, released, "abstract syntax tree module shut down");
    }
}

pub(crate) fn note_constructed() {
    CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_released(count: usize) {
    RELEASED.fetch_add(count, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_is_idempotent() {
        initialize_module();
        initialize_module();
        shutdown_module();
        shutdown_module();
        initialize_module();
        shutdown_module();
    }
}
