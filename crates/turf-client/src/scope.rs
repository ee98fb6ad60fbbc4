//! # View Scopes
//!
//! A scope lives as long as the view that started a mutation. Closing it
//! tells the client to drop the mutation's side effects (cache
//! invalidation, access-state changes) when the answer arrives; the call
//! itself still runs to completion in the store.

use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope closed together with this one, e.g. a dialog in a page.
    pub fn child(&self) -> ViewScope {
        ViewScope {
            token: self.token.child_token(),
        }
    }

    /// Marks the view as gone.
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is closed.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Closes the scope when the guard is dropped.
    pub fn guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_closes_with_parent() {
        let page = ViewScope::new();
        let dialog = page.child();
        assert!(!dialog.is_closed());

        page.close();
        assert!(dialog.is_closed());
    }

    #[test]
    fn test_closing_child_leaves_parent_open() {
        let page = ViewScope::new();
        let dialog = page.child();
        dialog.close();
        assert!(!page.is_closed());
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let scope = ViewScope::new();
        {
            let _guard = scope.guard();
            assert!(!scope.is_closed());
        }
        assert!(scope.is_closed());
    }
}
