//! Shared Context - Per-session data passed between wizard steps
//!
//! One `SharedContext` exists per wizard session. Steps reach it through a
//! `ContextAccessor` and should fetch it again for every operation instead
//! of holding on to it: `Wizard::new_session` swaps in a fresh context and
//! every accessor follows.

use crate::import::{ColumnBindings, ImportSummary};
use std::cell::{Ref, RefCell, RefMut};
use std::path::PathBuf;
use std::rc::Rc;

/// Data produced and consumed by the import steps
#[derive(Debug, Clone, Default)]
pub struct ImportState {
    /// File chosen for import
    pub selected_file: Option<PathBuf>,
    /// Which source column feeds which field
    pub column_bindings: ColumnBindings,
    /// Result of the last committed import
    pub last_import: Option<ImportSummary>,
}

/// Cross-step session data
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    pub import: ImportState,
}

/// Shared, UI-thread-only reference to a session's context
pub type ContextHandle = Rc<RefCell<SharedContext>>;

/// Zero-argument accessor handed to every step
#[derive(Clone)]
pub struct ContextAccessor {
    session: Rc<RefCell<ContextHandle>>,
}

impl ContextAccessor {
    pub(crate) fn new(session: Rc<RefCell<ContextHandle>>) -> Self {
        Self { session }
    }

    /// Context of the current session
    pub fn get(&self) -> ContextHandle {
        self.session.borrow().clone()
    }

    /// Read the context for the duration of `f`
    pub fn with<R>(&self, f: impl FnOnce(&SharedContext) -> R) -> R {
        let context = self.get();
        let guard: Ref<'_, SharedContext> = context.borrow();
        f(&guard)
    }

    /// Mutate the context for the duration of `f`
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut SharedContext) -> R) -> R {
        let context = self.get();
        let mut guard: RefMut<'_, SharedContext> = context.borrow_mut();
        f(&mut guard)
    }
}

impl std::fmt::Debug for ContextAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextAccessor").finish_non_exhaustive()
    }
}

/// Holder of the active session, owned by the wizard
#[derive(Default)]
pub(crate) struct Session {
    current: Rc<RefCell<ContextHandle>>,
}

impl Session {
    pub fn accessor(&self) -> ContextAccessor {
        ContextAccessor::new(self.current.clone())
    }

    /// Replace the context with a fresh one; the old one is dropped
    /// once no step holds it any more
    pub fn renew(&self) {
        *self.current.borrow_mut() = Rc::new(RefCell::new(SharedContext::default()));
    }
}
