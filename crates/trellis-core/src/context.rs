use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) type ContextKey = usize;

static NEXT_CONTEXT_KEY: AtomicUsize = AtomicUsize::new(1);

fn next_context_key() -> ContextKey {
    NEXT_CONTEXT_KEY.fetch_add(1, Ordering::Relaxed)
}

/// Handle for a value bound by an ancestor and read by its descendants.
///
/// Providing happens through [`use_provide`](crate::use_provide) and reading
/// through [`use_context`](crate::use_context). The default is only used by
/// [`use_provide_default`](crate::use_provide_default); a read with no
/// enclosing provider fails.
pub struct Context<T: Clone + PartialEq + 'static> {
    key: ContextKey,
    default: Rc<T>,
}

impl<T: Clone + PartialEq + 'static> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T: Clone + PartialEq + 'static> PartialEq for Context<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: Clone + PartialEq + 'static> Eq for Context<T> {}

impl<T: Clone + PartialEq + 'static> Context<T> {
    pub fn new(default: T) -> Self {
        Self {
            key: next_context_key(),
            default: Rc::new(default),
        }
    }

    pub fn default_value(&self) -> T {
        (*self.default).clone()
    }

    pub(crate) fn key(&self) -> ContextKey {
        self.key
    }
}

impl<T: Clone + PartialEq + 'static> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("key", &self.key).finish()
    }
}

pub fn create_context<T: Clone + PartialEq + 'static>(default: T) -> Context<T> {
    Context::new(default)
}
