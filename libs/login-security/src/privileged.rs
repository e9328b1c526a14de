//! Scoped privilege elevation for security-sensitive mutations.
//!
//! [`run_elevated`] acquires an elevation scope for the current thread, runs the
//! operation and releases the scope when the operation returns, fails or
//! unwinds. Scopes nest; [`is_elevated`] reports whether any scope is active.
//!
//! ```
//! use login_security::{is_elevated, run_elevated};
//!
//! let value = run_elevated(|| {
//!     assert!(is_elevated());
//!     Ok::<_, std::io::Error>(42)
//! })
//! .unwrap();
//!
//! assert_eq!(value, 42);
//! assert!(!is_elevated());
//! ```

use std::cell::Cell;
use std::error::Error;
use std::marker::PhantomData;

/// Boxed error accepted as the cause of an elevated operation failure.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

thread_local! {
    static ELEVATION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// An error raised inside an elevated operation.
#[derive(Debug, thiserror::Error)]
#[error("privileged operation failed: {source}")]
pub struct ElevationError {
    #[source]
    source: BoxError,
}

impl ElevationError {
    /// The error raised by the elevated operation.
    #[must_use]
    pub fn cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Downcast the cause to a concrete error type.
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }

    #[must_use]
    pub fn into_cause(self) -> BoxError {
        self.source
    }
}

/// Held for the lifetime of an elevation scope. Not `Send`: the scope belongs
/// to the thread that acquired it.
struct ElevationGuard {
    _not_send: PhantomData<*const ()>,
}

impl ElevationGuard {
    fn acquire() -> Self {
        let depth = ELEVATION_DEPTH.with(|d| {
            let depth = d.get() + 1;
            d.set(depth);
            depth
        });
        tracing::trace!(depth, "elevation scope acquired");
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for ElevationGuard {
    fn drop(&mut self) {
        let depth = ELEVATION_DEPTH.with(|d| {
            let depth = d.get().saturating_sub(1);
            d.set(depth);
            depth
        });
        tracing::trace!(depth, "elevation scope released");
    }
}

/// Whether the current thread is inside an elevation scope.
#[must_use]
pub fn is_elevated() -> bool {
    ELEVATION_DEPTH.with(|d| d.get() > 0)
}

/// Run `op` inside an elevation scope.
///
/// The scope is released before this function returns, whatever the outcome.
///
/// # Errors
///
/// Returns [`ElevationError`] wrapping the error returned by `op`. No retry is
/// attempted.
pub fn run_elevated<T, E, F>(op: F) -> Result<T, ElevationError>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<BoxError>,
{
    let _guard = ElevationGuard::acquire();
    op().map_err(|e| {
        let source = e.into();
        tracing::debug!(error = %source, "privileged operation failed");
        ElevationError { source }
    })
}
