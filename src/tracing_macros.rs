//! Crate-local logging shims.
//!
//! The `tracing` dependency is optional; these forward to it when the
//! feature is enabled and expand to nothing otherwise, so call sites in the
//! arena and document lifecycle stay unconditional.

/// Records a trace-level event.
macro_rules! trace {
    ($($field:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($field)*);
    };
}

/// Opens a trace-level span covering the rest of the enclosing scope.
macro_rules! trace_span {
    ($($field:tt)*) => {
        #[cfg(feature = "tracing")]
        let _guard = tracing::trace_span!($($field)*).entered();
    };
}

pub(crate) use trace;
pub(crate) use trace_span;
