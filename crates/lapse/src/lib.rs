//! Scoped frame and event timing for instrumented programs.
//!
//! Register each thread of execution you care about with a [`Profiler`], open
//! scope guards around the regions you want timed, and stop the capture to get
//! one binary blob holding every thread's frames and events. The blob can be
//! read back with [`decode_capture`].
//!
//! ```rust,no_run
//! let profiler = lapse::Profiler::new(lapse::ProfilerConfig::from_env());
//! let main = profiler.add_thread("MainThread");
//!
//! for _ in 0..3 {
//!     lapse::frame_scope!(main);
//!     lapse::event_scope!(main, "update");
//!     // ...
//! }
//!
//! // LAPSE_CAPTURE=capture.lapse installs a file sink.
//! profiler.stop_capture()?;
//! # Ok::<(), lapse::ProfilerError>(())
//! ```
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `LAPSE_CAPTURE` | Path `stop_capture` writes the capture to. |
//! | `LAPSE_FATAL_ASSERTIONS` | `1`/`true` turns internal invariant failures into panics. |
//!
//! # Capture format
//!
//! An 8-byte header (magic `LPSE`, version, byte-order tag) followed by one
//! record per registered thread. Integers are written in host byte order, so
//! captures are only portable between hosts of the same endianness.

pub use lapse_runtime::*;
pub use lapse_types::{Event, Frame, InvariantError, ThreadRecord, Timestamp};
pub use lapse_wire::{
    AllocError, Allocator, DefaultAllocator, WireError, decode_capture, decode_capture_default,
    default_allocator,
};

/// Times the rest of the enclosing block as an event on `thread`.
#[macro_export]
macro_rules! event_scope {
    ($thread:expr, $name:expr $(,)?) => {
        let _lapse_event_scope = $crate::ThreadHandle::event(&$thread, $name);
    };
}

/// Times the rest of the enclosing block as one frame on `thread`.
#[macro_export]
macro_rules! frame_scope {
    ($thread:expr $(,)?) => {
        let _lapse_frame_scope = $crate::ThreadHandle::frame(&$thread);
    };
}
