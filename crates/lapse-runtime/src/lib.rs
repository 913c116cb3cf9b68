//! Recording side of lapse.
//!
//! A [`Profiler`] keeps a registry of instrumented threads. Each
//! [`ThreadHandle`] opens [`EventScope`] and [`FrameScope`] guards that time a
//! region and append the closed record to that thread when dropped.
//! [`Profiler::stop_capture`] serializes every registered thread and hands the
//! bytes to the configured [`CaptureSink`].

pub mod assert;
mod clock;
mod config;
mod error;
pub mod global;
mod profiler;
mod scope;
mod sink;

pub use crate::assert::{
    AssertHandler, AssertionFailure, assert_handler, log_and_continue, panic_on_assert,
    set_assert_handler,
};
pub use crate::clock::now;
pub use crate::config::{CAPTURE_PATH_ENV, FATAL_ASSERTIONS_ENV, ProfilerConfig};
pub use crate::error::ProfilerError;
pub use crate::profiler::{Profiler, ProfilerBuilder, ThreadHandle, ThreadKey};
pub use crate::scope::{EventScope, FrameScope};
pub use crate::sink::{CaptureSink, FileSink};
