//! Replaceable handler for internal invariant checks.
//!
//! A failed check calls the installed handler and then carries on. The
//! default handler logs the failure. Install [`panic_on_assert`] (or set
//! `ProfilerConfig::fatal_assertions`) to make failures fatal instead.

use parking_lot::RwLock;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionFailure {
    pub condition: &'static str,
    pub module: &'static str,
    pub file: &'static str,
    pub line: u32,
}

pub type AssertHandler = fn(&AssertionFailure);

static HANDLER: RwLock<AssertHandler> = RwLock::new(log_and_continue as AssertHandler);

/// Installs `handler` and returns the one it replaced.
pub fn set_assert_handler(handler: AssertHandler) -> AssertHandler {
    std::mem::replace(&mut *HANDLER.write(), handler)
}

pub fn assert_handler() -> AssertHandler {
    *HANDLER.read()
}

pub fn log_and_continue(failure: &AssertionFailure) {
    error!(
        condition = failure.condition,
        module = failure.module,
        file = failure.file,
        line = failure.line,
        "lapse invariant violated"
    );
}

pub fn panic_on_assert(failure: &AssertionFailure) {
    panic!(
        "lapse invariant violated: {} ({}:{} in {})",
        failure.condition, failure.file, failure.line, failure.module
    );
}

#[doc(hidden)]
pub fn report(failure: &AssertionFailure) {
    let handler = assert_handler();
    handler(failure);
}

/// Checks an invariant and reports a failure to the installed handler.
/// Execution continues unless the handler panics.
#[macro_export]
macro_rules! lapse_assert {
    ($cond:expr $(,)?) => {
        if !($cond) {
            $crate::assert::report(&$crate::assert::AssertionFailure {
                condition: stringify!($cond),
                module: module_path!(),
                file: file!(),
                line: line!(),
            });
        }
    };
}
