//! Optional process-wide profiler slot.
//!
//! Code that cannot thread a [`Profiler`] through its call graph can create
//! one instance here and look it up later. Lifecycle misuse is reported to
//! the assertion handler and returned as an error.

use parking_lot::RwLock;
use tracing::debug;

use crate::config::ProfilerConfig;
use crate::error::ProfilerError;
use crate::profiler::Profiler;

static INSTANCE: RwLock<Option<Profiler>> = RwLock::new(None);

pub fn create_instance(config: ProfilerConfig) -> Result<Profiler, ProfilerError> {
    let mut slot = INSTANCE.write();
    let vacant = slot.is_none();
    if !vacant {
        drop(slot);
        crate::lapse_assert!(vacant);
        return Err(ProfilerError::AlreadyCreated);
    }

    let profiler = Profiler::new(config);
    *slot = Some(profiler.clone());
    debug!("global profiler created");
    Ok(profiler)
}

pub fn instance() -> Result<Profiler, ProfilerError> {
    let profiler = INSTANCE.read().clone();
    let created = profiler.is_some();
    crate::lapse_assert!(created);
    profiler.ok_or(ProfilerError::NotCreated)
}

/// Empties the slot. Registered records are released once no handle or
/// clone of the profiler refers to them.
pub fn destroy_instance() -> Result<(), ProfilerError> {
    let profiler = INSTANCE.write().take();
    let created = profiler.is_some();
    crate::lapse_assert!(created);
    match profiler {
        Some(profiler) => {
            debug!(threads = profiler.thread_count(), "global profiler destroyed");
            drop(profiler);
            Ok(())
        }
        None => Err(ProfilerError::NotCreated),
    }
}
