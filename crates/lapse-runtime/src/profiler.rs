use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use lapse_types::{Event, Frame, InvariantError, ThreadRecord, Timestamp};
use lapse_wire::{Allocator, CaptureHeader, Encode, WriteStream, default_allocator};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::assert::{panic_on_assert, set_assert_handler};
use crate::config::ProfilerConfig;
use crate::error::ProfilerError;
use crate::scope::{EventScope, FrameScope};
use crate::sink::{CaptureSink, FileSink};

/// Registry slot id. Handed out in increasing order and never reused, so
/// iteration order is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadKey(u64);

impl ThreadKey {
    pub fn get(self) -> u64 {
        self.0
    }
}

struct ThreadState {
    record: ThreadRecord,
    next_frame_index: u64,
}

pub(crate) struct ThreadCell {
    key: ThreadKey,
    name: Option<Cow<'static, str>>,
    state: Mutex<ThreadState>,
    /// Frame guards currently open on this thread.
    pub(crate) open_frames: AtomicU32,
}

/// Producer side of one instrumented thread of execution.
///
/// Guards opened through a handle only ever touch that handle's record. The
/// record lock is taken once per commit, and by a capture while it drains.
#[derive(Clone)]
pub struct ThreadHandle {
    pub(crate) cell: Arc<ThreadCell>,
}

impl ThreadHandle {
    pub fn key(&self) -> ThreadKey {
        self.cell.key
    }

    pub fn name(&self) -> Option<&str> {
        self.cell.name.as_deref()
    }

    /// Starts a timed event. It is recorded when the guard goes away.
    pub fn event(&self, name: impl Into<Cow<'static, str>>) -> EventScope<'_> {
        EventScope::new(self, name)
    }

    /// Starts a frame. Frames on one thread must not overlap.
    pub fn frame(&self) -> FrameScope<'_> {
        FrameScope::new(self)
    }

    /// Appends an event that was timed elsewhere.
    pub fn record(&self, event: Event) -> Result<(), InvariantError> {
        if event.end < event.start {
            return Err(InvariantError::EndBeforeStart {
                start: event.start,
                end: event.end,
            });
        }
        self.commit_event(event);
        Ok(())
    }

    /// Copy of everything committed so far.
    pub fn snapshot(&self) -> ThreadRecord {
        self.cell.state.lock().record.clone()
    }

    pub fn event_count(&self) -> usize {
        self.cell.state.lock().record.events.len()
    }

    pub fn frame_count(&self) -> usize {
        self.cell.state.lock().record.frames.len()
    }

    pub(crate) fn commit_event(&self, event: Event) {
        self.cell.state.lock().record.events.push(event);
    }

    pub(crate) fn commit_frame(&self, start: Timestamp, end: Timestamp) -> Frame {
        let mut state = self.cell.state.lock();
        let frame = Frame {
            start,
            end,
            index: state.next_frame_index,
        };
        state.next_frame_index += 1;
        state.record.frames.push(frame);
        frame
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("key", &self.cell.key)
            .field("name", &self.cell.name)
            .finish()
    }
}

struct ProfilerInner {
    config: ProfilerConfig,
    threads: Mutex<BTreeMap<ThreadKey, Arc<ThreadCell>>>,
    next_key: AtomicU64,
    allocator: RwLock<Arc<dyn Allocator>>,
    sink: RwLock<Option<Arc<dyn CaptureSink>>>,
}

impl Drop for ProfilerInner {
    fn drop(&mut self) {
        debug!(threads = self.threads.get_mut().len(), "profiler released");
    }
}

/// Owns the thread registry, the allocator used for captures and the
/// optional save sink. Clones share the same state.
#[derive(Clone)]
pub struct Profiler {
    inner: Arc<ProfilerInner>,
}

impl Profiler {
    pub fn new(config: ProfilerConfig) -> Self {
        if config.fatal_assertions {
            set_assert_handler(panic_on_assert);
        }
        let sink: Option<Arc<dyn CaptureSink>> = config
            .capture_path
            .as_ref()
            .map(|path| Arc::new(FileSink::new(path)) as Arc<dyn CaptureSink>);

        Self {
            inner: Arc::new(ProfilerInner {
                config,
                threads: Mutex::new(BTreeMap::new()),
                next_key: AtomicU64::new(0),
                allocator: RwLock::new(default_allocator()),
                sink: RwLock::new(sink),
            }),
        }
    }

    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::default()
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.inner.config
    }

    pub fn add_thread(&self, name: impl Into<Cow<'static, str>>) -> ThreadHandle {
        let name = name.into();
        let named = !name.is_empty();
        crate::lapse_assert!(named);
        let record = ThreadRecord::new(name).unwrap_or_default();

        let key = ThreadKey(self.inner.next_key.fetch_add(1, Ordering::Relaxed));
        let cell = Arc::new(ThreadCell {
            key,
            name: record.name.clone(),
            state: Mutex::new(ThreadState {
                record,
                next_frame_index: 0,
            }),
            open_frames: AtomicU32::new(0),
        });

        let mut threads = self.inner.threads.lock();
        threads.insert(key, Arc::clone(&cell));
        debug!(
            key = key.get(),
            name = cell.name.as_deref().unwrap_or(""),
            registered = threads.len(),
            "thread added"
        );
        ThreadHandle { cell }
    }

    /// Detaches the thread from future captures. The record stays readable
    /// through `handle`. Returns `false` if the handle was not registered here.
    pub fn remove_thread(&self, handle: &ThreadHandle) -> bool {
        let mut threads = self.inner.threads.lock();
        let registered = threads
            .get(&handle.cell.key)
            .is_some_and(|cell| Arc::ptr_eq(cell, &handle.cell));
        if registered {
            threads.remove(&handle.cell.key);
            debug!(key = handle.cell.key.get(), "thread removed");
        }
        registered
    }

    pub fn thread_count(&self) -> usize {
        self.inner.threads.lock().len()
    }

    pub fn contains(&self, handle: &ThreadHandle) -> bool {
        self.inner
            .threads
            .lock()
            .get(&handle.cell.key)
            .is_some_and(|cell| Arc::ptr_eq(cell, &handle.cell))
    }

    pub fn set_allocator(&self, allocator: Arc<dyn Allocator>) {
        *self.inner.allocator.write() = allocator;
    }

    pub fn allocator(&self) -> Arc<dyn Allocator> {
        Arc::clone(&self.inner.allocator.read())
    }

    pub fn set_save_sink(&self, sink: impl CaptureSink + 'static) {
        *self.inner.sink.write() = Some(Arc::new(sink));
    }

    pub fn clear_save_sink(&self) {
        *self.inner.sink.write() = None;
    }

    pub fn has_save_sink(&self) -> bool {
        self.inner.sink.read().is_some()
    }

    /// Serializes every registered thread, in registration order.
    pub fn capture(&self) -> Result<Vec<u8>, ProfilerError> {
        let (stream, _) = self.serialize_registered()?;
        Ok(stream.into_bytes())
    }

    /// Serializes the registry and hands it to the save sink. Without a sink
    /// nothing is serialized and `Ok(None)` is returned.
    pub fn stop_capture(&self) -> Result<Option<usize>, ProfilerError> {
        let Some(sink) = self.inner.sink.read().clone() else {
            debug!("stop_capture without a save sink");
            return Ok(None);
        };

        let (stream, threads) = self.serialize_registered()?;
        let capture = stream.written();
        info!(
            threads,
            bytes = capture.len(),
            "capture stopped"
        );
        sink.save(capture);
        Ok(Some(capture.len()))
    }

    /// Returns the stream and the number of threads written into it.
    fn serialize_registered(&self) -> Result<(WriteStream, usize), ProfilerError> {
        let mut stream = WriteStream::new(self.allocator());
        CaptureHeader::current().encode(&mut stream)?;

        let threads = self.inner.threads.lock();
        for cell in threads.values() {
            let state = cell.state.lock();
            state.record.encode(&mut stream)?;
        }
        Ok((stream, threads.len()))
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("config", &self.inner.config)
            .field("threads", &self.thread_count())
            .field("has_save_sink", &self.has_save_sink())
            .finish()
    }
}

#[derive(Default)]
pub struct ProfilerBuilder {
    config: ProfilerConfig,
    allocator: Option<Arc<dyn Allocator>>,
    sink: Option<Arc<dyn CaptureSink>>,
}

impl ProfilerBuilder {
    #[must_use]
    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Takes precedence over `ProfilerConfig::capture_path`.
    #[must_use]
    pub fn save_sink(mut self, sink: impl CaptureSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn build(self) -> Profiler {
        let profiler = Profiler::new(self.config);
        if let Some(allocator) = self.allocator {
            profiler.set_allocator(allocator);
        }
        if let Some(sink) = self.sink {
            *profiler.inner.sink.write() = Some(sink);
        }
        profiler
    }
}
