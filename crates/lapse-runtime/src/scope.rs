use std::borrow::Cow;
use std::sync::atomic::Ordering;

use lapse_types::{Event, Frame, Timestamp};

use crate::clock;
use crate::profiler::ThreadHandle;

/// Times an event from creation until drop, then appends it to the thread.
#[must_use = "the event is recorded when the guard is dropped"]
pub struct EventScope<'a> {
    thread: &'a ThreadHandle,
    event: Option<Event>,
}

impl<'a> EventScope<'a> {
    pub fn new(thread: &'a ThreadHandle, name: impl Into<Cow<'static, str>>) -> Self {
        let name = Some(name.into());
        Self {
            thread,
            event: Some(Event {
                name,
                start: clock::now(),
                end: Timestamp::ZERO,
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.event.as_ref().and_then(Event::name)
    }

    /// Closes the event now and returns what was recorded.
    pub fn finish(mut self) -> Event {
        self.close().unwrap_or_default()
    }

    fn close(&mut self) -> Option<Event> {
        let mut event = self.event.take()?;
        event.end = clock::now();
        self.thread.commit_event(event.clone());
        Some(event)
    }
}

impl Drop for EventScope<'_> {
    fn drop(&mut self) {
        if let Some(mut event) = self.event.take() {
            event.end = clock::now();
            self.thread.commit_event(event);
        }
    }
}

/// Times one frame. The index is assigned when the frame closes.
#[must_use = "the frame is recorded when the guard is dropped"]
pub struct FrameScope<'a> {
    thread: &'a ThreadHandle,
    start: Timestamp,
    open: bool,
}

impl<'a> FrameScope<'a> {
    pub fn new(thread: &'a ThreadHandle) -> Self {
        let nested = thread.cell.open_frames.fetch_add(1, Ordering::AcqRel) != 0;
        crate::lapse_assert!(!nested);
        Self {
            thread,
            start: clock::now(),
            open: true,
        }
    }

    /// Events are recorded on the thread, not on the frame.
    pub fn event(&self, name: impl Into<Cow<'static, str>>) -> EventScope<'a> {
        EventScope::new(self.thread, name)
    }

    pub fn finish(mut self) -> Frame {
        self.close()
    }

    fn close(&mut self) -> Frame {
        self.open = false;
        let frame = self.thread.commit_frame(self.start, clock::now());
        self.thread.cell.open_frames.fetch_sub(1, Ordering::AcqRel);
        frame
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        if self.open {
            self.close();
        }
    }
}
