//! Capture record model shared by the runtime and the wire codec.
//!
//! A capture is a list of [`ThreadRecord`]s. Each record owns the [`Frame`]s
//! and [`Event`]s recorded on one instrumented thread of execution. Events live
//! flat on the thread record; frames only carry their own interval and index.

use facet::Facet;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::ops::Sub;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    EndBeforeStart { start: Timestamp, end: Timestamp },
    EmptyField(&'static str),
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndBeforeStart { start, end } => write!(
                f,
                "interval ends before it starts: start={}ns, end={}ns",
                start.as_nanos(),
                end.as_nanos()
            ),
            Self::EmptyField(field) => write!(f, "{field} must be non-empty"),
        }
    }
}

impl Error for InvariantError {}

/// Nanoseconds since an unspecified monotonic epoch. Only differences between
/// two timestamps taken in the same process are meaningful.
#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }
}

impl Sub for Timestamp {
    type Output = i64;

    fn sub(self, rhs: Self) -> i64 {
        self.0.saturating_sub(rhs.0)
    }
}

/// A named timed interval.
///
/// While recording, the name is usually a `&'static str` literal and is kept
/// borrowed. Decoded events own their name.
#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub name: Option<Cow<'static, str>>,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Event {
    pub fn new(name: &'static str) -> Self {
        Self {
            name: Some(Cow::Borrowed(name)),
            start: Timestamp::ZERO,
            end: Timestamp::ZERO,
        }
    }

    pub fn with_owned_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(Cow::Owned(name.into())),
            start: Timestamp::ZERO,
            end: Timestamp::ZERO,
        }
    }

    /// Builds an already closed event.
    pub fn closed(
        name: Option<Cow<'static, str>>,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Self, InvariantError> {
        if end < start {
            return Err(InvariantError::EndBeforeStart { start, end });
        }
        Ok(Self { name, start, end })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn duration_nanos(&self) -> i64 {
        self.end - self.start
    }
}

/// One iteration of an instrumented loop on a single thread.
#[derive(Facet, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub start: Timestamp,
    pub end: Timestamp,
    pub index: u64,
}

impl Frame {
    pub fn closed(start: Timestamp, end: Timestamp, index: u64) -> Result<Self, InvariantError> {
        if end < start {
            return Err(InvariantError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end, index })
    }

    pub fn duration_nanos(&self) -> i64 {
        self.end - self.start
    }
}

/// Bookkeeping for one instrumented thread of execution. This is not the OS
/// thread itself.
#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadRecord {
    pub name: Option<Cow<'static, str>>,
    pub frames: Vec<Frame>,
    pub events: Vec<Event>,
}

impl ThreadRecord {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Result<Self, InvariantError> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvariantError::EmptyField("thread name"));
        }
        Ok(Self {
            name: Some(name),
            frames: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_keeps_literal_name_borrowed() {
        const NAME: &str = "evt";
        let event = Event::new(NAME);
        match &event.name {
            Some(Cow::Borrowed(name)) => assert!(std::ptr::eq(*name, NAME)),
            other => panic!("expected borrowed name, got {other:?}"),
        }
    }

    #[test]
    fn closed_event_rejects_reversed_interval() {
        let err = Event::closed(None, Timestamp::from_nanos(10), Timestamp::from_nanos(5))
            .expect_err("end before start must be rejected");
        assert_eq!(
            err,
            InvariantError::EndBeforeStart {
                start: Timestamp::from_nanos(10),
                end: Timestamp::from_nanos(5),
            }
        );
    }

    #[test]
    fn zero_length_intervals_are_closed() {
        let frame = Frame::closed(Timestamp::from_nanos(7), Timestamp::from_nanos(7), 3)
            .expect("equal start and end is a valid interval");
        assert_eq!(frame.duration_nanos(), 0);
        assert_eq!(frame.index, 3);
    }

    #[test]
    fn thread_record_requires_a_name() {
        assert_eq!(
            ThreadRecord::new(""),
            Err(InvariantError::EmptyField("thread name"))
        );
        let record = ThreadRecord::new("MainThread").expect("named record");
        assert_eq!(record.name(), Some("MainThread"));
        assert!(record.is_empty());
    }

    #[test]
    fn timestamp_difference_saturates() {
        let early = Timestamp::from_nanos(i64::MIN);
        let late = Timestamp::from_nanos(i64::MAX);
        assert_eq!(late - early, i64::MAX);
        assert_eq!(early - late, i64::MIN);
    }
}
