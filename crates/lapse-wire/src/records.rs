use std::borrow::Cow;

use lapse_types::{Event, Frame, ThreadRecord, Timestamp};

use crate::codec::{Decode, Encode};
use crate::error::WireError;
use crate::stream::{ReadStream, WriteStream};

impl Encode for Timestamp {
    fn encode(&self, stream: &mut WriteStream) -> Result<(), WireError> {
        stream.write_i64(self.as_nanos())
    }
}

impl Decode for Timestamp {
    const MIN_ENCODED_LEN: usize = 8;

    fn decode(stream: &mut ReadStream) -> Result<Self, WireError> {
        stream.read_i64().map(Timestamp::from_nanos)
    }
}

// Event: start, end, name.
impl Encode for Event {
    fn encode(&self, stream: &mut WriteStream) -> Result<(), WireError> {
        self.start.encode(stream)?;
        self.end.encode(stream)?;
        stream.write_text(self.name())
    }
}

impl Decode for Event {
    const MIN_ENCODED_LEN: usize = 8 + 8 + 4;

    fn decode(stream: &mut ReadStream) -> Result<Self, WireError> {
        let start = Timestamp::decode(stream)?;
        let end = Timestamp::decode(stream)?;
        let name = stream.read_text()?.map(Cow::Owned);
        Ok(Self { name, start, end })
    }
}

// Frame: start, end, index.
impl Encode for Frame {
    fn encode(&self, stream: &mut WriteStream) -> Result<(), WireError> {
        self.start.encode(stream)?;
        self.end.encode(stream)?;
        stream.write_u64(self.index)
    }
}

impl Decode for Frame {
    const MIN_ENCODED_LEN: usize = 8 + 8 + 8;

    fn decode(stream: &mut ReadStream) -> Result<Self, WireError> {
        Ok(Self {
            start: Timestamp::decode(stream)?,
            end: Timestamp::decode(stream)?,
            index: stream.read_u64()?,
        })
    }
}

// Thread: name, events, frames. Readers must keep this order.
impl Encode for ThreadRecord {
    fn encode(&self, stream: &mut WriteStream) -> Result<(), WireError> {
        stream.write_text(self.name())?;
        stream.write_seq(&self.events)?;
        stream.write_seq(&self.frames)
    }
}

impl Decode for ThreadRecord {
    const MIN_ENCODED_LEN: usize = 4 + 4 + 4;

    fn decode(stream: &mut ReadStream) -> Result<Self, WireError> {
        let name = stream.read_text()?.map(Cow::Owned);
        let events = stream.read_seq()?;
        let frames = stream.read_seq()?;
        Ok(Self {
            name,
            frames,
            events,
        })
    }
}
