use lapse_wire::WireError;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilerError {
    Wire(WireError),
    /// The process-wide instance already exists.
    AlreadyCreated,
    /// The process-wide instance was used before creation or after destruction.
    NotCreated,
}

impl fmt::Display for ProfilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(err) => write!(f, "failed to serialize capture: {err}"),
            Self::AlreadyCreated => write!(f, "profiler instance already created"),
            Self::NotCreated => write!(f, "profiler instance not created"),
        }
    }
}

impl Error for ProfilerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Wire(err) => Some(err),
            Self::AlreadyCreated | Self::NotCreated => None,
        }
    }
}

impl From<WireError> for ProfilerError {
    fn from(value: WireError) -> Self {
        Self::Wire(value)
    }
}
