//! Error types for the driver core and the message scrubber.

use crate::status::Status;
use thiserror::Error;

/// Errors surfaced by the driver core and its command objects.
#[derive(Debug, Error)]
pub enum Si4707Error {
    #[error("clear-to-send not asserted within {0:?}")]
    NotClearToSend(std::time::Duration),

    #[error("chip reported an error status: {0:?}")]
    StatusError(Status),

    #[error("hardware context I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("value out of range: {field} = {value}")]
    ValueOutOfRange { field: &'static str, value: String },

    #[error("radio is not powered up")]
    NotPowered,

    #[error("driver is shutting down")]
    Stopped,

    #[error("command queue is full")]
    QueueFull,

    #[error("chip revision mismatch: expected patch id {expected:#06x}, got {actual:#06x}")]
    PatchIdMismatch { expected: u16, actual: u16 },

    #[error("tuned frequency mismatch: requested {requested}, chip echoed {echoed}")]
    TuneMismatch { requested: u16, echoed: u16 },

    #[error("firmware patch payload could not be decoded: {0}")]
    PatchDecode(String),

    #[error(transparent)]
    Scrub(#[from] ScrubError),
}

/// Errors produced while reconstructing a SAME message from noisy headers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScrubError {
    #[error("candidates are ambiguous: best two matches tie for closeness")]
    Ambiguous,

    #[error("message is incomplete: fewer than 3 headers and timeout has not elapsed")]
    Incomplete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrub_error_converts_into_driver_error() {
        let e: Si4707Error = ScrubError::Ambiguous.into();
        assert!(matches!(e, Si4707Error::Scrub(ScrubError::Ambiguous)));
    }

    #[test]
    fn value_out_of_range_formats_field_and_value() {
        let e = Si4707Error::ValueOutOfRange {
            field: "frequency",
            value: "999".into(),
        };
        assert_eq!(format!("{e}"), "value out of range: frequency = 999");
    }
}
