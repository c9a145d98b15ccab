//! SAME (Specific Area Message Encoding) header aggregation and message
//! reconstruction.

pub mod grammar;
pub mod header;
pub mod message;
pub mod scrubber;
pub mod transmitter;

pub use header::SameHeader;
pub use message::SameMessage;
pub use scrubber::{MessageScrubber, ScrubbedMessage};
pub use transmitter::Transmitter;
