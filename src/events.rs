//! Events the driver core dispatches to registered listeners from its
//! event worker thread.

use crate::error::Si4707Error;
use crate::same::ScrubbedMessage;
use chrono::{DateTime, Utc};

/// Something the driver core wants to tell the outside world about.
#[derive(Debug, Clone)]
pub enum Event {
    /// A command raised an error while executing.
    CommandException {
        timestamp: DateTime<Utc>,
        message: String,
    },
    /// A new SAME header copy was received (not yet necessarily a
    /// complete message).
    SameHeaderReceived {
        timestamp: DateTime<Utc>,
        header_count: usize,
    },
    /// A SAME message reached completion (3 headers or timeout) and was
    /// successfully reconstructed.
    SameMessageReceived {
        timestamp: DateTime<Utc>,
        message: ScrubbedMessage,
    },
    /// The alert tone (1050 Hz) that precedes a SAME transmission ended.
    EndOfMessage { timestamp: DateTime<Utc> },
    /// Power state changed as a result of `PowerUp`/`PowerDown`.
    RadioPower { timestamp: DateTime<Utc>, powered_on: bool },
    /// The crystal oscillator has stabilized; tuning commands may now run.
    ReadyToTune { timestamp: DateTime<Utc> },
}

impl Event {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::CommandException { timestamp, .. }
            | Event::SameHeaderReceived { timestamp, .. }
            | Event::SameMessageReceived { timestamp, .. }
            | Event::EndOfMessage { timestamp }
            | Event::RadioPower { timestamp, .. }
            | Event::ReadyToTune { timestamp } => *timestamp,
        }
    }

    pub fn command_exception(error: &Si4707Error) -> Self {
        Event::CommandException {
            timestamp: Utc::now(),
            message: error.to_string(),
        }
    }
}

/// Anything that wants to be told about driver events. Implementors must
/// tolerate being called from the event worker thread and must not block
/// for long — a slow listener stalls every subsequent event.
pub trait Listener: Send {
    fn on_event(&mut self, event: &Event);
}

impl<F: FnMut(&Event) + Send> Listener for F {
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_implement_listener() {
        let mut seen = Vec::new();
        let mut listener = |e: &Event| seen.push(e.timestamp());
        let event = Event::EndOfMessage { timestamp: Utc::now() };
        listener.on_event(&event);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn command_exception_carries_message() {
        let err = Si4707Error::NotPowered;
        let event = Event::command_exception(&err);
        match event {
            Event::CommandException { message, .. } => assert_eq!(message, "radio is not powered up"),
            _ => panic!("wrong variant"),
        }
    }
}
