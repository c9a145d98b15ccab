//! Aggregates the 1-3 header copies of a single SAME transmission and
//! knows when enough of them have arrived to reconstruct the message.

use super::header::SameHeader;
use super::scrubber::{MessageScrubber, ScrubbedMessage};
use crate::error::ScrubError;
use std::time::{Duration, Instant};

/// A header arrives again roughly every two seconds; six seconds without a
/// new one (or a third header) means the transmission is over.
const HEADER_TIMEOUT: Duration = Duration::from_secs(6);

/// The maximum number of header copies a single SAME transmission repeats.
const MAX_HEADERS: usize = 3;

/// One in-progress (or completed) SAME message: the headers received so
/// far, when we stop waiting for more, and the lazily-computed scrubbed
/// result.
pub struct SameMessage {
    headers: Vec<SameHeader>,
    timeout_at: Instant,
    completed: bool,
    transmitter_counties: Option<&'static [&'static str]>,
    transmitter_wfo: Option<&'static str>,
    cached: Option<Result<ScrubbedMessage, ScrubError>>,
}

impl SameMessage {
    pub fn new(
        first_header: SameHeader,
        transmitter_counties: Option<&'static [&'static str]>,
        transmitter_wfo: Option<&'static str>,
    ) -> Self {
        let timeout_at = first_header.received_at + HEADER_TIMEOUT;
        SameMessage {
            headers: vec![first_header],
            timeout_at,
            completed: false,
            transmitter_counties,
            transmitter_wfo,
            cached: None,
        }
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Appends a new header copy, extending the timeout, unless this
    /// message is already marked fully received.
    pub fn add_header(&mut self, header: SameHeader) {
        if self.completed {
            return;
        }
        self.timeout_at = header.received_at + HEADER_TIMEOUT;
        self.headers.push(header);
        self.cached = None;
    }

    /// True once three headers have arrived or the timeout has elapsed.
    /// Transitions are one-shot: once complete, stays complete.
    pub fn fully_received(&mut self, now: Instant) -> bool {
        if !self.completed && (self.headers.len() >= MAX_HEADERS || now >= self.timeout_at) {
            self.completed = true;
        }
        self.completed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn timeout_at(&self) -> Instant {
        self.timeout_at
    }

    /// Lazily scrubs and caches the reconstructed message.
    pub fn get_same_message(&mut self) -> Result<ScrubbedMessage, ScrubError> {
        if self.cached.is_none() {
            let scrubber =
                MessageScrubber::new(&self.headers, self.transmitter_counties, self.transmitter_wfo);
            self.cached = Some(scrubber.scrub());
        }
        self.cached.clone().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confident::ConfidentString;

    fn header_at(t: Instant) -> SameHeader {
        SameHeader::from_raw(
            ConfidentString::certain(b"-WXR-TOR-029095+0030-2081645-KEAX/NWS-"),
            t,
        )
    }

    #[test]
    fn completes_after_three_headers() {
        let t0 = Instant::now();
        let mut msg = SameMessage::new(header_at(t0), None, None);
        assert!(!msg.fully_received(t0));
        msg.add_header(header_at(t0 + Duration::from_secs(2)));
        assert!(!msg.fully_received(t0 + Duration::from_secs(2)));
        msg.add_header(header_at(t0 + Duration::from_secs(4)));
        assert!(msg.fully_received(t0 + Duration::from_secs(4)));
    }

    #[test]
    fn completes_after_timeout_with_fewer_than_three() {
        let t0 = Instant::now();
        let mut msg = SameMessage::new(header_at(t0), None, None);
        assert!(!msg.fully_received(t0 + Duration::from_secs(1)));
        assert!(msg.fully_received(t0 + HEADER_TIMEOUT));
    }

    #[test]
    fn stays_completed_once_marked() {
        let t0 = Instant::now();
        let mut msg = SameMessage::new(header_at(t0), None, None);
        assert!(msg.fully_received(t0 + HEADER_TIMEOUT));
        // adding a header after completion must not un-complete the message
        msg.add_header(header_at(t0 + HEADER_TIMEOUT + Duration::from_secs(1)));
        assert!(msg.is_completed());
        assert_eq!(msg.header_count(), 1);
    }

    #[test]
    fn scrubbed_message_is_cached() {
        let t0 = Instant::now();
        let mut msg = SameMessage::new(header_at(t0), None, None);
        let first = msg.get_same_message().unwrap();
        let second = msg.get_same_message().unwrap();
        assert_eq!(first, second);
    }
}
