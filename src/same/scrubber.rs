//! Reconstructs a single best-guess SAME message from one or more noisy
//! header copies, using the fixed grammar to correct low-confidence
//! positions.

use super::grammar;
use super::header::SameHeader;
use crate::confident::ConfidentString;
use crate::error::ScrubError;
use std::time::Instant;

/// The fully reconstructed, parsed fields of a SAME message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubbedMessage {
    pub originator: String,
    pub event_type: String,
    pub counties: Vec<String>,
    pub duration: String,
    pub issue_time: String,
    pub wfo: String,
    pub corrected_text: String,
}

/// Runs the merge-then-correct pipeline over a set of received headers.
pub struct MessageScrubber {
    merged: ConfidentString,
    known_counties: Option<&'static [&'static str]>,
    known_wfo: Option<&'static str>,
    first_received_at: Instant,
}

impl MessageScrubber {
    pub fn new(
        headers: &[SameHeader],
        known_counties: Option<&'static [&'static str]>,
        known_wfo: Option<&'static str>,
    ) -> Self {
        let first_received_at = headers.first().map(|h| h.received_at).unwrap_or_else(Instant::now);
        let merged = headers
            .iter()
            .map(|h| h.content().clone())
            .reduce(|a, b| a.merge(&b))
            .unwrap_or_else(|| ConfidentString::new(Vec::new()));
        MessageScrubber {
            merged,
            known_counties,
            known_wfo,
            first_received_at,
        }
    }

    /// Best estimate of the wall-clock instant the first header copy was
    /// received, derived from the monotonic `Instant` it was stamped with
    /// plus however long has elapsed since (scrubbing happens after the
    /// message's 6s collection window, not at receipt time).
    fn received_at_wall_clock(&self) -> chrono::DateTime<chrono::Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.first_received_at);
        let elapsed = chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        chrono::Utc::now() - elapsed
    }

    /// Picks the FIPS-code count whose shell shape is closest to the
    /// merged content, truncates/pads to that canonical length, then
    /// overrides every fixed-literal position (`-`, `+`, `/`, `NWS`)
    /// with the grammar's own text, boosting its confidence to a
    /// derived end-confidence that reflects how well the shell actually
    /// matched. Data positions (FIPS digits, duration, issue-time, WFO)
    /// are left untouched for Stage 3 to resolve.
    fn fix_length(&self) -> Result<(ConfidentString, usize), ScrubError> {
        let shells = grammar::shell_candidates();
        let mut scored: Vec<(f64, usize)> = shells
            .iter()
            .enumerate()
            .map(|(ix, (weight, bytes))| {
                let distance = self.merged.confidence_distance_to(bytes);
                ((1.0 + distance as f64) / weight, ix)
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        if scored.len() > 1 && (scored[1].0 - scored[0].0).abs() < f64::EPSILON {
            return Err(ScrubError::Ambiguous);
        }
        let county_count = scored[0].1 + 1;
        let canonical_len = 8 + 7 * county_count + grammar::END_SEQUENCE.len();

        let mut chars = self.merged.chars().to_vec();
        chars.resize(canonical_len, crate::confident::ConfidentCharacter::null());
        let content = ConfidentString::new(chars);

        // Distance of the actual (truncated) content against the winning
        // shell's real template, not the padded candidate used above to
        // compare shells of differing lengths fairly.
        let template = grammar::override_template(county_count as u32);
        let winning_distance = content.confidence_distance_to(&template);
        let fixed_char_count = template.iter().filter(|&&b| b != 0).count().max(1) as f64;
        let derived_confidence = ((fixed_char_count * content.median_confidence()
            - winning_distance as f64)
            / fixed_char_count)
            .max(0.0)
            .round() as u8;

        // Force every fixed-literal position to the grammar's own byte at
        // the derived confidence, whether or not it already matched; data
        // positions (template byte 0x00) are left exactly as received.
        let mut chars = content.chars().to_vec();
        for (i, &b) in template.iter().enumerate() {
            if b != 0 {
                chars[i] = crate::confident::ConfidentCharacter::from_bits(b, [derived_confidence; 8]);
            }
        }
        let content = ConfidentString::new(chars);

        Ok((content, county_count))
    }

    fn sub_region(
        content: &ConfidentString,
        start: usize,
        end: usize,
        candidates: &[(f64, Vec<u8>)],
    ) -> Result<ConfidentString, ScrubError> {
        let region = content.slice(start, end.min(content.len()));
        region.closest(candidates)
    }

    fn splice(content: &ConfidentString, start: usize, replacement: &ConfidentString) -> ConfidentString {
        let mut out = content.chars().to_vec();
        for (i, c) in replacement.chars().iter().enumerate() {
            if start + i < out.len() {
                out[start + i] = *c;
            }
        }
        ConfidentString::new(out)
    }

    /// Runs the full correction pipeline and parses the resulting fields.
    pub fn scrub(&self) -> Result<ScrubbedMessage, ScrubError> {
        if self.merged.is_empty() {
            return Err(ScrubError::Incomplete);
        }

        let (mut content, county_count) = self.fix_length()?;
        let plus_ix = 8 + 7 * county_count;

        let originator_region = Self::sub_region(&content, 1, 4, &grammar::originator_candidates())?;
        content = Self::splice(&content, 1, &originator_region);

        let event_region = Self::sub_region(&content, 5, 8, &grammar::event_type_candidates())?;
        content = Self::splice(&content, 5, &event_region);

        let duration_region = Self::sub_region(
            &content,
            plus_ix + 1,
            plus_ix + 5,
            &grammar::duration_candidates(),
        )?;
        content = Self::splice(&content, plus_ix + 1, &duration_region);

        let issue_time_region = Self::sub_region(
            &content,
            plus_ix + 6,
            plus_ix + 13,
            &grammar::issue_time_candidates(self.received_at_wall_clock()),
        )?;
        content = Self::splice(&content, plus_ix + 6, &issue_time_region);

        if let Some(wfo) = self.known_wfo {
            let wfo_region = Self::sub_region(
                &content,
                plus_ix + 14,
                plus_ix + 18,
                &[(1.0, wfo.as_bytes().to_vec())],
            )?;
            content = Self::splice(&content, plus_ix + 14, &wfo_region);
        }

        let office_literal = ConfidentString::certain(b"NWS-");
        content = Self::splice(&content, plus_ix + 19, &office_literal);

        if let Some(pool) = self.known_counties {
            let mut remaining: Vec<&str> = pool.to_vec();
            for slot in 0..county_count {
                let start = 9 + slot * 7;
                let end = start + 6;
                if end > content.len() {
                    break;
                }
                if remaining.is_empty() {
                    break;
                }
                let candidates: Vec<(f64, Vec<u8>)> = remaining
                    .iter()
                    .enumerate()
                    .map(|(ix, c)| (1.0 - (ix as f64 / 48.0), c.as_bytes().to_vec()))
                    .collect();
                let region = Self::sub_region(&content, start, end, &candidates)?;
                let matched = region.to_bytes();
                if let Some(pos) = remaining
                    .iter()
                    .position(|c| c.as_bytes() == matched.as_slice())
                {
                    remaining.remove(pos);
                }
                content = Self::splice(&content, start, &region);
            }
        }

        let bytes = content.to_bytes();
        let text = String::from_utf8_lossy(&bytes).into_owned();

        let originator = text.get(1..4).unwrap_or_default().to_string();
        let event_type = text.get(5..8).unwrap_or_default().to_string();
        let duration = text.get(plus_ix + 1..plus_ix + 5).unwrap_or_default().to_string();
        let issue_time = text.get(plus_ix + 6..plus_ix + 13).unwrap_or_default().to_string();
        let wfo = text.get(plus_ix + 14..plus_ix + 18).unwrap_or_default().to_string();

        let mut counties = Vec::with_capacity(county_count);
        for slot in 0..county_count {
            let start = 9 + slot * 7;
            let end = (start + 6).min(text.len());
            if start < text.len() {
                counties.push(text[start..end].to_string());
            }
        }

        Ok(ScrubbedMessage {
            originator,
            event_type,
            counties,
            duration,
            issue_time,
            wfo,
            corrected_text: text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confident::ConfidentCharacter;
    use std::time::Instant;

    fn header(text: &str) -> SameHeader {
        SameHeader::from_raw(ConfidentString::certain(text.as_bytes()), Instant::now())
    }

    #[test]
    fn empty_headers_are_incomplete() {
        let scrubber = MessageScrubber::new(&[], None, None);
        assert_eq!(scrubber.scrub().unwrap_err(), ScrubError::Incomplete);
    }

    #[test]
    fn scrubs_a_clean_single_county_header() {
        let raw = "-WXR-TOR-029095+0030-2081645-KEAX/NWS-";
        let scrubber = MessageScrubber::new(&[header(raw)], Some(&["029095"]), Some("KEAX"));
        let scrubbed = scrubber.scrub().unwrap();
        assert_eq!(scrubbed.originator, "WXR");
        assert_eq!(scrubbed.event_type, "TOR");
        assert_eq!(scrubbed.duration, "0030");
        assert_eq!(scrubbed.counties, vec!["029095"]);
        assert_eq!(scrubbed.wfo, "KEAX");
    }

    #[test]
    fn low_confidence_byte_is_corrected_toward_grammar() {
        let mut chars = ConfidentString::certain(b"-WXR-TOR-029095+0035-2081645-KEAX/NWS-")
            .chars()
            .to_vec();
        // weaken the last digit of the duration field so the scrubber can
        // pull it toward a real duration code
        chars[19] = ConfidentCharacter::from_bits(b'5', [1; 8]);
        let noisy = SameHeader::from_raw(ConfidentString::new(chars), Instant::now());
        let scrubber = MessageScrubber::new(&[noisy], Some(&["029095"]), None);
        let scrubbed = scrubber.scrub().unwrap();
        assert_eq!(scrubbed.duration, "0030");
    }

    #[test]
    fn noisy_separators_are_corrected_by_the_fixed_template() {
        // Corrupt every fixed-literal separator's byte outright (but with
        // low confidence); Stage 2 must force them back to the grammar's
        // literal text rather than leave the corrupted byte standing.
        let mut chars = ConfidentString::certain(b"-WXR-TOR-029095+0030-2081645-KEAX/NWS-")
            .chars()
            .to_vec();
        for &ix in &[0usize, 4, 8, 15, 20, 28, 33, 37] {
            chars[ix] = ConfidentCharacter::from_bits(b'_', [1; 8]);
        }
        let noisy = SameHeader::from_raw(ConfidentString::new(chars), Instant::now());
        let scrubber = MessageScrubber::new(&[noisy], Some(&["029095"]), None);
        let scrubbed = scrubber.scrub().unwrap();
        assert_eq!(scrubbed.corrected_text, "-WXR-TOR-029095+0030-2081645-KEAX/NWS-");
    }

    #[test]
    fn issue_time_is_substituted_from_received_time() {
        let raw = "-WXR-TOR-029095+0030-0000000-KEAX/NWS-";
        let mut chars = ConfidentString::certain(raw.as_bytes()).chars().to_vec();
        // blank out the issue-time digits entirely (zero confidence) so
        // only the Stage-3 issue-time candidates can fill them in
        for ix in 21..28 {
            chars[ix] = ConfidentCharacter::null();
        }
        let noisy = SameHeader::from_raw(ConfidentString::new(chars), Instant::now());
        let scrubber = MessageScrubber::new(&[noisy], Some(&["029095"]), Some("KEAX"));
        let scrubbed = scrubber.scrub().unwrap();
        assert_eq!(scrubbed.issue_time.len(), 7);
        assert_ne!(scrubbed.issue_time, "0000000");
        assert_eq!(scrubbed.wfo, "KEAX");
    }
}
