//! A single received copy of a SAME header, stamped with its receive time.

use crate::confident::{ConfidentCharacter, ConfidentString};
use std::time::Instant;

/// One raw byte as reported by `SameInterruptCheck`'s HDRRDY read: a byte
/// whose high bit is set still carries its low 7 bits of information, and
/// a true 0x00 means "nothing received at this position yet".
fn mask_confident_byte(raw: ConfidentCharacter) -> ConfidentCharacter {
    if raw.byte() == 0 && raw.is_null() {
        raw
    } else {
        ConfidentCharacter::from_bits(raw.byte() & 0x7f, raw.bit_weight())
    }
}

/// One received copy of a SAME header, plus the instant it finished
/// arriving.
#[derive(Debug, Clone)]
pub struct SameHeader {
    content: ConfidentString,
    pub received_at: Instant,
}

impl SameHeader {
    /// Builds a header from the raw confident bytes read off the chip,
    /// masking any byte whose high bit was set by the hardware.
    pub fn from_raw(raw: ConfidentString, received_at: Instant) -> Self {
        let masked: Vec<ConfidentCharacter> =
            raw.chars().iter().map(|&c| mask_confident_byte(c)).collect();
        SameHeader {
            content: ConfidentString::new(masked),
            received_at,
        }
    }

    pub fn content(&self) -> &ConfidentString {
        &self.content
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.content.to_bytes()
    }

    /// Bitwise merge of two headers, keeping the earlier receive time.
    pub fn merge(&self, other: &SameHeader) -> SameHeader {
        SameHeader {
            content: self.content.merge(&other.content),
            received_at: self.received_at.min(other.received_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_bit_is_masked_but_confidence_kept() {
        let raw = ConfidentString::certain(&[0xC5]); // 'E' | 0x80
        let header = SameHeader::from_raw(raw, Instant::now());
        assert_eq!(header.to_bytes(), vec![b'E']);
    }

    #[test]
    fn masking_does_not_flatten_low_confidence_bits() {
        // A weakly-received byte (low per-bit confidence) with its high
        // bit set: masking must not bump every bit back up to max weight.
        let weak = ConfidentCharacter::from_bits(0xC5, [1; 8]);
        let raw = ConfidentString::new(vec![weak]);
        let header = SameHeader::from_raw(raw, Instant::now());
        let masked = header.content().get(0).unwrap();
        assert_eq!(masked.byte(), b'E');
        assert_eq!(masked.bit_weight(), [1; 8]);
    }

    #[test]
    fn zero_byte_stays_null() {
        let raw = ConfidentString::new(vec![ConfidentCharacter::null()]);
        let header = SameHeader::from_raw(raw, Instant::now());
        assert!(header.content().get(0).unwrap().is_null());
    }

    #[test]
    fn merge_keeps_earlier_timestamp() {
        let t0 = Instant::now();
        let h1 = SameHeader::from_raw(ConfidentString::certain(b"EAS"), t0);
        let h2 = SameHeader::from_raw(ConfidentString::certain(b"EAS"), t0 + std::time::Duration::from_secs(1));
        let merged = h1.merge(&h2);
        assert_eq!(merged.received_at, t0);
    }
}
