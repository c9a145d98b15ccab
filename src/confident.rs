//! Confidence-weighted bytes and strings: the core representation used to
//! merge multiple noisy copies of a SAME header into one corrected message.

use crate::error::ScrubError;

const MAX_BIT_WEIGHT: u8 = 3;
const MAX_CHAR_WEIGHT: u32 = MAX_BIT_WEIGHT as u32 * 8;

/// A single byte paired with a per-bit confidence weight (0..=3 per bit,
/// as reported by the chip; merged values may run higher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidentCharacter {
    byte: u8,
    bit_weight: [u8; 8],
}

impl ConfidentCharacter {
    /// A byte this driver is fully confident in (a literal, e.g. from the
    /// fixed grammar text `-EAS-`).
    pub fn certain(byte: u8) -> Self {
        ConfidentCharacter {
            byte,
            bit_weight: [MAX_BIT_WEIGHT; 8],
        }
    }

    /// The true null: byte 0x00 with zero confidence, used for padding
    /// and as the "no information yet" placeholder.
    pub fn null() -> Self {
        ConfidentCharacter {
            byte: 0,
            bit_weight: [0; 8],
        }
    }

    pub fn from_bits(byte: u8, bit_weight: [u8; 8]) -> Self {
        ConfidentCharacter { byte, bit_weight }
    }

    pub fn byte(self) -> u8 {
        self.byte
    }

    /// The per-bit confidence vector backing this character, as reported
    /// by the chip (or accumulated through `merge`).
    pub fn bit_weight(self) -> [u8; 8] {
        self.bit_weight
    }

    pub fn is_null(self) -> bool {
        self.byte == 0 && self.raw_weight_sum() == 0
    }

    /// Character-level confidence, 0..=9 (sum of bit weights collapsed to
    /// one decimal-ish scale, clamped).
    pub fn confidence(self) -> u8 {
        ((self.raw_weight_sum() / 8) as u8).min(9)
    }

    fn raw_weight_sum(self) -> u32 {
        self.bit_weight.iter().map(|&w| w as u32).sum()
    }

    fn signed_bit(self, i: usize) -> i16 {
        let w = self.bit_weight[i] as i16;
        if (self.byte >> i) & 1 == 1 {
            w
        } else {
            -w
        }
    }

    /// Bitwise-weighted merge of two independent readings of the same
    /// byte position.
    pub fn merge(self, other: Self) -> Self {
        let mut byte = 0u8;
        let mut bit_weight = [0u8; 8];
        for i in 0..8 {
            let total = self.signed_bit(i) + other.signed_bit(i);
            if total > 0 {
                byte |= 1 << i;
            }
            bit_weight[i] = total.unsigned_abs().min(u8::MAX as i16) as u8;
        }
        ConfidentCharacter { byte, bit_weight }
    }

    /// Distance used when comparing this character to a plain candidate
    /// byte: the sum of the bitwise confidences that contradict
    /// `candidate`'s bits. A candidate of 0x00 (null shell position) is
    /// never in contradiction and costs nothing.
    pub fn confidence_distance_to(self, candidate: u8) -> u32 {
        if candidate == 0 {
            return 0;
        }
        (0..8)
            .filter(|i| (self.byte >> i) & 1 != (candidate >> i) & 1)
            .map(|i| self.bit_weight[i] as u32)
            .sum()
    }

    /// Replace this character with `other`'s byte, unless `other` is a
    /// null placeholder (in which case our own reading is kept). Bits
    /// that flip keep zero confidence; unchanged bits keep ours.
    pub fn override_with(self, other: Self) -> Self {
        if other.is_null() {
            return self;
        }
        if other.byte == self.byte {
            return self;
        }
        let mut bit_weight = [0u8; 8];
        for i in 0..8 {
            if (self.byte >> i) & 1 == (other.byte >> i) & 1 {
                bit_weight[i] = self.bit_weight[i];
            }
        }
        ConfidentCharacter {
            byte: other.byte,
            bit_weight,
        }
    }
}

impl std::ops::BitAnd for ConfidentCharacter {
    type Output = ConfidentCharacter;
    fn bitand(self, rhs: Self) -> Self::Output {
        self.merge(rhs)
    }
}

/// A sequence of [`ConfidentCharacter`]s: the reconstructed form of one
/// SAME header (or a slice of the grammar used as a match candidate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidentString(Vec<ConfidentCharacter>);

impl ConfidentString {
    pub fn new(chars: Vec<ConfidentCharacter>) -> Self {
        ConfidentString(chars)
    }

    /// Builds a fully-confident string from plain bytes, e.g. for grammar
    /// literals and match candidates.
    pub fn certain(bytes: &[u8]) -> Self {
        ConfidentString(bytes.iter().map(|&b| ConfidentCharacter::certain(b)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn chars(&self) -> &[ConfidentCharacter] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<ConfidentCharacter> {
        self.0.get(index).copied()
    }

    pub fn slice(&self, start: usize, end: usize) -> ConfidentString {
        ConfidentString(self.0[start..end.min(self.0.len())].to_vec())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().map(|c| c.byte()).collect()
    }

    pub fn concat(&self, other: &ConfidentString) -> ConfidentString {
        let mut v = self.0.clone();
        v.extend_from_slice(&other.0);
        ConfidentString(v)
    }

    /// Bitwise merge of two independently-received copies of the same
    /// logical string. Shorter operand is padded with null characters.
    pub fn merge(&self, other: &ConfidentString) -> ConfidentString {
        let len = self.0.len().max(other.0.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or_else(ConfidentCharacter::null);
            let b = other.0.get(i).copied().unwrap_or_else(ConfidentCharacter::null);
            out.push(a.merge(b));
        }
        ConfidentString(out)
    }

    /// How far this string is from a plain candidate: per-position
    /// mismatches cost the confidence we had in our own reading, missing
    /// trailing characters (candidate longer than self) cost the maximum
    /// possible confidence per character, and extra trailing characters in
    /// self (self longer than candidate) cost their own confidence too.
    pub fn confidence_distance_to(&self, candidate: &[u8]) -> u32 {
        let common = self.0.len().min(candidate.len());
        let mut distance = 0u32;
        for i in 0..common {
            distance += self.0[i].confidence_distance_to(candidate[i]);
        }
        if candidate.len() > self.0.len() {
            distance += MAX_CHAR_WEIGHT * (candidate.len() - self.0.len()) as u32;
        } else if self.0.len() > candidate.len() {
            for c in &self.0[common..] {
                distance += c.raw_weight_sum();
            }
        }
        distance
    }

    /// Overwrite each position with `valid`'s character, except positions
    /// where `valid` holds a null placeholder (those keep our reading).
    pub fn override_with(&self, valid: &ConfidentString) -> ConfidentString {
        let len = self.0.len().max(valid.0.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or_else(ConfidentCharacter::null);
            let b = valid.0.get(i).copied().unwrap_or_else(ConfidentCharacter::null);
            out.push(a.override_with(b));
        }
        ConfidentString(out)
    }

    /// The median of this string's per-character byte-wise confidences.
    pub fn median_confidence(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let mut values: Vec<f64> = self.0.iter().map(|c| c.confidence() as f64).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        }
    }

    /// Picks the best-matching candidate from a weighted list (weight
    /// discounts distance — a more "expected" candidate needs less
    /// evidence to win). Substitution only happens if the best candidate's
    /// effective distance is strictly less than the second-best's, and
    /// less than `max(4, median(confidence))` — otherwise `self` is
    /// returned unchanged. Ties for best raise [`ScrubError::Ambiguous`].
    pub fn closest(&self, candidates: &[(f64, Vec<u8>)]) -> Result<ConfidentString, ScrubError> {
        if candidates.is_empty() {
            return Ok(self.clone());
        }
        let mut scored: Vec<(f64, &Vec<u8>)> = candidates
            .iter()
            .map(|(weight, bytes)| {
                let distance = self.confidence_distance_to(bytes) as f64;
                ((1.0 + distance) / weight, bytes)
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let (best_score, best_bytes) = scored[0];
        if scored.len() > 1 && (scored[1].0 - best_score).abs() < f64::EPSILON {
            return Err(ScrubError::Ambiguous);
        }
        let threshold = self.median_confidence().max(4.0);
        if best_score >= threshold {
            return Ok(self.clone());
        }
        Ok(ConfidentString::certain(best_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_agrees_increases_confidence() {
        let a = ConfidentCharacter::certain(b'A');
        let b = ConfidentCharacter::certain(b'A');
        let m = a.merge(b);
        assert_eq!(m.byte(), b'A');
        assert_eq!(m.confidence(), 6);
    }

    #[test]
    fn merge_disagreement_favors_more_confident_side() {
        let strong = ConfidentCharacter::certain(b'A');
        let weak = ConfidentCharacter::from_bits(b'B', [1; 8]);
        let m = strong.merge(weak);
        assert_eq!(m.byte(), b'A');
    }

    #[test]
    fn null_is_null() {
        assert!(ConfidentCharacter::null().is_null());
        assert!(!ConfidentCharacter::certain(0).is_null());
    }

    #[test]
    fn string_merge_pads_and_combines() {
        let a = ConfidentString::certain(b"EAS");
        let b = ConfidentString::certain(b"EA");
        let m = a.merge(&b);
        assert_eq!(m.len(), 3);
        assert_eq!(m.to_bytes(), b"EAS");
    }

    #[test]
    fn distance_to_identical_candidate_is_zero() {
        let s = ConfidentString::certain(b"EAS");
        assert_eq!(s.confidence_distance_to(b"EAS"), 0);
    }

    #[test]
    fn distance_penalizes_missing_suffix() {
        let s = ConfidentString::certain(b"EA");
        let d = s.confidence_distance_to(b"EAS");
        assert!(d > 0);
    }

    #[test]
    fn override_skips_null_positions() {
        let original = ConfidentString::certain(b"EAS");
        let mut valid_chars = ConfidentString::certain(b"EAS").chars().to_vec();
        valid_chars[1] = ConfidentCharacter::null();
        let valid = ConfidentString::new(valid_chars);
        let result = original.override_with(&valid);
        assert_eq!(result.to_bytes(), b"EAS");
    }

    #[test]
    fn closest_picks_nearest_weighted_candidate() {
        // Weaken the last character so it sits one contradicting bit away
        // from "EAY" and much further from "CIV".
        let mut chars = ConfidentString::certain(b"EAX").chars().to_vec();
        chars[2] = ConfidentCharacter::from_bits(b'X', [1; 8]);
        let s = ConfidentString::new(chars);
        let candidates = vec![(1.0, b"EAY".to_vec()), (1.0, b"CIV".to_vec())];
        let result = s.closest(&candidates).unwrap();
        assert_eq!(result.to_bytes(), b"EAY");
    }

    #[test]
    fn closest_leaves_string_unchanged_beyond_threshold() {
        let s = ConfidentString::certain(b"ZZZ");
        let candidates = vec![(1.0, b"EAS".to_vec())];
        let result = s.closest(&candidates).unwrap();
        assert_eq!(result.to_bytes(), b"ZZZ");
    }
}
