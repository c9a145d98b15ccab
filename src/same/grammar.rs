//! The SAME header grammar: fixed literals, weighted code tables, and the
//! shell-candidate lengths used to infer how many FIPS codes a truncated
//! header actually carries.
//!
//! Grammar: `-ORIG-EVT-FIPS(-FIPS){0..30}+DDDD-JJJHHMM-WFOC/NWS-`

/// The four possible originator codes.
pub const ORIGINATORS: &[&str] = &["EAS", "CIV", "WXR", "PEP"];

/// `(description, code)` pairs for every SAME event type this driver
/// recognizes, carried over from the reference decoder's event table.
pub const EVENT_TYPES: &[(&str, &str)] = &[
    ("Blizzard Warning", "BZW"),
    ("Coastal Flood Watch", "CFA"),
    ("Coastal Flood Warning", "CFW"),
    ("Dust Storm Warning", "DSW"),
    ("Flash Flood Watch", "FFA"),
    ("Flash Flood Warning", "FFW"),
    ("Flash Flood Statement", "FFS"),
    ("Flood Watch", "FLA"),
    ("Flood Warning", "FLW"),
    ("Flood Statement", "FLS"),
    ("High Wind Watch", "HWA"),
    ("High Wind Warning", "HWW"),
    ("Hurricane Watch", "HUA"),
    ("Hurricane Warning", "HUW"),
    ("Hurricane Statement", "HLS"),
    ("Severe Thunderstorm Watch", "SVA"),
    ("Severe Thunderstorm Warning", "SVR"),
    ("Severe Weather Statement", "SVS"),
    ("Special Marine Warning", "SMW"),
    ("Special Weather Statement", "SPS"),
    ("Tornado Watch", "TOA"),
    ("Tornado Warning", "TOR"),
    ("Tropical Storm Watch", "TRA"),
    ("Tropical Storm Warning", "TRW"),
    ("Tsunami Watch", "TSA"),
    ("Tsunami Warning", "TSW"),
    ("Winter Storm Watch", "WSA"),
    ("Winter Storm Warning", "WSW"),
    ("Emergency Action Notification", "EAN"),
    ("Emergency Action Termination", "EAT"),
    ("National Information Center", "NIC"),
    ("National Periodic Test", "NPT"),
    ("Required Monthly Test", "RMT"),
    ("Required Weekly Test", "RWT"),
    ("Administrative Message", "ADR"),
    ("Avalanche Watch", "AVA"),
    ("Avalanche Warning", "AVW"),
    ("Child Abduction Emergency", "CAE"),
    ("Civil Danger Warning", "CDW"),
    ("Civil Emergency Message", "CEM"),
    ("Earthquake Warning", "EQW"),
    ("Evacuation Immediate", "EVI"),
    ("Fire Warning", "FRW"),
    ("Hazardous Materials Warning", "HMW"),
    ("Law Enforcement Warning", "LEW"),
    ("Local Area Emergency", "LAE"),
    ("911 Telephone Outage Emergency", "TOE"),
    ("Nuclear Power Plant Warning", "NUW"),
    ("Radiological Hazard Warning", "RHW"),
    ("Shelter in Place Warning", "SPW"),
    ("Volcano Warning", "VOW"),
    ("Network Message Notification", "NMN"),
    ("Practice/Demo Warning", "DMO"),
    ("Transmitter Carrier Off", "TXF"),
    ("Transmitter Carrier On", "TXO"),
    ("Transmitter Backup On", "TXB"),
    ("Transmitter Primary On", "TXP"),
];

/// `(weight, code)` pairs for valid duration codes (`DDDD` field),
/// weighted toward the durations the original transmitters use most.
pub const VALID_DURATIONS: &[(f64, &str)] = &[
    (1.0, "0015"),
    (1.0, "0030"),
    (1.1, "0045"),
    (1.1, "0100"),
    (1.0, "0130"),
    (1.1, "0200"),
    (1.0, "0230"),
    (1.1, "0300"),
    (0.9, "0330"),
    (1.1, "0400"),
    (0.9, "0430"),
    (1.1, "0500"),
    (0.9, "0530"),
    (1.1, "0600"),
];

/// Literal tail of every header: `+0___-_______-____/NWS-` with the
/// variable slots as true nulls (`\0`), used as an override template once
/// the shell length is known.
pub const END_SEQUENCE: &str = "+0\0\0\0-\0\0\0\0\0\0\0-\0\0\0\0/NWS-";

/// Literal head of every header up to the first FIPS code.
pub const START_SEQUENCE: &str = "-\0\0\0-\0\0\0";

/// One repeated FIPS slot: a dash plus six digits.
pub const COUNTY_SEQUENCE: &str = "-\0\0\0\0\0\0";

/// Builds the fixed-literal template for a header carrying `county_count`
/// FIPS codes: every known-fixed character (`-`, `+`, `/`, `NWS`) in
/// place, every data position a true null (`\0`) to be skipped by
/// `ConfidentString::override_with`.
pub fn override_template(county_count: u32) -> Vec<u8> {
    let mut shell = String::new();
    shell.push_str(START_SEQUENCE);
    for _ in 0..county_count {
        shell.push_str(COUNTY_SEQUENCE);
    }
    shell.push_str(END_SEQUENCE);
    shell.into_bytes()
}

/// Builds the `(weight, shell)` candidates for 1..=31 FIPS codes. Every
/// candidate is equally likely a priori; `fix_length` picks the one
/// closest to what was actually received.
pub fn shell_candidates() -> Vec<(f64, Vec<u8>)> {
    (1..=31u32)
        .map(|county_count| {
            let mut shell = override_template(county_count);
            // trailing padding so distance comparisons never go negative
            // when matching against a longer noisy header
            shell.extend(std::iter::repeat(0u8).take(9));
            (1.0, shell)
        })
        .collect()
}

pub fn originator_candidates() -> Vec<(f64, Vec<u8>)> {
    ORIGINATORS.iter().map(|&o| (1.0, o.as_bytes().to_vec())).collect()
}

pub fn event_type_candidates() -> Vec<(f64, Vec<u8>)> {
    EVENT_TYPES
        .iter()
        .map(|&(_, code)| (1.0, code.as_bytes().to_vec()))
        .collect()
}

pub fn duration_candidates() -> Vec<(f64, Vec<u8>)> {
    VALID_DURATIONS
        .iter()
        .map(|&(weight, code)| (weight, code.as_bytes().to_vec()))
        .collect()
}

/// Offsets (minutes, relative to `received_at`) and weights for the
/// issue-time candidates, favoring a timestamp issued shortly before the
/// header was actually received.
const ISSUE_TIME_OFFSETS_MINUTES: [i64; 5] = [-4, -3, -2, -1, 0];
const ISSUE_TIME_WEIGHTS: [f64; 5] = [0.5, 0.7, 0.9, 1.1, 1.0];

/// Formats a Julian-minute timestamp (`JJJHHMM`: 3-digit day-of-year,
/// 2-digit hour, 2-digit minute) for the issue-time field.
fn julian_minute_timestamp(t: chrono::DateTime<chrono::Utc>) -> String {
    use chrono::{Datelike, Timelike};
    format!("{:03}{:02}{:02}", t.ordinal(), t.hour(), t.minute())
}

/// Builds the five Julian-minute issue-time candidates at offsets
/// {-4, -3, -2, -1, 0} minutes from `received_at`.
pub fn issue_time_candidates(received_at: chrono::DateTime<chrono::Utc>) -> Vec<(f64, Vec<u8>)> {
    ISSUE_TIME_OFFSETS_MINUTES
        .iter()
        .zip(ISSUE_TIME_WEIGHTS.iter())
        .map(|(&offset, &weight)| {
            let t = received_at + chrono::Duration::minutes(offset);
            (weight, julian_minute_timestamp(t).into_bytes())
        })
        .collect()
}

pub fn event_description(code: &str) -> Option<&'static str> {
    EVENT_TYPES.iter().find(|&&(_, c)| c == code).map(|&(d, _)| d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_candidates_cover_one_to_thirty_one_counties() {
        let shells = shell_candidates();
        assert_eq!(shells.len(), 31);
    }

    #[test]
    fn event_description_lookup() {
        assert_eq!(event_description("TOR"), Some("Tornado Warning"));
        assert_eq!(event_description("ZZZ"), None);
    }

    #[test]
    fn duration_table_has_fourteen_entries() {
        assert_eq!(VALID_DURATIONS.len(), 14);
    }

    #[test]
    fn override_template_places_fixed_literals_and_nulls() {
        let template = override_template(1);
        assert_eq!(template[0], b'-');
        assert_eq!(template[4], b'-');
        assert_eq!(template[1], 0);
        assert_eq!(template.len(), 8 + 7 + END_SEQUENCE.len());
    }

    #[test]
    fn issue_time_candidates_cover_five_offsets_with_julian_format() {
        use chrono::TimeZone;
        let t = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 12, 5, 0).unwrap();
        let candidates = issue_time_candidates(t);
        assert_eq!(candidates.len(), 5);
        // 0 minutes offset is the last candidate: day-of-year 002, 12:05
        let (weight, bytes) = &candidates[4];
        assert_eq!(*weight, 1.0);
        assert_eq!(bytes, b"0021205");
        // -4 minutes offset is the first candidate: 12:01
        let (weight, bytes) = &candidates[0];
        assert_eq!(*weight, 0.5);
        assert_eq!(bytes, b"0021201");
    }
}
