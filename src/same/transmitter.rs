//! Known NOAA Weather Radio transmitters: the counties each one serves,
//! its issuing Weather Forecast Office, and its broadcast frequency.
//!
//! Used to validate the FIPS codes and WFO identifier recovered from a
//! received header against what a specific, already-tuned transmitter is
//! actually expected to send.

/// A single registered transmitter.
#[derive(Debug, Clone, Copy)]
pub struct Transmitter {
    pub call_sign: &'static str,
    pub counties: &'static [&'static str],
    pub wfo: &'static str,
    pub frequency_khz: u32,
}

pub const TRANSMITTERS: &[Transmitter] = &[
    Transmitter {
        call_sign: "WXL58",
        counties: &[
            "020045", "020091", "020103", "020121", "020209", "029037", "029047", "029095",
            "029101", "029107", "029165", "029177",
        ],
        wfo: "KEAX",
        frequency_khz: 162_550,
    },
    Transmitter {
        call_sign: "WXL29",
        counties: &[
            "020045", "020091", "020103", "020121", "020209", "029037", "029047", "029095",
            "029101", "029107", "029165", "029177",
        ],
        wfo: "KEAX",
        frequency_khz: 162_550,
    },
    Transmitter {
        call_sign: "WNG706",
        counties: &[
            "020045", "020091", "020103", "020121", "020209", "029037", "029047", "029095",
            "029101", "029107", "029165", "029177",
        ],
        wfo: "KEAX",
        frequency_khz: 162_550,
    },
    Transmitter {
        call_sign: "KID77",
        counties: &[
            "020045", "020091", "020103", "020121", "020209", "029037", "029047", "029095",
            "029101", "029107", "029165", "029177",
        ],
        wfo: "KEAX",
        frequency_khz: 162_550,
    },
];

pub fn by_call_sign(call_sign: &str) -> Option<&'static Transmitter> {
    TRANSMITTERS.iter().find(|t| t.call_sign == call_sign)
}

pub fn counties_for(call_sign: &str) -> Option<&'static [&'static str]> {
    by_call_sign(call_sign).map(|t| t.counties)
}

pub fn wfo_for(call_sign: &str) -> Option<&'static str> {
    by_call_sign(call_sign).map(|t| t.wfo)
}

pub fn frequency_for(call_sign: &str) -> Option<u32> {
    by_call_sign(call_sign).map(|t| t.frequency_khz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_transmitter() {
        let t = by_call_sign("WXL58").unwrap();
        assert_eq!(t.wfo, "KEAX");
        assert_eq!(t.frequency_khz, 162_550);
        assert!(t.counties.contains(&"029037"));
    }

    #[test]
    fn unknown_call_sign_is_none() {
        assert!(by_call_sign("NOPE").is_none());
    }
}
