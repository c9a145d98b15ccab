//! The Si4707 property catalog: 16-bit property codes, their defaults, and
//! the range each one accepts.

use crate::error::Si4707Error;
use serde::{Deserialize, Serialize};

/// A property identifier as used by `SetProperty`/`GetProperty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum PropertyId {
    GpoIen = 0x0001,
    RefclkFreq = 0x0201,
    RefclkPrescale = 0x0202,
    RxVolume = 0x4000,
    RxHardMute = 0x4001,
    WbRsqIntSource = 0x4200,
    WbRsqSnrHiThreshold = 0x4204,
    WbRsqSnrLoThreshold = 0x4205,
    WbRsqRssiHiThreshold = 0x4206,
    WbRsqRssiLoThreshold = 0x4207,
    WbValidSnrThreshold = 0x4403,
    WbValidRssiThreshold = 0x4404,
    WbSameInterruptSource = 0x5400,
    WbAsqIntSource = 0x5500,
    WbMaxTuneError = 0x5108,
}

impl PropertyId {
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Entry in the property catalog, or `None` for a code this driver
    /// does not recognize (still permitted — `GetProperty`/`SetProperty`
    /// accept raw codes too).
    pub fn from_code(code: u16) -> Option<Self> {
        use PropertyId::*;
        Some(match code {
            0x0001 => GpoIen,
            0x0201 => RefclkFreq,
            0x0202 => RefclkPrescale,
            0x4000 => RxVolume,
            0x4001 => RxHardMute,
            0x4200 => WbRsqIntSource,
            0x4204 => WbRsqSnrHiThreshold,
            0x4205 => WbRsqSnrLoThreshold,
            0x4206 => WbRsqRssiHiThreshold,
            0x4207 => WbRsqRssiLoThreshold,
            0x4403 => WbValidSnrThreshold,
            0x4404 => WbValidRssiThreshold,
            0x5400 => WbSameInterruptSource,
            0x5500 => WbAsqIntSource,
            0x5108 => WbMaxTuneError,
            _ => return None,
        })
    }

    pub fn default_value(self) -> u16 {
        use PropertyId::*;
        match self {
            GpoIen => 0x0000,
            RefclkFreq => 32768,
            RefclkPrescale => 1,
            RxVolume => 63,
            RxHardMute => 0x0000,
            WbRsqIntSource => 0x0000,
            WbRsqSnrHiThreshold => 0x007F,
            WbRsqSnrLoThreshold => 0x0000,
            WbRsqRssiHiThreshold => 0x007F,
            WbRsqRssiLoThreshold => 0x0000,
            WbValidSnrThreshold => 0x0003,
            WbValidRssiThreshold => 0x0014,
            WbSameInterruptSource => 0x0000,
            WbAsqIntSource => 0x0000,
            WbMaxTuneError => 0x0014,
        }
    }

    /// Mirrors each property's validator lambda in the original catalog.
    pub fn validate(self, value: u16) -> Result<(), Si4707Error> {
        use PropertyId::*;
        let in_range = match self {
            RxVolume => value <= 63,
            RefclkPrescale => (1..=4096).contains(&value),
            WbRsqSnrHiThreshold | WbRsqSnrLoThreshold => value <= 127,
            WbRsqRssiHiThreshold | WbRsqRssiLoThreshold => value <= 127,
            WbValidSnrThreshold => value <= 127,
            WbValidRssiThreshold => value <= 127,
            RxHardMute => value <= 0x0003,
            _ => true,
        };
        if in_range {
            Ok(())
        } else {
            Err(Si4707Error::ValueOutOfRange {
                field: "property_value",
                value: value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_code() {
        assert_eq!(PropertyId::from_code(0x4000), Some(PropertyId::RxVolume));
        assert_eq!(PropertyId::RxVolume.code(), 0x4000);
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(PropertyId::from_code(0xffff), None);
    }

    #[test]
    fn volume_out_of_range_rejected() {
        assert!(PropertyId::RxVolume.validate(64).is_err());
        assert!(PropertyId::RxVolume.validate(63).is_ok());
    }
}
