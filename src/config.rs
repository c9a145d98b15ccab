//! Driver configuration: the property values and power-up behavior
//! applied when the driver starts.

use crate::property::PropertyId;
use serde::{Deserialize, Serialize};

/// A base64-encoded, zlib-compressed firmware patch plus the revision id
/// it is expected to produce once applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchPayload {
    pub base64_zlib: String,
    pub expected_patch_id: u16,
}

/// Tunables applied at power-up, mirroring the original driver's default
/// configuration dictionary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverConfig {
    /// Whether to enable the crystal oscillator during `PowerUp`
    /// (`crystal_oscillator_enable` in the original).
    pub crystal_oscillator_enable: bool,

    /// Properties applied via `SetProperty` immediately after power-up,
    /// in addition to each property's own hardware default.
    pub properties: Vec<(PropertyId, u16)>,

    /// Firmware patch to stream in before issuing `GetRevision`, if any.
    pub patch: Option<PatchPayload>,

    /// Frequency in whole kHz to tune to once the chip reports
    /// ready-to-tune, if any. Takes precedence over `transmitter`.
    pub tune_to_khz: Option<u32>,

    /// A known transmitter to tune to and validate received SAME headers
    /// against, by call sign (see [`crate::same::transmitter`]). Used for
    /// `tune_to_khz` when that field is unset, and for the known-county
    /// pool the message scrubber validates FIPS codes against.
    pub transmitter: Option<String>,

    /// Command queue capacity; exceeding it returns `Si4707Error::QueueFull`
    /// rather than blocking the caller.
    pub command_queue_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            crystal_oscillator_enable: true,
            properties: vec![
                (PropertyId::RxVolume, PropertyId::RxVolume.default_value()),
                (PropertyId::WbSameInterruptSource, 0x0001),
                (PropertyId::WbAsqIntSource, 0x0001),
                (PropertyId::WbRsqIntSource, 0x0001),
            ],
            patch: None,
            tune_to_khz: None,
            transmitter: None,
            command_queue_capacity: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_oscillator_and_same_interrupts() {
        let cfg = DriverConfig::default();
        assert!(cfg.crystal_oscillator_enable);
        assert!(cfg
            .properties
            .iter()
            .any(|&(id, _)| id == PropertyId::WbSameInterruptSource));
    }

    #[test]
    fn default_queue_capacity_matches_original() {
        assert_eq!(DriverConfig::default().command_queue_capacity, 50);
    }

    #[test]
    fn default_config_has_no_transmitter_or_patch() {
        let cfg = DriverConfig::default();
        assert!(cfg.transmitter.is_none());
        assert!(cfg.patch.is_none());
    }
}
