//! `TuneFrequency` (WB_TUNE_FREQ) and `TuneStatus` (WB_TUNE_STATUS).

use super::{wait_for_clear_to_send, CommandOutcome, ExecutionContext};
use crate::error::Si4707Error;
use crate::hardware::HardwareContext;
use std::time::Duration;

const OPCODE_WB_TUNE_FREQ: u8 = 0x50;
const OPCODE_WB_TUNE_STATUS: u8 = 0x52;
const OPCODE_GET_INT_STATUS: u8 = 0x14;

const MIN_FREQ_CODE: u16 = 64_960; // 162.400 MHz * 400
const MAX_FREQ_CODE: u16 = 65_020; // 162.550 MHz * 400

const SEEK_TUNE_POLL_INTERVAL: Duration = Duration::from_millis(20);
const SEEK_TUNE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn freq_code_from_mhz(mhz: f64) -> Result<u16, Si4707Error> {
    let code = (400.0 * mhz + 0.5) as i64;
    if !(MIN_FREQ_CODE as i64..=MAX_FREQ_CODE as i64).contains(&code) {
        return Err(Si4707Error::ValueOutOfRange {
            field: "frequency_mhz",
            value: mhz.to_string(),
        });
    }
    Ok(code as u16)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuneStatus {
    pub freq_code: u16,
    pub rssi_dbuv: i8,
    pub snr_db: i8,
}

impl TuneStatus {
    pub fn frequency_mhz(self) -> f64 {
        self.freq_code as f64 / 400.0
    }
}

pub(super) fn execute_tune_frequency<H: HardwareContext>(
    ctx: &mut H,
    freq_code: u16,
    exec: &mut ExecutionContext,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    if !(MIN_FREQ_CODE..=MAX_FREQ_CODE).contains(&freq_code) {
        return Err(Si4707Error::ValueOutOfRange {
            field: "freq_code",
            value: freq_code.to_string(),
        });
    }

    if let Some(ready_at) = *exec.tune_after {
        let now = std::time::Instant::now();
        if ready_at > now {
            std::thread::sleep(ready_at - now);
        }
    }

    let bytes = freq_code.to_be_bytes();
    ctx.write_bytes(&[OPCODE_WB_TUNE_FREQ, 0x00, bytes[0], bytes[1]])?;
    wait_for_clear_to_send(ctx, Duration::from_secs(1))?;

    let start = std::time::Instant::now();
    loop {
        ctx.write_bytes(&[OPCODE_GET_INT_STATUS])?;
        let status = wait_for_clear_to_send(ctx, Duration::from_millis(100))?;
        if status.is_seek_tune_complete() {
            break;
        }
        if start.elapsed() >= SEEK_TUNE_TIMEOUT {
            return Err(Si4707Error::NotClearToSend(SEEK_TUNE_TIMEOUT));
        }
        std::thread::sleep(SEEK_TUNE_POLL_INTERVAL);
    }

    let status = read_tune_status(ctx, true)?;
    if status.freq_code != freq_code {
        return Err(Si4707Error::TuneMismatch {
            requested: freq_code,
            echoed: status.freq_code,
        });
    }
    Ok(CommandOutcome::TuneStatus(status))
}

fn read_tune_status<H: HardwareContext>(ctx: &mut H, intack: bool) -> Result<TuneStatus, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_WB_TUNE_STATUS, intack as u8])?;
    wait_for_clear_to_send(ctx, Duration::from_secs(1))?;
    let bytes = ctx.read_bytes(6)?;
    Ok(TuneStatus {
        freq_code: u16::from_be_bytes([bytes[2], bytes[3]]),
        rssi_dbuv: bytes[4] as i8,
        snr_db: bytes[5] as i8,
    })
}

pub(super) fn execute_tune_status<H: HardwareContext>(
    ctx: &mut H,
    intack: bool,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    Ok(CommandOutcome::TuneStatus(read_tune_status(ctx, intack)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freq_code_rejects_out_of_band() {
        assert!(freq_code_from_mhz(150.0).is_err());
        assert!(freq_code_from_mhz(162.55).is_ok());
    }

    #[test]
    fn freq_code_rounds_to_nearest() {
        assert_eq!(freq_code_from_mhz(162.400).unwrap(), MIN_FREQ_CODE);
        assert_eq!(freq_code_from_mhz(162.550).unwrap(), MAX_FREQ_CODE);
    }

    #[test]
    fn frequency_mhz_round_trips_freq_code() {
        let status = TuneStatus {
            freq_code: 65020,
            rssi_dbuv: 10,
            snr_db: 5,
        };
        assert!((status.frequency_mhz() - 162.55).abs() < 1e-9);
    }
}
