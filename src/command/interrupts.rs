//! The three interrupt-servicing commands the driver core injects ahead
//! of user commands whenever the status byte reports a pending
//! interrupt: `ReceivedSignalQualityCheck`, `AlertToneCheck`, and
//! `SameInterruptCheck`.

use super::{wait_for_clear_to_send, CommandOutcome, ExecutionContext};
use crate::error::Si4707Error;
use crate::hardware::HardwareContext;
use std::time::Duration;

const OPCODE_WB_RSQ_STATUS: u8 = 0x53;
const OPCODE_WB_SAME_STATUS: u8 = 0x54;
const OPCODE_WB_ASQ_STATUS: u8 = 0x55;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedSignalQuality {
    pub rssi_dbuv: i8,
    pub snr_db: i8,
    pub frequency_offset: i8,
    pub afc_rail: bool,
    pub valid_channel: bool,
    pub snr_high: bool,
    pub snr_low: bool,
    pub rssi_high: bool,
    pub rssi_low: bool,
}

pub(super) fn execute_rsq_check<H: HardwareContext>(ctx: &mut H) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_WB_RSQ_STATUS, 0x01])?;
    wait_for_clear_to_send(ctx, Duration::from_millis(100))?;
    let b = ctx.read_bytes(8)?;
    let violations = b[1];
    let validity = b[2];
    Ok(CommandOutcome::ReceivedSignalQuality(ReceivedSignalQuality {
        rssi_dbuv: b[4] as i8,
        snr_db: b[5] as i8,
        frequency_offset: b[6] as i8,
        afc_rail: violations & 0x02 != 0,
        valid_channel: validity & 0x01 != 0,
        snr_high: violations & 0x08 != 0,
        snr_low: violations & 0x04 != 0,
        rssi_high: violations & 0x20 != 0,
        rssi_low: violations & 0x10 != 0,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertToneReading {
    pub present: bool,
    pub history: bool,
}

pub(super) fn execute_alert_tone_check<H: HardwareContext>(
    ctx: &mut H,
    exec: &mut ExecutionContext,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_WB_ASQ_STATUS, 0x01])?;
    wait_for_clear_to_send(ctx, Duration::from_millis(100))?;
    let b = ctx.read_bytes(3)?;
    let present = b[1] & 0x01 != 0;
    let history = b[1] & 0x02 != 0;

    if present && exec.tone_start.is_none() {
        *exec.tone_start = Some(std::time::Instant::now());
    } else if !present && exec.tone_start.is_some() {
        *exec.tone_start = None;
    }

    Ok(CommandOutcome::AlertTone(AlertToneReading { present, history }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SameInterruptReading {
    pub end_of_message: bool,
    pub start_of_message: bool,
    pub preamble_detected: bool,
    pub header_ready: bool,
    pub state: u8,
    pub message_length: u8,
    pub confidence: [u8; 8],
    pub message: [u8; 8],
}

pub(super) fn execute_same_interrupt_check<H: HardwareContext>(
    ctx: &mut H,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    // clear buffer (bit1) + interrupt-ack (bit0), read from offset 0
    ctx.write_bytes(&[OPCODE_WB_SAME_STATUS, 0x01, 0x00])?;
    wait_for_clear_to_send(ctx, Duration::from_millis(100))?;
    let b = ctx.read_bytes(14)?;

    let flags = b[1];
    let mut confidence = [0u8; 8];
    for (i, slot) in confidence.iter_mut().enumerate() {
        let byte = if i < 4 { b[5] } else { b[4] };
        let shift = (i % 4) * 2;
        *slot = (byte >> shift) & 0x3;
    }
    let mut message = [0u8; 8];
    message.copy_from_slice(&b[6..14]);

    Ok(CommandOutcome::SameInterrupt(SameInterruptReading {
        end_of_message: flags & 0x08 != 0,
        start_of_message: flags & 0x04 != 0,
        preamble_detected: flags & 0x02 != 0,
        header_ready: flags & 0x01 != 0,
        state: b[2],
        message_length: b[3],
        confidence,
        message,
    }))
}
