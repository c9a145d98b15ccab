//! `GetAGCStatus` / `SetAGCStatus`.

use super::{wait_for_clear_to_send, CommandOutcome};
use crate::error::Si4707Error;
use crate::hardware::HardwareContext;
use std::time::Duration;

const OPCODE_GET_AGC_STATUS: u8 = 0x57;
const OPCODE_SET_AGC_STATUS: u8 = 0x58;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgcStatus {
    pub agc_disabled: bool,
}

pub(super) fn execute_get_agc_status<H: HardwareContext>(
    ctx: &mut H,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_GET_AGC_STATUS])?;
    wait_for_clear_to_send(ctx, Duration::from_millis(100))?;
    let b = ctx.read_bytes(2)?;
    Ok(CommandOutcome::AgcStatus(AgcStatus {
        agc_disabled: b[1] & 0x01 != 0,
    }))
}

pub(super) fn execute_set_agc_status<H: HardwareContext>(
    ctx: &mut H,
    agc_disable: bool,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_SET_AGC_STATUS, agc_disable as u8])?;
    wait_for_clear_to_send(ctx, Duration::from_millis(100))?;
    Ok(CommandOutcome::Unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockHardwareContext;

    #[test]
    fn get_agc_status_decodes_disabled_bit() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80]);
        ctx.queue_read(&[0x80, 0x01]);
        let outcome = execute_get_agc_status(&mut ctx).unwrap();
        match outcome {
            CommandOutcome::AgcStatus(s) => assert!(s.agc_disabled),
            _ => panic!("wrong outcome"),
        }
    }
}
