//! `PowerUp`, `PatchCommand`, `PowerDown`, and `GetRevision`.

use super::{wait_for_clear_to_send, CommandOutcome, ExecutionContext};
use crate::error::Si4707Error;
use crate::hardware::HardwareContext;
use base64::Engine;
use std::io::Read;
use std::time::{Duration, Instant};

const OPCODE_POWER_UP: u8 = 0x01;
const OPCODE_GET_REV: u8 = 0x10;
const OPCODE_POWER_DOWN: u8 = 0x11;

/// How long the crystal oscillator takes to stabilize once enabled.
const OSCILLATOR_STABILIZATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerUpParams {
    pub query_library_id: bool,
    pub crystal_oscillator_enable: bool,
    pub gpo2_output_enable: bool,
    pub opmode: u8,
}

impl Default for PowerUpParams {
    fn default() -> Self {
        PowerUpParams {
            query_library_id: false,
            crystal_oscillator_enable: true,
            gpo2_output_enable: false,
            opmode: 0xB0,
        }
    }
}

/// Builds the `PowerUp` parameters the driver issues on start, from the
/// user-supplied [`crate::config::DriverConfig`].
pub fn power_up_from_config(config: &crate::config::DriverConfig) -> PowerUpParams {
    PowerUpParams {
        query_library_id: false,
        crystal_oscillator_enable: config.crystal_oscillator_enable,
        gpo2_output_enable: false,
        opmode: 0xB0,
    }
}

impl PowerUpParams {
    fn function(self) -> u8 {
        if self.query_library_id {
            15
        } else {
            3
        }
    }

    fn arg1(self) -> u8 {
        let ctsien = 1 << 7;
        let gpo2oen = (self.gpo2_output_enable as u8) << 5;
        let xosc = (self.crystal_oscillator_enable as u8) << 4;
        ctsien | gpo2oen | xosc | (self.function() & 0x0F)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchParams {
    pub power_up: PowerUpParams,
    pub patch: crate::config::PatchPayload,
}

/// Decoded response to `PowerUp { query_library_id: true }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PupRevision {
    pub part_number: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub patch_id: u16,
}

/// Decoded response to `GetRevision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub part_number: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub component_major: u8,
    pub component_minor: u8,
    pub chip_revision: u8,
}

fn parse_pup_revision(bytes: &[u8]) -> Result<PupRevision, Si4707Error> {
    if bytes.len() < 8 {
        return Err(Si4707Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short PUP revision read",
        )));
    }
    Ok(PupRevision {
        part_number: bytes[1],
        firmware_major: bytes[2],
        firmware_minor: bytes[3],
        patch_id: u16::from_be_bytes([bytes[6], bytes[7]]),
    })
}

fn parse_revision(bytes: &[u8]) -> Result<Revision, Si4707Error> {
    if bytes.len() < 9 {
        return Err(Si4707Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "short revision read",
        )));
    }
    Ok(Revision {
        part_number: bytes[1],
        firmware_major: bytes[2],
        firmware_minor: bytes[3],
        component_major: bytes[6],
        component_minor: bytes[7],
        chip_revision: bytes[8],
    })
}

pub(super) fn execute_power_up<H: HardwareContext>(
    ctx: &mut H,
    params: &PowerUpParams,
    exec: &mut ExecutionContext,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_POWER_UP, params.arg1(), params.opmode])?;
    wait_for_clear_to_send(ctx, Duration::from_secs(1))?;

    if params.query_library_id {
        let bytes = ctx.read_bytes(8)?;
        return Ok(CommandOutcome::PupRevision(parse_pup_revision(&bytes)?));
    }

    *exec.radio_power = true;
    *exec.tune_after = Some(if params.crystal_oscillator_enable {
        Instant::now() + OSCILLATOR_STABILIZATION
    } else {
        Instant::now()
    });
    Ok(CommandOutcome::Unit)
}

fn decompress_patch(base64_zlib: &str) -> Result<Vec<u8>, Si4707Error> {
    let compressed = base64::engine::general_purpose::STANDARD
        .decode(base64_zlib)
        .map_err(|e| Si4707Error::PatchDecode(e.to_string()))?;
    let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Si4707Error::PatchDecode(e.to_string()))?;
    Ok(out)
}

pub(super) fn execute_patch<H: HardwareContext>(
    ctx: &mut H,
    params: &PatchParams,
    exec: &mut ExecutionContext,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    execute_power_up(ctx, &params.power_up, exec)?;

    let patch_bytes = decompress_patch(&params.patch.base64_zlib)?;
    for chunk in patch_bytes.chunks(8) {
        ctx.write_bytes(chunk)?;
        wait_for_clear_to_send(ctx, Duration::from_secs(1))?;
    }

    let revision_bytes = {
        ctx.write_bytes(&[OPCODE_GET_REV])?;
        wait_for_clear_to_send(ctx, Duration::from_secs(1))?;
        ctx.read_bytes(9)?
    };
    let revision = parse_revision(&revision_bytes)?;
    let actual_patch_id =
        u16::from_be_bytes([revision.component_major, revision.component_minor]);
    if actual_patch_id != params.patch.expected_patch_id {
        return Err(Si4707Error::PatchIdMismatch {
            expected: params.patch.expected_patch_id,
            actual: actual_patch_id,
        });
    }
    Ok(CommandOutcome::Revision(revision))
}

pub(super) fn execute_power_down<H: HardwareContext>(
    ctx: &mut H,
    exec: &mut ExecutionContext,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_POWER_DOWN])?;
    wait_for_clear_to_send(ctx, Duration::from_secs(1))?;
    *exec.radio_power = false;
    *exec.tune_after = None;
    Ok(CommandOutcome::Unit)
}

pub(super) fn execute_get_revision<H: HardwareContext>(
    ctx: &mut H,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    ctx.write_bytes(&[OPCODE_GET_REV])?;
    wait_for_clear_to_send(ctx, Duration::from_secs(1))?;
    let bytes = ctx.read_bytes(9)?;
    Ok(CommandOutcome::Revision(parse_revision(&bytes)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockHardwareContext;

    fn exec_ctx<'a>(
        radio_power: &'a mut bool,
        tune_after: &'a mut Option<Instant>,
        tone_start: &'a mut Option<Instant>,
    ) -> ExecutionContext<'a> {
        ExecutionContext {
            radio_power,
            tune_after,
            tone_start,
        }
    }

    #[test]
    fn power_up_sets_power_and_schedules_tune_after() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80]);
        let (mut power, mut tune_after, mut tone_start) = (false, None, None);
        let mut exec = exec_ctx(&mut power, &mut tune_after, &mut tone_start);
        let params = PowerUpParams::default();
        execute_power_up(&mut ctx, &params, &mut exec).unwrap();
        assert!(power);
        assert!(tune_after.is_some());
    }

    #[test]
    fn query_library_id_reads_pup_revision_without_powering_on() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80]);
        ctx.queue_read(&[0, 7, 3, 1, 0, 0, 0xD1, 0x95]);
        let (mut power, mut tune_after, mut tone_start) = (false, None, None);
        let mut exec = exec_ctx(&mut power, &mut tune_after, &mut tone_start);
        let params = PowerUpParams {
            query_library_id: true,
            ..Default::default()
        };
        let outcome = execute_power_up(&mut ctx, &params, &mut exec).unwrap();
        assert!(!power);
        match outcome {
            CommandOutcome::PupRevision(rev) => assert_eq!(rev.patch_id, 0xD195),
            _ => panic!("wrong outcome"),
        }
    }

    #[test]
    fn power_down_clears_power_and_tune_after() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80]);
        let (mut power, mut tune_after, mut tone_start) = (true, Some(Instant::now()), None);
        let mut exec = exec_ctx(&mut power, &mut tune_after, &mut tone_start);
        execute_power_down(&mut ctx, &mut exec).unwrap();
        assert!(!power);
        assert!(tune_after.is_none());
    }
}
