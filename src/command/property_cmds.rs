//! `SetProperty` and `GetProperty`.

use super::{wait_for_clear_to_send, CommandOutcome};
use crate::error::Si4707Error;
use crate::hardware::HardwareContext;
use crate::property::PropertyId;
use std::time::Duration;

const OPCODE_SET_PROPERTY: u8 = 0x12;
const OPCODE_GET_PROPERTY: u8 = 0x13;

pub(super) fn execute_set_property<H: HardwareContext>(
    ctx: &mut H,
    id: PropertyId,
    value: u16,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    id.validate(value)?;
    let code = id.code().to_be_bytes();
    let v = value.to_be_bytes();
    ctx.write_bytes(&[OPCODE_SET_PROPERTY, 0x00, code[0], code[1], v[0], v[1]])?;
    wait_for_clear_to_send(ctx, Duration::from_millis(20))?;
    Ok(CommandOutcome::Unit)
}

pub(super) fn execute_get_property<H: HardwareContext>(
    ctx: &mut H,
    id: PropertyId,
) -> Result<CommandOutcome, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    let code = id.code().to_be_bytes();
    ctx.write_bytes(&[OPCODE_GET_PROPERTY, 0x00, code[0], code[1]])?;
    wait_for_clear_to_send(ctx, Duration::from_millis(20))?;
    let bytes = ctx.read_bytes(4)?;
    Ok(CommandOutcome::PropertyValue(u16::from_be_bytes([
        bytes[2], bytes[3],
    ])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MockHardwareContext;

    #[test]
    fn set_property_rejects_out_of_range_values() {
        let mut ctx = MockHardwareContext::new();
        let err = execute_set_property(&mut ctx, PropertyId::RxVolume, 64).unwrap_err();
        assert!(matches!(err, Si4707Error::ValueOutOfRange { .. }));
    }

    #[test]
    fn set_property_writes_opcode_and_value() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80]);
        execute_set_property(&mut ctx, PropertyId::RxVolume, 40).unwrap();
        assert_eq!(
            ctx.writes[0],
            vec![OPCODE_SET_PROPERTY, 0x00, 0x40, 0x00, 0x00, 40]
        );
    }

    #[test]
    fn get_property_parses_returned_value() {
        let mut ctx = MockHardwareContext::new();
        ctx.queue_read(&[0x80]);
        ctx.queue_read(&[0x80, 0x00, 0x00, 40]);
        let outcome = execute_get_property(&mut ctx, PropertyId::RxVolume).unwrap();
        match outcome {
            CommandOutcome::PropertyValue(v) => assert_eq!(v, 40),
            _ => panic!("wrong outcome"),
        }
    }
}
