//! Command objects: the unit of work the driver core schedules,
//! prioritizes, and executes against a [`HardwareContext`].

mod agc;
mod callback;
mod interrupts;
pub mod power;
mod property_cmds;
mod tune;

pub use agc::AgcStatus;
pub use callback::Callback;
pub use interrupts::{AlertToneReading, ReceivedSignalQuality, SameInterruptReading};
pub use power::{power_up_from_config, PatchParams, PowerUpParams, PupRevision, Revision};
pub use tune::{freq_code_from_mhz, TuneStatus};

use crate::error::Si4707Error;
use crate::hardware::HardwareContext;
use crate::property::PropertyId;
use std::time::Duration;

/// Priority band a command is scheduled under. Lower numbers preempt
/// higher ones; within a band, commands run FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Power transitions: uninterruptible once started.
    Uninterruptible = 0,
    /// Synthetic commands the driver core injects to service interrupts.
    InterruptHandler = 1,
    /// Ordinary user-issued commands.
    User = 2,
}

/// The result payload produced by a command's successful execution.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    Unit,
    Revision(Revision),
    PupRevision(PupRevision),
    PropertyValue(u16),
    TuneStatus(TuneStatus),
    ReceivedSignalQuality(ReceivedSignalQuality),
    AlertTone(AlertToneReading),
    SameInterrupt(SameInterruptReading),
    AgcStatus(AgcStatus),
}

/// Everything the command executor needs from the driver beyond the
/// hardware context itself, grouped to keep the per-command `execute`
/// signatures short. See `driver.rs` for the owner of this state.
pub struct ExecutionContext<'a> {
    pub radio_power: &'a mut bool,
    pub tune_after: &'a mut Option<std::time::Instant>,
    pub tone_start: &'a mut Option<std::time::Instant>,
}

/// A scheduled unit of work. Each variant mirrors one opcode (or
/// opcode family) of the Si4707 command set.
pub enum Command {
    PowerUp(power::PowerUpParams),
    PatchCommand(power::PatchParams),
    PowerDown,
    GetRevision,
    GetProperty(PropertyId),
    SetProperty(PropertyId, u16),
    /// Frequency register code: `round(400 * frequency_mhz)`.
    TuneFrequency { freq_code: u16 },
    TuneStatus { intack: bool },
    ReceivedSignalQualityCheck,
    AlertToneCheck,
    SameInterruptCheck,
    GetAgcStatus,
    SetAgcStatus { agc_disable: bool },
    Callback(Callback),
}

impl Command {
    pub fn priority(&self) -> Priority {
        match self {
            Command::PowerUp(_) | Command::PatchCommand(_) | Command::PowerDown => {
                Priority::Uninterruptible
            }
            Command::ReceivedSignalQualityCheck
            | Command::AlertToneCheck
            | Command::SameInterruptCheck => Priority::InterruptHandler,
            _ => Priority::User,
        }
    }

    /// Whether this command may run before the radio has been powered up.
    pub fn requires_power(&self) -> bool {
        !matches!(self, Command::PowerUp(_) | Command::PatchCommand(_))
    }

    pub fn execute<H: HardwareContext>(
        self,
        ctx: &mut H,
        exec: &mut ExecutionContext,
    ) -> Result<CommandOutcome, Si4707Error>
    where
        Si4707Error: From<H::Error>,
    {
        if self.requires_power() && !*exec.radio_power {
            return Err(Si4707Error::NotPowered);
        }
        match self {
            Command::PowerUp(params) => power::execute_power_up(ctx, &params, exec),
            Command::PatchCommand(params) => power::execute_patch(ctx, &params, exec),
            Command::PowerDown => power::execute_power_down(ctx, exec),
            Command::GetRevision => power::execute_get_revision(ctx),
            Command::GetProperty(id) => property_cmds::execute_get_property(ctx, id),
            Command::SetProperty(id, value) => property_cmds::execute_set_property(ctx, id, value),
            Command::TuneFrequency { freq_code } => tune::execute_tune_frequency(ctx, freq_code, exec),
            Command::TuneStatus { intack } => tune::execute_tune_status(ctx, intack),
            Command::ReceivedSignalQualityCheck => interrupts::execute_rsq_check(ctx),
            Command::AlertToneCheck => interrupts::execute_alert_tone_check(ctx, exec),
            Command::SameInterruptCheck => interrupts::execute_same_interrupt_check(ctx),
            Command::GetAgcStatus => agc::execute_get_agc_status(ctx),
            Command::SetAgcStatus { agc_disable } => agc::execute_set_agc_status(ctx, agc_disable),
            Command::Callback(cb) => {
                cb.call();
                Ok(CommandOutcome::Unit)
            }
        }
    }
}

/// Default clear-to-send poll: every 2ms, up to `timeout`.
pub(crate) fn wait_for_clear_to_send<H: HardwareContext>(
    ctx: &mut H,
    timeout: Duration,
) -> Result<crate::status::Status, Si4707Error>
where
    Si4707Error: From<H::Error>,
{
    let start = std::time::Instant::now();
    loop {
        let byte = ctx.read_bytes(1)?;
        let status = crate::status::Status::from_byte(byte[0]);
        if status.is_clear_to_send() {
            return status.check();
        }
        if start.elapsed() >= timeout {
            return Err(Si4707Error::NotClearToSend(timeout));
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_commands_are_uninterruptible() {
        assert_eq!(Command::PowerDown.priority(), Priority::Uninterruptible);
    }

    #[test]
    fn interrupt_checks_preempt_user_commands() {
        assert!(Command::SameInterruptCheck.priority() < Command::GetRevision.priority());
    }

    #[test]
    fn power_up_does_not_require_prior_power() {
        assert!(!Command::PowerUp(power::PowerUpParams::default()).requires_power());
    }
}
