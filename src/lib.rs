//! Driver for the Silicon Labs Si4707 weather-band receiver: tuning,
//! property configuration, SAME header reception and scrubbing, and the
//! background worker threads that turn chip interrupts into [`events::Event`]s.

pub mod command;
pub mod confident;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod future;
pub mod hardware;
pub mod property;
pub mod same;
pub mod status;

pub use config::DriverConfig;
pub use driver::DriverHandle;
pub use error::Si4707Error;
pub use events::Event;
pub use hardware::HardwareContext;
