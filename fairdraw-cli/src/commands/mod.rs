pub mod config;
pub mod simulate;
pub mod verify;

pub use config::{handle_config_command, ConfigCommands};
pub use simulate::{run_simulation, SimulateArgs};
pub use verify::{verify_proof, VerifyArgs};
