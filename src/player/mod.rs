//! omxplayer supervision - spawns the player, feeds it key codes and scrapes its output.
//!
//! Architecture:
//! - `codes.rs` - command name to stdin key code table
//! - `telemetry.rs` - duration/position model and `HH:MM:SS` formatting
//! - `parser.rs` - stderr/stdout scrapers that fill the telemetry
//! - `process.rs` - binary detection, launch arguments and spawning
//! - `supervisor.rs` - session ownership, command dispatch and cleanup

pub mod codes;
mod parser;
mod process;
mod supervisor;
mod telemetry;

pub use parser::{parse_duration, parse_position};
pub use process::{find_player, LaunchOptions, ProcessError};
pub use supervisor::{
  command_queue, CommandReceiver, CommandSender, MediaInfo, Playback, PlayerError, PlayerStatus,
  Supervisor,
};
pub use telemetry::{format_duration, Position, Telemetry, TelemetrySnapshot};
