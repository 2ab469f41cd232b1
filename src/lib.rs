// Library surface for the binary, headless runs and integration tests.
// The terminal UI lives in the binary; nothing here draws.
pub mod app_dirs;
pub mod config;
pub mod cue;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod session;
pub mod sound;
pub mod util;

pub use config::{ConfigField, ConfigStore, Configuration, Step};
pub use cue::{Cue, CueScheduler};
pub use engine::{Settle, SettleToken, TimerEngine, TimingPolicy, Update};
pub use error::{Result, RingsideError};
pub use session::{Phase, Status, TimerState};
