pub mod client;
pub mod config;
pub mod error;
pub mod expression;
pub mod hub;
pub mod intent;
mod lock;
pub mod protocol;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod trigger;

pub use error::VoiceError;
pub use protocol::{Action, VoiceEvent};
