//! Drive a Minecraft server over RCON from long-running services.
//!
//! The centerpiece is [`RconManager`], which keeps one authenticated RCON
//! session alive for the whole process and lets any number of tasks send
//! commands through it:
//!
//! ```no_run
//! use mc_rcon_bridge_lib::{RconConfig, RconManager};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = RconManager::new(RconConfig::new("localhost", 25575, "hunter2"))?;
//! manager.start().await;
//!
//! let status = manager.get_status().await;
//! println!("{}", status);
//! println!("{}", manager.send("whitelist add Alice").await?);
//!
//! manager.stop().await;
//! # Ok(())
//! # }
//! ```

use once_cell::sync::OnceCell;

pub mod admin;
pub mod backoff;
pub mod chat;
pub mod config;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod status;
pub mod transport;
#[cfg(test)]
mod test;

pub use crate::admin::AdminCommand;
pub use crate::config::RconConfig;
pub use crate::error::{RconConfigError, RconError};
pub use crate::manager::RconManager;
pub use crate::status::ServerStatus;

/// The value that `ChatMessage.log()` will use for `log!`'s target parameter
///
/// Will be set to a default of `chat` if not set elsewhere.
pub static CHAT_LOG_TARGET: OnceCell<&str> = OnceCell::new();
