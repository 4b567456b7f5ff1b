pub mod config;
pub mod constants;
pub mod core_auth;
pub mod core_cli;
pub mod core_ftpcommand;
pub mod core_log;
pub mod core_network;
pub mod core_vfs;
pub mod engine;
pub mod error;
pub mod server;
pub mod session;
pub mod settings;

pub use config::{Config, ServerConfig};
pub use error::FtpError;
pub use server::FtpServer;
pub use session::{ControlState, DataState, ServerStatus};

#[cfg(test)]
mod test_engine;
#[cfg(test)]
mod test_server;
