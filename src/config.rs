use crate::constants::*;
use crate::error::FtpError;
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_port: u16,
    pub pasv_port: u16,
    pub banner: String,
    pub username: String,
    pub password: String,
    /// Real directory exposed as `/data`.
    pub internal_mount: String,
    /// Real directory exposed as `/sdcard`, usually removable storage.
    pub external_mount: String,
    /// Prefix prepended to every translated path.
    pub mount_prefix: String,
    pub buffer_size: usize,
    pub cmd_timeout_ms: u64,
    pub data_timeout_ms: u64,
    /// Pause before filesystem mutations and external storage opens.
    pub settle_delay_ms: u64,
    pub settings_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: FTP_CMD_PORT,
            pasv_port: FTP_PASSIVE_DATA_PORT,
            banner: String::from(FTP_SERVER_NAME),
            username: String::from(DEFAULT_FTP_USER),
            password: String::from(DEFAULT_FTP_PASS),
            internal_mount: String::from(VFS_NATIVE_INTERNAL_MP),
            external_mount: String::from(VFS_NATIVE_EXTERNAL_MP),
            mount_prefix: String::new(),
            buffer_size: FTPSERVER_BUFFER_SIZE,
            cmd_timeout_ms: FTP_CMD_TIMEOUT_MS,
            data_timeout_ms: FTP_DATA_TIMEOUT_MS,
            settle_delay_ms: 5,
            settings_file: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), FtpError> {
        if !(FTPSERVER_MIN_BUFFER_SIZE..=FTPSERVER_MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(FtpError::InvalidConfig(format!(
                "buffer_size {} outside {}..={}",
                self.buffer_size, FTPSERVER_MIN_BUFFER_SIZE, FTPSERVER_MAX_BUFFER_SIZE
            )));
        }
        if self.internal_mount.is_empty() || self.external_mount.is_empty() {
            return Err(FtpError::InvalidConfig(
                "mount points must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))?;
        config
            .server
            .validate()
            .with_context(|| format!("Invalid configuration file: {}", path))?;
        Ok(config)
    }
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    info!("  Listen Port: {}", config.server.listen_port);
    info!("  PASV Port: {}", config.server.pasv_port);
    info!("  Internal Mount: {}", config.server.internal_mount);
    info!("  External Mount: {}", config.server.external_mount);
    info!("  Buffer Size: {} bytes", config.server.buffer_size);
    info!("  Command Timeout: {} ms", config.server.cmd_timeout_ms);
    info!("  Data Timeout: {} ms", config.server.data_timeout_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen_port = 2121
            internal_mount = "/srv/ftp"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen_port, 2121);
        assert_eq!(config.server.internal_mount, "/srv/ftp");
        assert_eq!(config.server.pasv_port, FTP_PASSIVE_DATA_PORT);
        assert_eq!(config.server.buffer_size, FTPSERVER_BUFFER_SIZE);
        assert!(config.server.validate().is_ok());
    }

    #[test]
    fn test_buffer_too_small_for_listing_is_rejected() {
        let server = ServerConfig {
            buffer_size: 64,
            ..Default::default()
        };
        assert!(server.validate().is_err());
        let server = ServerConfig {
            buffer_size: FTPSERVER_MIN_BUFFER_SIZE,
            ..Default::default()
        };
        assert!(server.validate().is_ok());
    }

    #[test]
    fn test_buffer_size_is_capped() {
        let server = ServerConfig {
            buffer_size: FTPSERVER_MAX_BUFFER_SIZE + 1,
            ..Default::default()
        };
        assert!(server.validate().is_err());
    }
}
