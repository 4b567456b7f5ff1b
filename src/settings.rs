//! Persisted user settings (`key=value` text file).
//!
//! The password is stored XOR-obfuscated and hex encoded. This only keeps it
//! from being readable at a glance; it is not encryption.

use crate::config::ServerConfig;
use crate::constants::{DEFAULT_FTP_PASS, DEFAULT_FTP_USER, FTP_CMD_PORT, USERNAME_REGEX};
use anyhow::{Context, Result};
use log::{info, warn};
use regex::Regex;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEY_USER: &str = "username";
const KEY_PASS: &str = "password";
const KEY_PASS_ENC: &str = "password_enc";
const KEY_PORT: &str = "port";

const XOR_KEY: [u8; 8] = [0x5A, 0x3C, 0x7E, 0x1D, 0x9B, 0x4F, 0x2A, 0x6E];

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Settings {
    pub username: String,
    pub password: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: DEFAULT_FTP_USER.to_string(),
            password: DEFAULT_FTP_PASS.to_string(),
            port: FTP_CMD_PORT,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}

pub fn encode_password(plain: &str) -> String {
    let mut encoded = String::with_capacity(plain.len() * 2);
    for (i, byte) in plain.bytes().enumerate() {
        let _ = write!(encoded, "{:02X}", byte ^ XOR_KEY[i % XOR_KEY.len()]);
    }
    encoded
}

/// `None` for odd-length or non-hex input, or bytes that do not decode to UTF-8.
pub fn decode_password(encoded: &str) -> Option<String> {
    if encoded.len() % 2 != 0 || !encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = (0..encoded.len())
        .step_by(2)
        .enumerate()
        .map(|(i, pos)| {
            u8::from_str_radix(&encoded[pos..pos + 2], 16)
                .ok()
                .map(|byte| byte ^ XOR_KEY[i % XOR_KEY.len()])
        })
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

pub fn is_valid_username(username: &str) -> bool {
    Regex::new(USERNAME_REGEX)
        .map(|re| re.is_match(username))
        .unwrap_or(false)
}

impl Settings {
    /// Current values of a server configuration, used as the base that a
    /// settings file overrides.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            port: config.listen_port,
        }
    }

    /// Reads the settings file over the built-in defaults.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_over(path, Settings::default())
    }

    /// Reads the settings file. Entries missing from the file keep the value
    /// from `base`; a missing file yields `base` unchanged. A legacy
    /// plain-text password is rewritten in encoded form.
    pub fn load_over(path: &Path, base: Settings) -> Result<Self> {
        let mut settings = base;
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Ok(settings);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let mut found_encoded = false;
        let mut found_plain = false;
        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = match line.split_once('=') {
                Some(pair) => pair,
                None => continue,
            };
            match key {
                KEY_USER => {
                    if is_valid_username(value) {
                        settings.username = value.to_string();
                    } else {
                        warn!("Ignoring invalid username in settings file");
                    }
                }
                KEY_PASS_ENC => match decode_password(value) {
                    Some(password) => {
                        settings.password = password;
                        found_encoded = true;
                    }
                    None => warn!("Ignoring malformed password_enc entry"),
                },
                KEY_PASS => {
                    if !found_encoded {
                        settings.password = value.to_string();
                        found_plain = true;
                    }
                }
                KEY_PORT => match value.trim().parse::<u16>() {
                    Ok(port) if port > 0 => settings.port = port,
                    _ => warn!("Ignoring invalid port in settings file: {}", value),
                },
                _ => {}
            }
        }

        if found_plain && !found_encoded {
            info!("Migrating plaintext password to encoded format");
            settings.save(path)?;
        }

        info!(
            "Settings loaded: user={}, port={}",
            settings.username, settings.port
        );
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory: {}", parent.display())
                })?;
            }
        }
        let mut content = String::new();
        let _ = writeln!(content, "{}={}", KEY_USER, self.username);
        let _ = writeln!(content, "{}={}", KEY_PASS_ENC, encode_password(&self.password));
        let _ = writeln!(content, "{}={}", KEY_PORT, self.port);
        fs::write(path, &content)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;
        content.zeroize();
        info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn apply_to(&self, config: &mut ServerConfig) {
        config.username = self.username.clone();
        config.password = self.password.clone();
        config.listen_port = self.port;
    }
}

/// Settings path from the command line, falling back to the config file entry.
pub fn settings_path(cli: Option<&str>, config: &ServerConfig) -> Option<PathBuf> {
    cli.or(config.settings_file.as_deref())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("pocketftpd-settings-{}", rand::thread_rng().gen::<u64>()))
            .join(name)
    }

    #[test]
    fn test_password_encoding() {
        assert_eq!(encode_password("esp32"), "3F4F0E2EA9");
        assert_eq!(decode_password("3F4F0E2EA9").as_deref(), Some("esp32"));
        assert_eq!(decode_password("3F4"), None);
        assert_eq!(decode_password("ZZ"), None);
        assert_eq!(decode_password("+1"), None);
        assert_eq!(decode_password("").as_deref(), Some(""));
    }

    #[test]
    fn test_username_validation() {
        assert!(is_valid_username("esp32"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("bad user"));
        assert!(!is_valid_username(&"a".repeat(33)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_file("settings.properties");
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_file("nested/settings.properties");
        let settings = Settings {
            username: "alice".to_string(),
            password: "s3cret pass".to_string(),
            port: 2121,
        };
        settings.save(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("s3cret"));
        assert!(content.contains("password_enc="));

        assert_eq!(Settings::load(&path).unwrap(), settings);
        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    #[test]
    fn test_entries_missing_from_file_keep_config_values() {
        let path = temp_file("settings.properties");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "username=carol\n").unwrap();

        let mut config = ServerConfig {
            listen_port: 2121,
            password: "from-config".to_string(),
            ..ServerConfig::default()
        };
        let settings = Settings::load_over(&path, Settings::from_config(&config)).unwrap();
        settings.apply_to(&mut config);
        assert_eq!(config.username, "carol");
        assert_eq!(config.password, "from-config");
        assert_eq!(config.listen_port, 2121);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_legacy_password_is_migrated() {
        let path = temp_file("settings.properties");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "# old format\nusername=bob\npassword=hunter2\nport=0\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.username, "bob");
        assert_eq!(settings.password, "hunter2");
        assert_eq!(settings.port, FTP_CMD_PORT);

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("hunter2"));
        assert!(content.contains(&format!("password_enc={}", encode_password("hunter2"))));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
