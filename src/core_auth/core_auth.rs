use crate::constants::{FALLBACK_FTP_PASS, FALLBACK_FTP_USER, FTP_USER_PASS_LEN_MAX};
use crate::core_auth::helper::secure_compare;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Username and password accepted by USER/PASS, each bounded to
/// `FTP_USER_PASS_LEN_MAX` bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: bounded(username),
            password: bounded(password),
        }
    }

    /// Replaces empty fields with the built-in fallback account.
    pub fn or_fallback(mut self) -> Self {
        if self.username.is_empty() {
            self.username = FALLBACK_FTP_USER.to_string();
        }
        if self.password.is_empty() {
            self.password = FALLBACK_FTP_PASS.to_string();
        }
        self
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn verify_username(&self, candidate: &str) -> bool {
        secure_compare(candidate, &self.username)
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        secure_compare(candidate, &self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn bounded(value: &str) -> String {
    if value.len() <= FTP_USER_PASS_LEN_MAX {
        return value.to_string();
    }
    let mut end = FTP_USER_PASS_LEN_MAX;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}
