use crate::constants::{FTP_LOGIN_BACKOFF_MAX_MS, FTP_LOGIN_BACKOFF_STEP_MS, FTP_MAX_LOGIN_RETRIES};
use std::time::Duration;
use subtle::ConstantTimeEq;

/// Timing-safe comparison. Lengths must match and neither side may be empty.
pub fn secure_compare(candidate: &str, expected: &str) -> bool {
    if expected.is_empty() || candidate.len() != expected.len() {
        return false;
    }
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Delay applied before evaluating a PASS once `retries` failures have
/// accumulated on the connection.
pub fn login_backoff(retries: u8) -> Option<Duration> {
    if retries < FTP_MAX_LOGIN_RETRIES {
        return None;
    }
    let excess = u64::from(retries - FTP_MAX_LOGIN_RETRIES) + 1;
    let delay_ms = (FTP_LOGIN_BACKOFF_STEP_MS * excess).min(FTP_LOGIN_BACKOFF_MAX_MS);
    Some(Duration::from_millis(delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_compare() {
        assert!(secure_compare("esp32", "esp32"));
        assert!(!secure_compare("esp33", "esp32"));
        assert!(!secure_compare("esp3", "esp32"));
        assert!(!secure_compare("", ""));
    }

    #[test]
    fn test_login_backoff_escalates_and_caps() {
        assert_eq!(login_backoff(0), None);
        assert_eq!(login_backoff(2), None);
        assert_eq!(login_backoff(3), Some(Duration::from_millis(1000)));
        assert_eq!(login_backoff(4), Some(Duration::from_millis(2000)));
        assert_eq!(login_backoff(20), Some(Duration::from_millis(5000)));
    }
}
