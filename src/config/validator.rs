// file: src/config/validator.rs
// version: 1.0.0
// guid: 2a6f0d81-c3b9-47e5-9d14-8e5b3c7a0f29

//! Validation of resolved settings before anything is written
//!
//! Most settings end up inside generated shell scripts, often between double
//! quotes or inside an unquoted heredoc. Characters that would change the
//! meaning of those scripts are rejected here.

use super::{BuildConfiguration, Field};
use crate::error::ConfiguratorError;
use crate::Result;
use regex::Regex;

/// Characters that break double-quoted or heredoc shell text
const SHELL_UNSAFE: &[char] = &['"', '`', '$', '\\', '\n', '\r'];

/// Validate a resolved configuration
pub fn validate(config: &BuildConfiguration) -> Result<()> {
    validate_hostname(&config.hostname)?;
    validate_username(&config.username)?;
    validate_country_code(&config.country_code)?;

    check_shell_safe(Field::Password, config.password.expose())?;
    check_shell_safe(Field::Ssid, &config.ssid)?;
    check_shell_safe(Field::Passphrase, config.passphrase.expose())?;
    check_shell_safe(Field::Locale, &config.locale)?;
    check_shell_safe(Field::Timezone, &config.timezone)?;
    if config.timezone.contains('\'') {
        return Err(ConfiguratorError::invalid(format!(
            "{} must not contain single quotes",
            Field::Timezone
        )));
    }
    check_single_line(Field::Keymap, &config.keymap)?;
    check_single_line(Field::Layout, &config.layout)?;

    if let Some(tunnel) = &config.tunnel {
        validate_auth_token(tunnel.auth_token.expose())?;
    }

    Ok(())
}

/// Hostnames double as the image name: one RFC 1123 label
pub fn validate_hostname(hostname: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
        .map_err(|e| ConfiguratorError::config(format!("Invalid regex pattern: {}", e)))?;
    if !re.is_match(hostname) {
        return Err(ConfiguratorError::invalid(format!(
            "Invalid hostname: {}",
            hostname
        )));
    }
    Ok(())
}

/// Linux user names as accepted by `usermod`
pub fn validate_username(username: &str) -> Result<()> {
    let re = Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$")
        .map_err(|e| ConfiguratorError::config(format!("Invalid regex pattern: {}", e)))?;
    if !re.is_match(username) {
        return Err(ConfiguratorError::invalid(format!(
            "Invalid username: {}",
            username
        )));
    }
    Ok(())
}

/// ISO 3166-1 alpha-2 shape; whether the code exists is left to pi-gen
pub fn validate_country_code(code: &str) -> Result<()> {
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfiguratorError::invalid(format!(
            "Invalid country code: {} (expected ISO 3166-1 alpha-2)",
            code
        )));
    }
    Ok(())
}

/// ngrok tokens are written unquoted into YAML
pub fn validate_auth_token(token: &str) -> Result<()> {
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfiguratorError::invalid(format!(
            "{} contains unsupported characters",
            Field::AuthToken
        )));
    }
    Ok(())
}

fn check_shell_safe(field: Field, value: &str) -> Result<()> {
    if value.contains(SHELL_UNSAFE) {
        return Err(ConfiguratorError::invalid(format!(
            "{} must not contain quotes, backslashes, '$', '`' or line breaks",
            field
        )));
    }
    Ok(())
}

fn check_single_line(field: Field, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(ConfiguratorError::invalid(format!(
            "{} must be a single line",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Secret, TunnelConfig};

    fn valid_config() -> BuildConfiguration {
        BuildConfiguration {
            hostname: "raspberry".to_string(),
            username: "pi".to_string(),
            password: Secret::new("correct horse"),
            country_code: "GB".to_string(),
            ssid: "Home WiFi".to_string(),
            passphrase: Secret::new("p@ss#word!"),
            tunnel: Some(TunnelConfig {
                auth_token: Secret::new("1abc_DEF-23"),
            }),
            locale: "en_GB.UTF-8".to_string(),
            timezone: "Europe/London".to_string(),
            keymap: "gb".to_string(),
            layout: "English (GB)".to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("raspberry-pi-4").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("-pi").is_err());
        assert!(validate_hostname("pi.local").is_err());
        assert!(validate_hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("pi").is_ok());
        assert!(validate_username("_svc-user1").is_ok());
        assert!(validate_username("Pi").is_err());
        assert!(validate_username("1pi").is_err());
        assert!(validate_username("pi user").is_err());
    }

    #[test]
    fn test_validate_country_code() {
        assert!(validate_country_code("GB").is_ok());
        assert!(validate_country_code("GBR").is_err());
        assert!(validate_country_code("G1").is_err());
    }

    #[test]
    fn test_shell_breaking_secret_is_invalid_value() {
        let mut config = valid_config();
        config.password = Secret::new("pa\"ss");
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfiguratorError::InvalidValue(_)));
        // the message names the field, never the value
        assert!(!err.to_string().contains("pa\"ss"));
    }

    #[test]
    fn test_timezone_rejects_single_quote() {
        let mut config = valid_config();
        config.timezone = "Europe/'London".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_auth_token_only_checked_with_tunnel() {
        let mut config = valid_config();
        config.tunnel = Some(TunnelConfig {
            auth_token: Secret::new("tok: en"),
        });
        assert!(validate(&config).is_err());

        config.tunnel = None;
        assert!(validate(&config).is_ok());
    }
}
