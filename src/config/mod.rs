// file: src/config/mod.rs
// version: 2.0.0
// guid: 3e8a1f52-6b0c-4d97-a2e4-71c9d05b8f16

//! Build configuration for the pi-gen configurator
//!
//! Holds the raw operator input, the resolved record handed to the build
//! dispatcher, and the settings describing where pi-gen comes from.

pub mod collector;
pub mod loader;
pub mod validator;

pub use collector::ConfigCollector;
pub use loader::{ConfigFile, ConfigLoader};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default pi-gen repository
pub const DEFAULT_PI_GEN_REPOSITORY: &str = "https://github.com/RPi-Distro/pi-gen.git";

/// Pinned pi-gen commit known to work with the rendered stage scripts
pub const DEFAULT_PI_GEN_REVISION: &str = "5436273ec728c8369dab9c08f2739805f20510f7";

/// Script invoked inside the pi-gen checkout
pub const DEFAULT_BUILD_SCRIPT: &str = "build-docker.sh";

/// ngrok ARM release archive
pub const DEFAULT_TUNNEL_DOWNLOAD_URL: &str =
    "https://bin.equinox.io/c/4VmDzA7iaHb/ngrok-stable-linux-arm.zip";

/// Settings collected from the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Hostname,
    Username,
    Password,
    CountryCode,
    Ssid,
    Passphrase,
    AuthToken,
    Locale,
    Timezone,
    Keymap,
    Layout,
}

impl Field {
    /// Name used in messages and the configuration file
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Hostname => "hostname",
            Field::Username => "username",
            Field::Password => "password",
            Field::CountryCode => "country_code",
            Field::Ssid => "ssid",
            Field::Passphrase => "passphrase",
            Field::AuthToken => "authtoken",
            Field::Locale => "locale",
            Field::Timezone => "timezone",
            Field::Keymap => "keymap",
            Field::Layout => "layout",
        }
    }

    /// Question shown when the value has to be prompted for
    pub fn prompt(&self) -> &'static str {
        match self {
            Field::Hostname => "What is your hostname: ",
            Field::Username => "What is your username: ",
            Field::Password => "What is your password: ",
            Field::CountryCode => {
                "What is your country alpha-2 code (can be found at https://en.wikipedia.org/wiki/ISO_3166-1): "
            }
            Field::Ssid => "What is your wifi SSID: ",
            Field::Passphrase => "Please enter WiFi's passphrase: ",
            Field::AuthToken => "What is your ngrok authtoken: ",
            Field::Locale => "What locale to use (e.g. en_US.UTF-8): ",
            Field::Timezone => {
                "What is your timezone (e.g. America/New_York)(can be found at https://en.wikipedia.org/wiki/List_of_tz_database_time_zones): "
            }
            Field::Keymap => "What is your keymap (gb, us, etc.): ",
            Field::Layout => "What is your keyboard layout (English (US), English (UK), etc.): ",
        }
    }

    /// Whether the value must be read without echo
    pub fn is_secret(&self) -> bool {
        matches!(self, Field::Password | Field::Passphrase)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that must never show up in logs or summaries
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying value for rendering
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Raw operator input; every setting may still be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationInput {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub country_code: Option<String>,
    pub ssid: Option<String>,
    pub passphrase: Option<String>,
    pub skip_tunnel: bool,
    #[serde(alias = "auth_token")]
    pub authtoken: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub keymap: Option<String>,
    pub layout: Option<String>,
}

impl ConfigurationInput {
    /// Fill settings missing here from `fallback`; values already present win
    pub fn merge(self, fallback: ConfigurationInput) -> ConfigurationInput {
        ConfigurationInput {
            hostname: self.hostname.or(fallback.hostname),
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            country_code: self.country_code.or(fallback.country_code),
            ssid: self.ssid.or(fallback.ssid),
            passphrase: self.passphrase.or(fallback.passphrase),
            skip_tunnel: self.skip_tunnel || fallback.skip_tunnel,
            authtoken: self.authtoken.or(fallback.authtoken),
            locale: self.locale.or(fallback.locale),
            timezone: self.timezone.or(fallback.timezone),
            keymap: self.keymap.or(fallback.keymap),
            layout: self.layout.or(fallback.layout),
        }
    }
}

/// SSH tunnel settings; present only when the tunnel is installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    pub auth_token: Secret,
}

/// Fully resolved settings for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    pub hostname: String,
    pub username: String,
    pub password: Secret,
    pub country_code: String,
    pub ssid: String,
    pub passphrase: Secret,
    pub tunnel: Option<TunnelConfig>,
    pub locale: String,
    pub timezone: String,
    pub keymap: String,
    pub layout: String,
}

impl BuildConfiguration {
    /// True when no tunnel files are rendered
    pub fn skip_tunnel(&self) -> bool {
        self.tunnel.is_none()
    }

    /// Non-secret settings as (name, value) pairs, in prompt order
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("hostname", self.hostname.clone()),
            ("username", self.username.clone()),
            ("password", self.password.to_string()),
            ("country_code", self.country_code.clone()),
            ("ssid", self.ssid.clone()),
            ("passphrase", self.passphrase.to_string()),
            (
                "ngrok",
                if self.skip_tunnel() {
                    "skipped".to_string()
                } else {
                    "enabled".to_string()
                },
            ),
            ("locale", self.locale.clone()),
            ("timezone", self.timezone.clone()),
            ("keymap", self.keymap.clone()),
            ("layout", self.layout.clone()),
        ]
    }
}

/// Where the external image builder is fetched from and how it is started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiGenSource {
    pub repository: String,
    pub revision: String,
    pub build_script: String,
}

impl Default for PiGenSource {
    fn default() -> Self {
        Self {
            repository: DEFAULT_PI_GEN_REPOSITORY.to_string(),
            revision: DEFAULT_PI_GEN_REVISION.to_string(),
            build_script: DEFAULT_BUILD_SCRIPT.to_string(),
        }
    }
}
