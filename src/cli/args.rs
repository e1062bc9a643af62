// file: src/cli/args.rs
// version: 2.0.0
// guid: f6g7h8i9-j0k1-2345-6789-012345fghijk

//! Command line argument definitions

use crate::config::ConfigurationInput;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pi-gen-configurator")]
#[command(about = "Configure and build a Raspberry Pi OS image with pi-gen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[arg(short = 'o', long, help = "Hostname of the Pi, also used as the image name")]
    pub hostname: Option<String>,

    #[arg(short, long, help = "Name of the first user")]
    pub username: Option<String>,

    #[arg(short, long, help = "Password of the first user (prefer the prompt)")]
    pub password: Option<String>,

    #[arg(short, long, help = "WiFi country code, ISO 3166-1 alpha-2")]
    pub country_code: Option<String>,

    #[arg(short, long, help = "WiFi SSID")]
    pub ssid: Option<String>,

    #[arg(short = 'w', long, help = "WiFi passphrase (prefer the prompt)")]
    pub passphrase: Option<String>,

    #[arg(long, visible_alias = "skip-tunnel", help = "Do not set up the ngrok SSH tunnel")]
    pub skip_ngrok: bool,

    #[arg(short, long, help = "ngrok auth token")]
    pub authtoken: Option<String>,

    #[arg(short, long, help = "Locale, e.g. en_US.UTF-8")]
    pub locale: Option<String>,

    #[arg(short, long, help = "Timezone, e.g. America/New_York")]
    pub timezone: Option<String>,

    #[arg(short, long, help = "Keyboard keymap, e.g. gb or us")]
    pub keymap: Option<String>,

    #[arg(short = 'y', long, help = "Keyboard layout, e.g. English (US)")]
    pub layout: Option<String>,

    #[arg(long, value_name = "FILE", help = "YAML file with defaults for any setting")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Never prompt; fail on missing values")]
    pub non_interactive: bool,

    #[arg(long, help = "Keep the pi-gen checkout after a successful build")]
    pub keep_work_dir: bool,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Settings given on the command line
    pub fn settings(&self) -> ConfigurationInput {
        ConfigurationInput {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            country_code: self.country_code.clone(),
            ssid: self.ssid.clone(),
            passphrase: self.passphrase.clone(),
            skip_tunnel: self.skip_ngrok,
            authtoken: self.authtoken.clone(),
            locale: self.locale.clone(),
            timezone: self.timezone.clone(),
            keymap: self.keymap.clone(),
            layout: self.layout.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags_map_to_settings() {
        let cli = Cli::try_parse_from([
            "pi-gen-configurator",
            "-o", "raspberry",
            "-u", "pi",
            "-c", "GB",
            "-s", "WiFi",
            "-a", "tok123",
            "-l", "en_GB.UTF-8",
            "-t", "Europe/London",
            "-k", "gb",
            "-y", "English (GB)",
        ])
        .unwrap();

        let settings = cli.settings();
        assert_eq!(settings.hostname.as_deref(), Some("raspberry"));
        assert_eq!(settings.username.as_deref(), Some("pi"));
        assert_eq!(settings.country_code.as_deref(), Some("GB"));
        assert_eq!(settings.ssid.as_deref(), Some("WiFi"));
        assert_eq!(settings.authtoken.as_deref(), Some("tok123"));
        assert_eq!(settings.layout.as_deref(), Some("English (GB)"));
        assert!(settings.password.is_none());
        assert!(!settings.skip_tunnel);
    }

    #[test]
    fn test_skip_tunnel_alias() {
        let cli = Cli::try_parse_from(["pi-gen-configurator", "--skip-tunnel"]).unwrap();
        assert!(cli.settings().skip_tunnel);

        let cli = Cli::try_parse_from(["pi-gen-configurator", "--skip-ngrok"]).unwrap();
        assert!(cli.skip_ngrok);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["pi-gen-configurator", "-v", "-q"]).is_err());
    }
}
