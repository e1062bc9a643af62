// file: src/config/collector.rs
// version: 1.0.0
// guid: 95d0c7a3-1e4b-4f28-8a6d-3b72e0f9c514

//! Resolves operator input into a complete build configuration
//!
//! Each setting is taken from the supplied input when present and prompted
//! for otherwise. A value that was supplied is never asked for again.

use super::{BuildConfiguration, ConfigurationInput, Field, Secret, TunnelConfig};
use crate::error::ConfiguratorError;
use crate::prompt::Prompter;
use crate::Result;
use tracing::debug;

const COUNTRY_CODE_RETRY: &str = "Please re-type your country code: ";
const TUNNEL_QUESTION: &str = "do you want to set up ngrok";

/// Fills in missing settings by prompting
pub struct ConfigCollector<'a, P: Prompter + ?Sized> {
    prompter: &'a mut P,
}

impl<'a, P: Prompter + ?Sized> ConfigCollector<'a, P> {
    pub fn new(prompter: &'a mut P) -> Self {
        Self { prompter }
    }

    /// Produce a complete configuration, prompting for anything missing
    pub fn collect(&mut self, input: ConfigurationInput) -> Result<BuildConfiguration> {
        let hostname = self.resolve(Field::Hostname, input.hostname)?;
        let username = self.resolve(Field::Username, input.username)?;
        let password = Secret::new(self.resolve(Field::Password, input.password)?);
        let country_code = self.resolve_country_code(input.country_code)?;
        let ssid = self.resolve(Field::Ssid, input.ssid)?;
        let passphrase = Secret::new(self.resolve(Field::Passphrase, input.passphrase)?);
        let tunnel = self.resolve_tunnel(input.skip_tunnel, input.authtoken)?;
        let locale = self.resolve(Field::Locale, input.locale)?;
        let timezone = self.resolve(Field::Timezone, input.timezone)?;
        let keymap = self.resolve(Field::Keymap, input.keymap)?;
        let layout = self.resolve(Field::Layout, input.layout)?;

        Ok(BuildConfiguration {
            hostname,
            username,
            password,
            country_code,
            ssid,
            passphrase,
            tunnel,
            locale,
            timezone,
            keymap,
            layout,
        })
    }

    fn resolve(&mut self, field: Field, supplied: Option<String>) -> Result<String> {
        if let Some(value) = supplied.filter(|v| !v.is_empty()) {
            debug!("Using supplied {}", field);
            return Ok(value);
        }

        let answer = if field.is_secret() {
            self.prompter.ask_secret(field.prompt())?
        } else {
            self.prompter.ask(field.prompt())?
        };

        answer
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfiguratorError::missing(field.as_str()))
    }

    /// Prompted country codes are asked again until they are two characters
    fn resolve_country_code(&mut self, supplied: Option<String>) -> Result<String> {
        let prompted = supplied.as_deref().map_or(true, str::is_empty);
        let mut code = self.resolve(Field::CountryCode, supplied)?;

        if prompted {
            while code.chars().count() != 2 {
                code = self
                    .prompter
                    .ask(COUNTRY_CODE_RETRY)?
                    .ok_or_else(|| ConfiguratorError::missing(Field::CountryCode.as_str()))?;
            }
        }

        Ok(code.to_uppercase())
    }

    fn resolve_tunnel(
        &mut self,
        skip_tunnel: bool,
        authtoken: Option<String>,
    ) -> Result<Option<TunnelConfig>> {
        if skip_tunnel {
            debug!("Skipping ngrok tunnel");
            return Ok(None);
        }

        let wanted = match authtoken.as_deref() {
            Some(token) if !token.is_empty() => true,
            _ => self.prompter.confirm(TUNNEL_QUESTION, false)?,
        };
        if !wanted {
            return Ok(None);
        }

        let token = self.resolve(Field::AuthToken, authtoken)?;
        Ok(Some(TunnelConfig {
            auth_token: Secret::new(token),
        }))
    }
}
