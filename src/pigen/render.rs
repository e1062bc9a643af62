// file: src/pigen/render.rs
// version: 1.0.0
// guid: 8c5a2e94-d16b-4f07-93ae-b0e4f7c21d58

//! Rendering of the files pi-gen reads
//!
//! Everything here is pure: contents of existing pi-gen files go in, the
//! bytes to write come out. Writing is done by the dispatcher.

use super::paths;
use crate::config::BuildConfiguration;
use crate::error::ConfiguratorError;
use crate::Result;
use regex::{Captures, Regex};
use tracing::warn;

/// Mode for generated stage scripts
pub const EXECUTABLE: u32 = 0o755;

/// Mode for plain data files
pub const REGULAR: u32 = 0o644;

/// One file to write into the checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the checkout root
    pub path: String,
    pub contents: String,
    pub mode: u32,
}

impl RenderedFile {
    fn new(path: &str, contents: String, mode: u32) -> Self {
        Self {
            path: path.to_string(),
            contents,
            mode,
        }
    }
}

/// Existing pi-gen files that are patched rather than generated
#[derive(Debug, Clone, Default)]
pub struct Templates {
    pub wpa_supplicant: String,
    pub locale_debconf: String,
    pub keyboard_debconf: String,
}

/// Render every file the build needs, in write order
pub fn render_layout(config: &BuildConfiguration, templates: &Templates) -> Result<Vec<RenderedFile>> {
    let mut files = vec![
        RenderedFile::new(
            paths::USER_RUN,
            render_user_script(&config.username, config.password.expose()),
            EXECUTABLE,
        ),
        RenderedFile::new(
            paths::WPA_SUPPLICANT,
            patch_wpa_supplicant(&templates.wpa_supplicant, &config.country_code),
            REGULAR,
        ),
        RenderedFile::new(
            paths::WIFI_RUN,
            render_wifi_script(&config.ssid, config.passphrase.expose()),
            EXECUTABLE,
        ),
        RenderedFile::new(paths::SSH_RUN, render_ssh_script(), EXECUTABLE),
    ];

    if let Some(tunnel) = &config.tunnel {
        files.push(RenderedFile::new(
            paths::TUNNEL_CONFIG,
            render_tunnel_config(tunnel.auth_token.expose()),
            REGULAR,
        ));
        files.push(RenderedFile::new(
            paths::TUNNEL_CRON,
            render_tunnel_cron(),
            REGULAR,
        ));
        files.push(RenderedFile::new(
            paths::TUNNEL_RUN,
            render_tunnel_script(),
            EXECUTABLE,
        ));
    }

    files.push(RenderedFile::new(
        paths::LOCALE_DEBCONF,
        patch_locale(&templates.locale_debconf, &config.locale),
        REGULAR,
    ));
    files.push(RenderedFile::new(
        paths::TIMEZONE_RUN,
        render_timezone_script(&config.timezone),
        EXECUTABLE,
    ));
    files.push(RenderedFile::new(
        paths::KEYBOARD_DEBCONF,
        patch_keyboard(&templates.keyboard_debconf, &config.keymap, &config.layout)?,
        REGULAR,
    ));
    files.push(RenderedFile::new(
        paths::CONFIG,
        render_config(&config.hostname),
        REGULAR,
    ));

    for marker in paths::SKIP_MARKERS.iter().chain(paths::SKIP_IMAGE_MARKERS) {
        files.push(RenderedFile::new(marker, String::new(), REGULAR));
    }

    Ok(files)
}

/// pi-gen `config`: image name and hostname
pub fn render_config(hostname: &str) -> String {
    let mut config = ShellConfig::new();
    config.set("IMG_NAME", hostname).set("HOSTNAME", hostname);
    config.render()
}

/// Renames the default `pi` user and sets its password
pub fn render_user_script(username: &str, password: &str) -> String {
    format!(
        "#!/bin/bash -e\n\
         on_chroot << EOF\n\
         usermod -l {username} pi\n\
         usermod -m -d /home/{username} {username}\n\
         echo -e \"{password}\n{password}\" | passwd {username}\n\
         EOF\n"
    )
}

/// Prefix the supplicant template with the regulatory country
pub fn patch_wpa_supplicant(existing: &str, country_code: &str) -> String {
    format!("country={}\n{}", country_code, existing)
}

/// Appends the hashed network block to the image's supplicant file
pub fn render_wifi_script(ssid: &str, passphrase: &str) -> String {
    format!(
        "#!/bin/bash -e\n\
         echo \"adding wifi network to /etc/wpa_supplicant/wpa_supplicant.conf\"\n\
         on_chroot << EOF\n  \
         echo \"\" >> /etc/wpa_supplicant/wpa_supplicant.conf\n  \
         wpa_passphrase \"{ssid}\" \"{passphrase}\" | sed '/^[ \\t]*#/ d' >> /etc/wpa_supplicant/wpa_supplicant.conf\n\
         EOF\n"
    )
}

/// The boot partition flag that turns on sshd at first boot
pub fn render_ssh_script() -> String {
    "#!/bin/bash -e\n\n# Enable SSH daemon by default.\ntouch \"$ROOTFS_DIR\"/boot/ssh".to_string()
}

/// Installs the ngrok binary, its config and the cron starter into the image
pub fn render_tunnel_script() -> String {
    let files = "files";
    format!(
        "#!/bin/bash -e\n\n\
         # Copy ngrok to /usr/local/bin.\n\
         install -d \"${{ROOTFS_DIR}}/usr/local/bin\"\n\
         install -m 755 {files}/ngrok \"${{ROOTFS_DIR}}/usr/local/bin/\"\n\n\
         # Copy ngrok config to /etc/opt/scripts/ngrok\n\
         install -d \"${{ROOTFS_DIR}}/etc/opt/scripts/ngrok\"\n\
         install -m 644 {files}/ssh_config.yml \"${{ROOTFS_DIR}}/etc/opt/scripts/ngrok/\"\n\n\
         # Copy ngrok start script to /etc/cron.hourly/\n\
         install -d \"${{ROOTFS_DIR}}/etc/cron.hourly/\"\n\
         install -m 755 {files}/start_tunnel \"${{ROOTFS_DIR}}/etc/cron.hourly/\"\n"
    )
}

/// ngrok config exposing sshd as a TCP tunnel
pub fn render_tunnel_config(auth_token: &str) -> String {
    format!(
        "authtoken: {auth_token}\n\
         tunnels:\n  \
         ssh:\n    \
         proto: tcp\n    \
         addr: 22\n"
    )
}

/// Hourly job that starts the tunnel when it is down
pub fn render_tunnel_cron() -> String {
    concat!(
        "#!/bin/bash -e\n",
        "\n",
        "# This script checks if ngrok is not running and starts a tunnel if not.\n",
        "\n",
        "if ps -ax | grep ngrok | grep -q ssh ; then\n",
        "  echo \"$HOSTNAME SSH tunnel is already created\"\n",
        "else\n",
        "  echo \"$HOSTNAME SSH tunnel is down, setting it up now\" >&2\n",
        "  /usr/local/bin/ngrok start -config \"/etc/opt/scripts/ngrok/ssh_config.yml\" ssh > /dev/null &\n",
        "\n",
        "  status=$?\n",
        "  if [ $status -eq 0 ]; then\n",
        "    echo \"tunnel should be started\"\n",
        "  else\n",
        "    echo \"cannot start tunnel\" >&2\n",
        "  fi\n",
        "fi\n",
    )
    .to_string()
}

/// Swap the default locale in the stage0 debconf seed.
///
/// Matches both the `select` default and the `multiselect` generation list.
pub fn patch_locale(existing: &str, locale: &str) -> String {
    const DEFAULT: &str = "select\ten_GB.UTF-8";
    if !existing.contains(DEFAULT) {
        warn!("Locale seed has no default en_GB.UTF-8 entry; leaving it unchanged");
    }
    existing.replace(DEFAULT, &format!("select\t{}", locale))
}

/// Writes the zone name and reconfigures tzdata inside the image
pub fn render_timezone_script(timezone: &str) -> String {
    format!(
        "#!/bin/bash -e\n\
         echo \"changing timezone to: {timezone}\"\n\
         on_chroot << EOF\n  \
         unlink /etc/localtime\n  \
         echo '{timezone}' > /etc/timezone\n  \
         dpkg-reconfigure tzdata\n\
         EOF\n"
    )
}

/// Replace the keymap and layout answers in the stage2 debconf seed
pub fn patch_keyboard(existing: &str, keymap: &str, layout: &str) -> Result<String> {
    let keymap_re = debconf_answer_regex("keyboard-configuration/xkb-keymap")?;
    let variant_re = debconf_answer_regex("keyboard-configuration/variant")?;

    if !keymap_re.is_match(existing) || !variant_re.is_match(existing) {
        warn!("Keyboard seed is missing the xkb-keymap or variant entry");
    }

    let patched = keymap_re.replace_all(existing, |caps: &Captures| format!("{}{}", &caps[1], keymap));
    let patched = variant_re.replace_all(&patched, |caps: &Captures| format!("{}{}", &caps[1], layout));
    Ok(patched.into_owned())
}

fn debconf_answer_regex(question: &str) -> Result<Regex> {
    Regex::new(&format!(
        r"(?m)^(keyboard-configuration[ \t]+{}[ \t]+select[ \t]+)[^\r\n]*",
        regex::escape(question)
    ))
    .map_err(|e| ConfiguratorError::config(format!("Invalid regex pattern: {}", e)))
}

/// KEY=VALUE file in the syntax bash `source`s
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfig {
    entries: Vec<(String, String)>,
}

impl ShellConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing an earlier value
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// One `KEY=value` line per entry; values are single-quoted when needed
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, shell_quote(v)))
            .collect()
    }

    /// Parse assignments, ignoring blank lines and comments
    pub fn parse(content: &str) -> Result<Self> {
        let key_re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| ConfiguratorError::config(format!("Invalid regex pattern: {}", e)))?;
        let mut config = Self::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, raw) = line.split_once('=').ok_or_else(|| {
                ConfiguratorError::config(format!("Line {} is not an assignment", number + 1))
            })?;
            if !key_re.is_match(key) {
                return Err(ConfiguratorError::config(format!(
                    "Line {} has an invalid key: {}",
                    number + 1,
                    key
                )));
            }
            config.set(key, &shell_unquote(raw, number + 1)?);
        }

        Ok(config)
    }
}

fn is_shell_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || "._/:@%+,-".contains(c)
}

fn shell_quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_shell_plain) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

fn shell_unquote(raw: &str, line: usize) -> Result<String> {
    let mut value = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(inner) => value.push(inner),
                    None => {
                        return Err(ConfiguratorError::config(format!(
                            "Line {} has an unterminated quote",
                            line
                        )))
                    }
                }
            },
            '"' => loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped @ ('"' | '\\' | '$' | '`')) => value.push(escaped),
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                        None => break,
                    },
                    Some(inner) => value.push(inner),
                    None => {
                        return Err(ConfiguratorError::config(format!(
                            "Line {} has an unterminated quote",
                            line
                        )))
                    }
                }
            },
            '\\' => {
                if let Some(escaped) = chars.next() {
                    value.push(escaped);
                }
            }
            other => value.push(other),
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Secret, TunnelConfig};

    const KEYBOARD_SEED: &str = "keyboard-configuration\tkeyboard-configuration/xkb-keymap\tselect\tgb\n\
keyboard-configuration\tkeyboard-configuration/variant\tselect\tEnglish (UK)\n\
keyboard-configuration\tkeyboard-configuration/model\tselect\tGeneric 105-key (Intl) PC\n";

    const LOCALE_SEED: &str = "locales\tlocales/locales_to_be_generated\tmultiselect\ten_GB.UTF-8 UTF-8\n\
locales\tlocales/default_environment_locale\tselect\ten_GB.UTF-8\n";

    fn config(tunnel: bool) -> BuildConfiguration {
        BuildConfiguration {
            hostname: "raspberry".to_string(),
            username: "pi".to_string(),
            password: Secret::new("pw1"),
            country_code: "GB".to_string(),
            ssid: "WiFi".to_string(),
            passphrase: Secret::new("wifi-pass"),
            tunnel: tunnel.then(|| TunnelConfig {
                auth_token: Secret::new("tok123"),
            }),
            locale: "en_US.UTF-8".to_string(),
            timezone: "Europe/London".to_string(),
            keymap: "us".to_string(),
            layout: "English (US)".to_string(),
        }
    }

    fn templates() -> Templates {
        Templates {
            wpa_supplicant: "ctrl_interface=DIR=/var/run/wpa_supplicant GROUP=netdev\nupdate_config=1\n".to_string(),
            locale_debconf: LOCALE_SEED.to_string(),
            keyboard_debconf: KEYBOARD_SEED.to_string(),
        }
    }

    #[test]
    fn test_config_round_trip() {
        let rendered = render_config("raspberry");
        assert_eq!(rendered, "IMG_NAME=raspberry\nHOSTNAME=raspberry\n");

        let parsed = ShellConfig::parse(&rendered).unwrap();
        assert_eq!(parsed.get("IMG_NAME"), Some("raspberry"));
        assert_eq!(parsed.get("HOSTNAME"), Some("raspberry"));
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["IMG_NAME", "HOSTNAME"]);
    }

    #[test]
    fn test_shell_config_quotes_awkward_values() {
        let mut config = ShellConfig::new();
        config
            .set("PLAIN", "en_GB.UTF-8")
            .set("SPACED", "English (UK)")
            .set("QUOTED", "it's")
            .set("EMPTY", "");

        let rendered = config.render();
        assert!(rendered.contains("PLAIN=en_GB.UTF-8\n"));
        assert!(rendered.contains("SPACED='English (UK)'\n"));
        assert!(rendered.contains("QUOTED='it'\\''s'\n"));
        assert!(rendered.contains("EMPTY=''\n"));

        assert_eq!(ShellConfig::parse(&rendered).unwrap(), config);
    }

    #[test]
    fn test_shell_config_parse_double_quotes_and_comments() {
        let parsed = ShellConfig::parse("# pi-gen\n\nA=\"x y\"\nB=\"a\\\"b\"\n").unwrap();
        assert_eq!(parsed.get("A"), Some("x y"));
        assert_eq!(parsed.get("B"), Some("a\"b"));
    }

    #[test]
    fn test_shell_config_parse_errors() {
        assert!(ShellConfig::parse("NOT AN ASSIGNMENT\n").is_err());
        assert!(ShellConfig::parse("1BAD=x\n").is_err());
        assert!(ShellConfig::parse("A='open\n").is_err());
    }

    #[test]
    fn test_user_script() {
        assert_eq!(
            render_user_script("alice", "pw1"),
            "#!/bin/bash -e\non_chroot << EOF\nusermod -l alice pi\nusermod -m -d /home/alice alice\necho -e \"pw1\npw1\" | passwd alice\nEOF\n"
        );
    }

    #[test]
    fn test_wifi_script() {
        let script = render_wifi_script("Home WiFi", "secret");
        assert!(script.starts_with("#!/bin/bash -e\necho \"adding wifi network"));
        assert!(script.contains(
            "  wpa_passphrase \"Home WiFi\" \"secret\" | sed '/^[ \\t]*#/ d' >> /etc/wpa_supplicant/wpa_supplicant.conf\n"
        ));
        assert!(script.ends_with("EOF\n"));
    }

    #[test]
    fn test_wpa_supplicant_gets_country_first() {
        let patched = patch_wpa_supplicant("update_config=1\n", "GB");
        assert_eq!(patched, "country=GB\nupdate_config=1\n");
    }

    #[test]
    fn test_locale_patch_replaces_default_and_generated() {
        let patched = patch_locale(LOCALE_SEED, "en_US.UTF-8");
        assert!(patched.contains("multiselect\ten_US.UTF-8 UTF-8"));
        assert!(patched.contains("default_environment_locale\tselect\ten_US.UTF-8\n"));
        assert!(!patched.contains("en_GB"));
    }

    #[test]
    fn test_keyboard_patch() {
        let patched = patch_keyboard(KEYBOARD_SEED, "us", "English (US)").unwrap();
        assert!(patched.contains("keyboard-configuration/xkb-keymap\tselect\tus\n"));
        assert!(patched.contains("keyboard-configuration/variant\tselect\tEnglish (US)\n"));
        assert!(patched.contains("Generic 105-key (Intl) PC"));
    }

    #[test]
    fn test_keyboard_patch_accepts_space_separated_seed() {
        let seed = "keyboard-configuration  keyboard-configuration/variant  select  English (UK)\n";
        let patched = patch_keyboard(seed, "gb", "English (GB)").unwrap();
        assert_eq!(
            patched,
            "keyboard-configuration  keyboard-configuration/variant  select  English (GB)\n"
        );
    }

    #[test]
    fn test_timezone_script() {
        let script = render_timezone_script("Europe/London");
        assert!(script.contains("echo \"changing timezone to: Europe/London\"\n"));
        assert!(script.contains("  echo 'Europe/London' > /etc/timezone\n"));
    }

    #[test]
    fn test_tunnel_config() {
        assert_eq!(
            render_tunnel_config("tok123"),
            "authtoken: tok123\ntunnels:\n  ssh:\n    proto: tcp\n    addr: 22\n"
        );
    }

    #[test]
    fn test_tunnel_script_paths() {
        let script = render_tunnel_script();
        assert!(script.contains("install -m 755 files/ngrok \"${ROOTFS_DIR}/usr/local/bin/\"\n"));
        assert!(script.contains("install -m 755 files/start_tunnel \"${ROOTFS_DIR}/etc/cron.hourly/\"\n"));
    }

    #[test]
    fn test_layout_without_tunnel_has_no_tunnel_files() {
        let files = render_layout(&config(false), &templates()).unwrap();

        assert!(files.iter().all(|f| !f.path.starts_with(paths::TUNNEL_DIR)));
        assert!(files.iter().all(|f| !f.contents.contains("ngrok")));
    }

    #[test]
    fn test_layout_with_tunnel() {
        let files = render_layout(&config(true), &templates()).unwrap();
        let written: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert!(written.contains(&paths::TUNNEL_RUN));
        assert!(written.contains(&paths::TUNNEL_CONFIG));
        assert!(written.contains(&paths::TUNNEL_CRON));
        let run = files.iter().find(|f| f.path == paths::TUNNEL_RUN).unwrap();
        assert_eq!(run.mode, EXECUTABLE);
    }

    #[test]
    fn test_layout_marks_skipped_stages() {
        let files = render_layout(&config(false), &templates()).unwrap();
        for marker in ["stage3/SKIP", "stage4/SKIP", "stage5/SKIP", "stage4/SKIP_IMAGES", "stage5/SKIP_IMAGES"] {
            let file = files.iter().find(|f| f.path == marker).unwrap();
            assert!(file.contents.is_empty());
        }
    }
}
