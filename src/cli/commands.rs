// file: src/cli/commands.rs
// version: 2.0.0
// guid: g7h8i9j0-k1l2-3456-7890-123456ghijkl

//! Command implementations for the CLI

use crate::{
    cli::args::Cli,
    config::{validator, BuildConfiguration, ConfigCollector, ConfigLoader, ConfigurationInput},
    error::ConfiguratorError,
    image::{ArtifactRelocator, BuildPhase, PhaseTracker, ARTIFACTS_DIR},
    logging::{logger::with_operation_span, BuildLog},
    pigen::{
        BuildDispatcher, PiGenRepository, PiGenWorkspace, TunnelInstaller, CONTAINER_NAME,
        WORK_DIR_NAME,
    },
    prompt::{NonInteractivePrompter, Prompter, TerminalPrompter},
    utils::SystemUtils,
    Result,
};
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, info_span, Instrument};

/// Collect, configure, build and relocate in the current directory
pub async fn build_image_command(cli: &Cli, log: &BuildLog) -> Result<()> {
    let mut phases = PhaseTracker::new();
    phases.advance(BuildPhase::CollectingConfig);

    let file = ConfigLoader::new().load(cli.config.as_ref())?;
    let input = cli.settings().merge(file.settings);

    let collected = if cli.non_interactive {
        collect_configuration(&mut NonInteractivePrompter, input)
    } else {
        collect_configuration(&mut TerminalPrompter::stdio(), input)
    };
    let config = match collected {
        Ok(config) => config,
        Err(e) => {
            phases.advance(BuildPhase::Failed);
            return Err(e);
        }
    };
    print_summary(&config, &mut io::stdout())?;

    let cwd = std::env::current_dir()?;
    let work_dir = cwd.join(WORK_DIR_NAME);
    let relocator = ArtifactRelocator::new(
        PiGenWorkspace::new(&work_dir).deploy_dir(),
        cwd.join(ARTIFACTS_DIR),
    );

    preflight(&config, &relocator).await?;

    let workspace = PiGenRepository::new(file.pi_gen.clone())
        .checkout(&work_dir)
        .instrument(info_span!("operation", name = "checkout"))
        .await?;

    if config.tunnel.is_some() {
        TunnelInstaller::new(file.tunnel_download_url.as_str())
            .install(&workspace)
            .instrument(info_span!("operation", name = "tunnel"))
            .await?;
    }

    let dispatcher = BuildDispatcher::new(workspace, file.pi_gen.build_script.as_str(), log.clone());
    let artifacts = build_and_relocate(&config, &dispatcher, &relocator, &mut phases).await?;

    if cli.keep_work_dir {
        info!("Keeping {}", work_dir.display());
    } else {
        SystemUtils::remove_dir_if_exists(&work_dir).await?;
    }

    info!(
        "Build complete: {} artifact(s) in {}, log in {}",
        artifacts.len(),
        relocator.destination().display(),
        log.path().display()
    );
    Ok(())
}

/// Resolve every setting through `prompter` and validate the result
pub fn collect_configuration<P: Prompter + ?Sized>(
    prompter: &mut P,
    input: ConfigurationInput,
) -> Result<BuildConfiguration> {
    with_operation_span("collect", || {
        let config = ConfigCollector::new(prompter).collect(input)?;
        validator::validate(&config)?;
        Ok(config)
    })
}

/// Write the configuration into `dispatcher`'s checkout, build, and move the
/// images; nothing is relocated when the build fails
pub async fn build_and_relocate(
    config: &BuildConfiguration,
    dispatcher: &BuildDispatcher,
    relocator: &ArtifactRelocator,
    phases: &mut PhaseTracker,
) -> Result<Vec<PathBuf>> {
    phases.advance(BuildPhase::DispatchingBuild);
    let built = dispatcher
        .dispatch(config)
        .instrument(info_span!("operation", name = "build"))
        .await;

    if let Err(e) = built {
        phases.advance(BuildPhase::Failed);
        return Err(e);
    }
    phases.advance(BuildPhase::Succeeded);

    phases.advance(BuildPhase::RelocatingArtifacts);
    with_operation_span("relocate", || relocator.relocate())
}

/// Clear leftovers of an earlier run and check the host tools
async fn preflight(config: &BuildConfiguration, relocator: &ArtifactRelocator) -> Result<()> {
    let missing = SystemUtils::check_prerequisites(config.tunnel.is_some());
    if !missing.is_empty() {
        return Err(ConfiguratorError::system(format!(
            "Missing required commands: {}",
            missing.join(", ")
        )));
    }

    if SystemUtils::is_root() {
        info!("Running as root");
    } else {
        info!("Not running as root - docker must be usable by this user");
    }

    relocator.clear_previous()?;
    SystemUtils::remove_stale_container(CONTAINER_NAME).await?;
    Ok(())
}

/// Print the resolved settings; secrets show as redacted
pub fn print_summary<W: Write>(config: &BuildConfiguration, out: &mut W) -> Result<()> {
    writeln!(out, "{}", "Image configuration".bold())?;
    for (name, value) in config.summary() {
        writeln!(out, "  {:<14} {}", format!("{}:", name).bold(), value.cyan())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    fn configuration() -> BuildConfiguration {
        BuildConfiguration {
            hostname: "raspberry".to_string(),
            username: "pi".to_string(),
            password: Secret::new("hunter2"),
            country_code: "GB".to_string(),
            ssid: "WiFi".to_string(),
            passphrase: Secret::new("wifipass"),
            tunnel: None,
            locale: "en_GB.UTF-8".to_string(),
            timezone: "Europe/London".to_string(),
            keymap: "gb".to_string(),
            layout: "English (GB)".to_string(),
        }
    }

    #[test]
    fn test_summary_redacts_secrets() {
        colored::control::set_override(false);
        let mut out = Vec::new();

        print_summary(&configuration(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("raspberry"));
        assert!(text.contains("English (GB)"));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("wifipass"));
    }

    #[test]
    fn test_non_interactive_collection_fails_on_missing_value() {
        let input = ConfigurationInput {
            hostname: Some("raspberry".to_string()),
            ..Default::default()
        };

        let err = collect_configuration(&mut NonInteractivePrompter, input).unwrap_err();

        assert!(matches!(err, ConfiguratorError::MissingRequiredValue(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_collected_values_are_validated() {
        let input = ConfigurationInput {
            hostname: Some("bad host".to_string()),
            username: Some("pi".to_string()),
            password: Some("hunter2".to_string()),
            country_code: Some("GB".to_string()),
            ssid: Some("WiFi".to_string()),
            passphrase: Some("wifipass".to_string()),
            skip_tunnel: true,
            authtoken: None,
            locale: Some("en_GB.UTF-8".to_string()),
            timezone: Some("Europe/London".to_string()),
            keymap: Some("gb".to_string()),
            layout: Some("English (GB)".to_string()),
        };

        let err = collect_configuration(&mut NonInteractivePrompter, input).unwrap_err();

        assert!(matches!(err, ConfiguratorError::InvalidValue(_)));
    }
}
