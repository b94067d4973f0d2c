//! Companion - personal on-device assistant
//!
//! Entry point for the `companion` binary. Parses the command line, loads
//! configuration, sets up logging, and either runs an interactive session
//! or one of the inspection commands.

mod auth;
mod backend;
mod biometric;
mod calendar;
mod cli;
mod config;
mod error;
mod intent;
mod logging;
mod nav;
mod orchestrator;
mod persona;
mod process;
mod router;
mod session;
mod speech;
mod store;
mod version;

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, ConfigSubcommand, PersonaSubcommand, ProfilesSubcommand, RunArgs};
use crate::config::AssistantConfig;
use crate::error::{Error, Result};
use crate::logging::AUDIT_TARGET;
use crate::orchestrator::{run_repl, LineSource, Services, SessionOrchestrator};
use crate::persona::PersonaRegistry;
use crate::store::ProfileStore;

fn main() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();
    let command = cli.resolved_command();

    match command {
        Commands::Version => {
            version::print_version();
            return Ok(());
        }
        Commands::Config { ref subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(subcommand, cli.config.as_deref());
        }
        _ => {}
    }

    let config = match AssistantConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => exit_with(&e),
    };

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting Companion"
    );

    let outcome = match command {
        Commands::Run(args) => run_session(config, args),
        Commands::Persona { subcommand } => handle_persona_command(&config, &subcommand),
        Commands::Profiles { subcommand } => handle_profiles_command(&config, &subcommand),
        Commands::Version | Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = outcome {
        exit_with(&e);
    }
    Ok(())
}

fn exit_with(error: &Error) -> ! {
    eprint!("{}", error.format_for_terminal());
    std::process::exit(error.exit_code());
}

/// Run one interactive session until /exit or end of input
fn run_session(mut config: AssistantConfig, args: RunArgs) -> Result<()> {
    if let Some(persona) = args.persona {
        config.assistant.default_persona = persona;
    }
    if let Some(model) = args.model {
        config.llm.default_model = model;
    }
    if args.no_voice {
        config.voice.voice_mode_default = false;
    }
    if args.dev_login {
        warn!(target: AUDIT_TARGET, "Development login enabled from the command line");
        config.auth.allow_dev_login = true;
    }

    info!(
        persona = %config.assistant.default_persona,
        model = %config.llm.default_model,
        provider = %config.llm.provider,
        strict_auth = config.auth.strict_auth,
        "Configuration loaded"
    );
    info!(data_dir = %config.storage.data_dir, "Storage paths configured");

    ensure_directories(&config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    runtime.block_on(async move {
        let services = Services::from_config(&config)?;
        match services.backend.health_check().await {
            Ok(health) if !health.operational => warn!(
                backend = services.backend.name(),
                error = health.error.as_deref().unwrap_or("unknown"),
                "Language model backend is not reachable; replies will fail until it is"
            ),
            Ok(_) => info!(backend = services.backend.name(), "Language model backend is reachable"),
            Err(e) => warn!(error = %e, "Backend health check failed"),
        }
        let mut orchestrator = SessionOrchestrator::from_config(config, services)?;
        let mut input = LineSource::stdin()?;
        run_repl(&mut orchestrator, &mut input).await
    })
}

/// Ensure required storage directories exist
fn ensure_directories(config: &AssistantConfig) -> Result<()> {
    for path in [config.data_dir(), config.places_dir(), config.templates_dir()] {
        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| Error::IoWrite {
                path: path.clone(),
                source: e,
            })?;
            info!(path = %path.display(), "Created directory");
        }
    }
    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: &ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let mut cfg = AssistantConfig::load(config_path)?;
            if !cfg.llm.api_key.is_empty() {
                cfg.llm.api_key = "********".to_string();
            }
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), *force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate => match AssistantConfig::load(config_path) {
            Ok(_) => println!("Configuration is valid."),
            Err(e) => exit_with(&e),
        },
    }

    Ok(())
}

/// Handle persona subcommands
fn handle_persona_command(config: &AssistantConfig, subcommand: &PersonaSubcommand) -> Result<()> {
    let registry = PersonaRegistry::load(&config.personas_dir())?;

    match subcommand {
        PersonaSubcommand::List => {
            for persona in registry.iter() {
                let marker = if persona.id == config.assistant.default_persona {
                    '*'
                } else {
                    ' '
                };
                let lock = if persona.requires_unlock { "" } else { " (guest)" };
                println!(
                    "{} {:<12} {}{}",
                    marker, persona.id, persona.description, lock
                );
            }
        }
        PersonaSubcommand::Show { persona } => {
            let definition = registry.resolve(persona)?;
            println!("{}", toml::to_string_pretty(definition)?);
        }
    }

    Ok(())
}

/// Handle profile subcommands
fn handle_profiles_command(config: &AssistantConfig, subcommand: &ProfilesSubcommand) -> Result<()> {
    let profiles = ProfileStore::open(config.profiles_path(), config.templates_dir())?;

    match subcommand {
        ProfilesSubcommand::List => {
            if profiles.is_empty() {
                println!("No profiles enrolled.");
            }
            for entry in profiles.iter() {
                println!(
                    "{:<16} {:>3} samples  enrolled {}",
                    entry.name,
                    entry.sample_count,
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }

    Ok(())
}
