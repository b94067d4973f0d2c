//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the companion assistant.

use clap::{Args, Parser, Subcommand};

/// Companion - personal on-device assistant
///
/// Starts an interactive session. Faces unlock personal features, personas
/// set the tone, and voice input and spoken replies are optional.
#[derive(Parser, Debug)]
#[command(name = "companion")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "COMPANION_CONFIG", global = true)]
    pub config: Option<String>,

    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand, with a bare invocation meaning `run`.
    pub fn resolved_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Run(RunArgs::default()))
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive session (default)
    Run(RunArgs),

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Inspect personas
    Persona {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },

    /// Inspect enrolled face profiles
    Profiles {
        #[command(subcommand)]
        subcommand: ProfilesSubcommand,
    },
}

/// Session overrides for `run`
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Persona used after unlocking (overrides assistant.default_persona)
    #[arg(long, env = "COMPANION_PERSONA")]
    pub persona: Option<String>,

    /// Language model for this session
    #[arg(long)]
    pub model: Option<String>,

    /// Start with voice input off
    #[arg(long)]
    pub no_voice: bool,

    /// Allow /login without a face match (development only)
    #[arg(long)]
    pub dev_login: bool,
}

/// Persona subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List bundled and user-defined personas
    List,

    /// Show one persona definition
    Show {
        /// Persona id, e.g. casual
        persona: String,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProfilesSubcommand {
    /// List enrolled profiles
    List,
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_runs() {
        let cli = Cli::parse_from(["companion"]);
        match cli.resolved_command() {
            Commands::Run(args) => {
                assert!(args.persona.is_none());
                assert!(!args.no_voice);
                assert!(!args.dev_login);
            }
            other => panic!("Expected Run command, got {:?}", other),
        }
    }

    #[test]
    fn test_run_with_overrides() {
        let cli = Cli::parse_from([
            "companion",
            "run",
            "--persona",
            "professor",
            "--model",
            "llama3.1:8b",
            "--no-voice",
            "--dev-login",
        ]);
        match cli.resolved_command() {
            Commands::Run(args) => {
                assert_eq!(args.persona.as_deref(), Some("professor"));
                assert_eq!(args.model.as_deref(), Some("llama3.1:8b"));
                assert!(args.no_voice);
                assert!(args.dev_login);
            }
            other => panic!("Expected Run command, got {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["companion", "config", "show", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.toml"));
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                subcommand: ConfigSubcommand::Show
            })
        ));
    }

    #[test]
    fn test_persona_show() {
        let cli = Cli::parse_from(["companion", "persona", "show", "casual"]);
        match cli.command {
            Some(Commands::Persona {
                subcommand: PersonaSubcommand::Show { persona },
            }) => assert_eq!(persona, "casual"),
            other => panic!("Expected Persona Show command, got {:?}", other),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["companion", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["companion", "config", "init", "--force"]);
        match cli.command {
            Some(Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            }) => {
                assert!(path.is_none());
                assert!(force);
            }
            other => panic!("Expected Config Init command, got {:?}", other),
        }
    }
}
