/// Global options and the top-level parser built from the command registry.
use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, FromArgMatches};

use crate::BIN_NAME;
use crate::registry::{CommandRegistry, FlagContext};

/// Options accepted before or after any subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Platform API endpoint, overriding the config file.
    #[arg(long, global = true, env = "BPCTL_API", value_name = "URL")]
    pub api: Option<String>,

    /// Path to the config file (default: `$BPCTL_HOME/config.json` or `~/.bpctl/config.json`).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print errors as a JSON envelope on stderr.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// One parsed command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub globals: GlobalArgs,
    /// Registered command name.
    pub command: String,
    pub ctx: FlagContext,
}

/// The full clap command: global options plus one subcommand per registered command.
#[must_use]
pub fn build_cli(registry: &CommandRegistry) -> clap::Command {
    let cmd = clap::Command::new(BIN_NAME)
        .about("Manage platform buildpacks from the CLI")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true);
    GlobalArgs::augment_args(cmd).subcommands(registry.clap_commands())
}

/// Parse `argv` against `registry`.
///
/// # Errors
///
/// Returns the clap error for help/version requests and malformed flags.
pub fn parse_invocation<I, T>(registry: &CommandRegistry, argv: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli(registry).try_get_matches_from(argv)?;
    let globals = GlobalArgs::from_arg_matches(&matches)?;
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| clap::Error::new(clap::error::ErrorKind::MissingSubcommand))?;
    let metadata = registry
        .metadata(name)
        .ok_or_else(|| clap::Error::new(clap::error::ErrorKind::InvalidSubcommand))?;
    Ok(Invocation {
        globals,
        command: name.to_owned(),
        ctx: FlagContext::from_matches(metadata, sub),
    })
}
