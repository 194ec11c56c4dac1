/// Command table: metadata, invocation context and the explicit registry.
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use clap::{Arg, ArgAction, ArgMatches};
use thiserror::Error;

use crate::api::RepoLocator;
use crate::cli::output::Ui;
use crate::commands::CommandError;
use crate::requirements::{Requirement, RequirementsFactory};

/// Clap id of the free positional list every registered command accepts.
const ARGS_ID: &str = "args";

/// A boolean switch declared by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: &'static str,
    pub usage: &'static str,
}

/// Immutable description of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    /// Unique name within the registry.
    pub name: &'static str,
    pub description: &'static str,
    /// Usage lines, printed in order.
    pub usage: Vec<String>,
    /// Flags keyed by name.
    pub flags: BTreeMap<&'static str, FlagSpec>,
    /// Exact number of positional arguments.
    pub total_args: usize,
}

impl CommandMetadata {
    /// Help text in the `NAME / USAGE / OPTIONS` layout.
    #[must_use]
    pub fn usage_text(&self) -> String {
        let mut out = format!(
            "NAME:\n   {} - {}\n\nUSAGE:\n   {}",
            self.name,
            self.description,
            self.usage.concat()
        );
        if !self.flags.is_empty() {
            let width = self.flags.keys().map(|n| n.len()).max().unwrap_or(0);
            out.push_str("\n\nOPTIONS:");
            for flag in self.flags.values() {
                let _ = write!(out, "\n   --{:<width$}   {}", flag.name, flag.usage);
            }
        }
        out
    }

    /// The clap subcommand for this command.
    ///
    /// Positional arguments are collected into one list so arity is judged
    /// by [`check_arity`] with the command's own message.
    #[must_use]
    pub fn to_clap(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.name)
            .about(self.description)
            .override_usage(self.usage.concat())
            .arg(
                Arg::new(ARGS_ID)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .value_name("ARGS")
                    .allow_negative_numbers(true),
            );
        for flag in self.flags.values() {
            cmd = cmd.arg(
                Arg::new(flag.name)
                    .long(flag.name)
                    .help(flag.usage)
                    .action(ArgAction::SetTrue),
            );
        }
        cmd
    }
}

/// Parsed positional arguments and flag values for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagContext {
    args: Vec<String>,
    bools: BTreeMap<String, bool>,
}

impl FlagContext {
    #[must_use]
    pub fn new(args: Vec<String>, bools: BTreeMap<String, bool>) -> Self {
        Self { args, bools }
    }

    /// Read the invocation out of the subcommand matches for `metadata`.
    #[must_use]
    pub fn from_matches(metadata: &CommandMetadata, matches: &ArgMatches) -> Self {
        let args = matches
            .get_many::<String>(ARGS_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let bools = metadata
            .flags
            .keys()
            .map(|name| ((*name).to_owned(), matches.get_flag(name)))
            .collect();
        Self { args, bools }
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Value of a boolean flag; absent flags read as `false`.
    #[must_use]
    pub fn bool(&self, name: &str) -> bool {
        self.bools.get(name).copied().unwrap_or(false)
    }
}

/// The invocation does not match the command's argument contract.
///
/// Distinct from [`CommandError`]: it is never recovered from and ends the
/// process with the usage text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Incorrect Usage. {message}")]
pub struct UsageError {
    pub message: String,
    pub usage: String,
}

/// Fail with `message` unless exactly `total_args` positionals were given.
///
/// # Errors
///
/// Returns `UsageError` on an arity mismatch.
pub fn check_arity(
    metadata: &CommandMetadata,
    ctx: &FlagContext,
    message: &str,
) -> Result<(), UsageError> {
    if ctx.args().len() == metadata.total_args {
        return Ok(());
    }
    Err(UsageError {
        message: message.to_owned(),
        usage: metadata.usage_text(),
    })
}

/// A runnable command.
pub trait Command {
    /// Validate arity and list the prerequisites to check before `execute`.
    ///
    /// # Errors
    ///
    /// Returns `UsageError` when the invocation breaks the argument contract.
    fn requirements(
        &self,
        factory: &dyn RequirementsFactory,
        ctx: &FlagContext,
    ) -> Result<Vec<Box<dyn Requirement>>, UsageError>;

    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` on validation or remote failure, and
    /// `CommandError::Usage` if called with arguments `requirements` rejects.
    fn execute(&self, ctx: &FlagContext) -> Result<(), CommandError>;
}

/// Collaborators handed to command factories.
#[derive(Clone)]
pub struct Dependencies {
    pub ui: Rc<dyn Ui>,
    pub repo_locator: RepoLocator,
}

/// Builds the metadata of a command without any collaborators.
pub type MetadataFn = fn() -> CommandMetadata;
/// Builds a command wired to its collaborators.
pub type FactoryFn = fn(&Dependencies) -> Box<dyn Command>;

struct CommandEntry {
    metadata: CommandMetadata,
    factory: FactoryFn,
}

/// Explicit name → command table, populated at startup.
#[derive(Default)]
pub struct CommandRegistry {
    entries: BTreeMap<&'static str, CommandEntry>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. A later registration under the same name replaces the earlier one.
    pub fn register(&mut self, metadata: MetadataFn, factory: FactoryFn) {
        let metadata = metadata();
        tracing::trace!(command = metadata.name, "registering command");
        self.entries
            .insert(metadata.name, CommandEntry { metadata, factory });
    }

    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<&CommandMetadata> {
        self.entries.get(name).map(|e| &e.metadata)
    }

    /// Instantiate `name` with `deps`.
    #[must_use]
    pub fn build(&self, name: &str, deps: &Dependencies) -> Option<Box<dyn Command>> {
        self.entries.get(name).map(|e| (e.factory)(deps))
    }

    /// Clap subcommands for every registered command, in name order.
    pub fn clap_commands(&self) -> impl Iterator<Item = clap::Command> + '_ {
        self.entries.values().map(|e| e.metadata.to_clap())
    }
}
