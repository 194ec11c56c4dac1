#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! bpctl — manage platform buildpacks from the CLI.

mod api;
mod cli;
mod commands;
mod config;
mod registry;
mod requirements;
mod types;

use std::rc::Rc;

use api::RepoLocator;
use cli::{TerminalUi, write_error, write_usage_error};
use commands::DispatchError;
use config::ConfigLoader;
use registry::Dependencies;
use requirements::ConfigRequirementsFactory;
use types::ErrorOutput;

/// Name used in usage lines and hints.
pub(crate) const BIN_NAME: &str = "bpctl";

fn main() {
    let registry = commands::builtin_registry();
    let invocation = match cli::parse_invocation(&registry, std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    };
    let json = invocation.globals.json;

    cli::logging::init_tracing(invocation.globals.verbose);

    // The config is read lazily, after the arity check has passed.
    let lookup = |key: &str| std::env::var(key).ok();
    let path = config::config_path(invocation.globals.config.as_deref(), lookup);
    let config = Rc::new(ConfigLoader::new(path, invocation.globals.api.clone(), lookup));
    let deps = Dependencies {
        ui: Rc::new(TerminalUi),
        repo_locator: RepoLocator::connect(Rc::clone(&config)),
    };
    let requirements = ConfigRequirementsFactory::new(config);

    match commands::dispatch(
        &registry,
        &invocation.command,
        &invocation.ctx,
        &deps,
        &requirements,
    ) {
        Ok(()) => {}
        Err(DispatchError::Usage(usage)) => {
            write_usage_error(&usage);
            std::process::exit(commands::errors::EXIT_USAGE);
        }
        Err(err) => {
            write_error(&ErrorOutput::from_dispatch_error(&err), json);
            std::process::exit(err.exit_code());
        }
    }
}
