/// Command table and the requirement-gated dispatch path.
pub mod create_buildpack;
pub mod errors;

pub use errors::{CommandError, DispatchError};

use tracing::info;

use crate::registry::{CommandRegistry, Dependencies, FlagContext};
use crate::requirements::{RequirementsFactory, run_all};
use create_buildpack::CreateBuildpack;

/// Every command this binary ships.
#[must_use]
pub fn builtin_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(CreateBuildpack::metadata, CreateBuildpack::from_deps);
    registry
}

/// Build `name`, gate it behind its requirements, then execute it.
///
/// No requirement runs when the arity check fails, and `execute` is never
/// reached when a requirement fails.
///
/// # Errors
///
/// Returns `DispatchError::Usage` for argument-contract violations and
/// `DispatchError::Command` for requirement, validation or remote failures.
pub fn dispatch(
    registry: &CommandRegistry,
    name: &str,
    ctx: &FlagContext,
    deps: &Dependencies,
    requirements: &dyn RequirementsFactory,
) -> Result<(), DispatchError> {
    let command = registry
        .build(name, deps)
        .ok_or_else(|| DispatchError::UnknownCommand {
            name: name.to_owned(),
        })?;

    let reqs = command.requirements(requirements, ctx)?;
    run_all(&reqs).map_err(CommandError::from)?;

    info!(command = name, "executing");
    command.execute(ctx)?;
    Ok(())
}
