/// `create-buildpack` command: create buildpack metadata, then upload its bits.
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::info;

use crate::BIN_NAME;
use crate::api::{ApiError, Buildpack, BuildpackBitsRepository, BuildpackRepository, OptionIntent};
use crate::cli::Ui;
use crate::registry::{
    Command, CommandMetadata, Dependencies, FlagContext, FlagSpec, UsageError, check_arity,
};
use crate::requirements::{Requirement, RequirementsFactory};

use super::CommandError;

pub const NAME: &str = "create-buildpack";

const ENABLE_FLAG: &str = "enable";
const DISABLE_FLAG: &str = "disable";
const ARITY_MESSAGE: &str = "Requires buildpack_name, path and position as arguments";

/// Creates a buildpack record and uploads the artifact for it.
pub struct CreateBuildpack {
    ui: Rc<dyn Ui>,
    buildpack_repo: Rc<dyn BuildpackRepository>,
    buildpack_bits_repo: Rc<dyn BuildpackBitsRepository>,
}

impl CreateBuildpack {
    /// Argument contract: `NAME PATH POSITION [--enable|--disable]`.
    #[must_use]
    pub fn metadata() -> CommandMetadata {
        let mut flags = BTreeMap::new();
        flags.insert(
            ENABLE_FLAG,
            FlagSpec {
                name: ENABLE_FLAG,
                usage: "Enable the buildpack to be used for staging",
            },
        );
        flags.insert(
            DISABLE_FLAG,
            FlagSpec {
                name: DISABLE_FLAG,
                usage: "Disable the buildpack from being used for staging",
            },
        );

        CommandMetadata {
            name: NAME,
            description: "Create a buildpack",
            usage: vec![
                format!("{BIN_NAME} {NAME} BUILDPACK PATH POSITION [--enable|--disable]"),
                "\n\nTIP:\n".to_owned(),
                "   Path should be a zip file, a url to a zip file, or a local directory. \
                 Position is a positive integer, sets priority, and is sorted from lowest to highest."
                    .to_owned(),
            ],
            flags,
            total_args: 3,
        }
    }

    /// Factory used by the command registry.
    #[must_use]
    pub fn from_deps(deps: &Dependencies) -> Box<dyn Command> {
        Box::new(Self {
            ui: Rc::clone(&deps.ui),
            buildpack_repo: deps.repo_locator.buildpack_repository(),
            buildpack_bits_repo: deps.repo_locator.buildpack_bits_repository(),
        })
    }

    /// Resolve the position and flags, then create the buildpack record.
    ///
    /// Validation errors are returned before any remote call.
    fn create_buildpack(
        &self,
        name: &str,
        raw_position: &str,
        ctx: &FlagContext,
    ) -> Result<Buildpack, CommandError> {
        let position = parse_position(raw_position)?;
        let intent = resolve_enable_intent(ctx.bool(ENABLE_FLAG), ctx.bool(DISABLE_FLAG))?;

        info!(buildpack = name, position, ?intent, "creating buildpack");
        Ok(self
            .buildpack_repo
            .create(name, Some(position), intent, None)?)
    }
}

impl Command for CreateBuildpack {
    fn requirements(
        &self,
        factory: &dyn RequirementsFactory,
        ctx: &FlagContext,
    ) -> Result<Vec<Box<dyn Requirement>>, UsageError> {
        check_arity(&Self::metadata(), ctx, ARITY_MESSAGE)?;
        Ok(vec![factory.new_login_requirement()])
    }

    fn execute(&self, ctx: &FlagContext) -> Result<(), CommandError> {
        let [name, path, position] = ctx.args() else {
            return Err(UsageError {
                message: ARITY_MESSAGE.to_owned(),
                usage: Self::metadata().usage_text(),
            }
            .into());
        };

        self.ui.say(&format!("Creating buildpack {name}..."));
        let buildpack = match self.create_buildpack(name, position, ctx) {
            Ok(buildpack) => buildpack,
            Err(CommandError::Api(ApiError::NameTaken { description })) => {
                info!(buildpack = name, %description, "buildpack already exists, skipping upload");
                self.ui.ok();
                self.ui.warn(&format!("Buildpack {name} already exists"));
                self.ui.say(&format!(
                    "TIP: use '{BIN_NAME} update-buildpack' to update this buildpack"
                ));
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        self.ui.ok();
        self.ui.say("");

        self.ui.say(&format!("Uploading buildpack {name}..."));
        info!(buildpack = name, guid = %buildpack.guid, "uploading buildpack bits");
        self.buildpack_bits_repo
            .upload_buildpack(&buildpack, path)?;

        self.ui.ok();
        Ok(())
    }
}

/// Parse the position argument.
///
/// # Errors
///
/// Returns `CommandError::InvalidPosition` naming `raw` if it is not an integer.
pub fn parse_position(raw: &str) -> Result<i32, CommandError> {
    raw.parse::<i32>()
        .map_err(|_| CommandError::InvalidPosition {
            value: raw.to_owned(),
        })
}

/// Fold the `--enable` / `--disable` switches into one intent.
///
/// # Errors
///
/// Returns `CommandError::ConflictingFlags` if both are set.
pub fn resolve_enable_intent(enable: bool, disable: bool) -> Result<OptionIntent, CommandError> {
    match (enable, disable) {
        (true, true) => Err(CommandError::ConflictingFlags),
        (true, false) => Ok(OptionIntent::Enabled),
        (false, true) => Ok(OptionIntent::Disabled),
        (false, false) => Ok(OptionIntent::Unspecified),
    }
}
