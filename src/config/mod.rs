//! Layered test-suite configuration.
//!
//! Resolves configuration from several YAML layers with key-by-key merging:
//! 1. **Defaults** - built into the crate
//! 2. **Project** - `codeception.dist.yml`, then `codeception.yml`
//! 3. **Suite** - `<suite>.suite.dist.yml`, then `<suite>.suite.yml`
//! 4. **Environment** - `<envs>/<name>.dist.yml`, then `<envs>/<name>.yml`
//!
//! ## Merge Strategy
//! - Mappings: deep merge, the later layer wins on each key
//! - Lists and scalars: replaced entirely by the later layer
//!
//! ## Parameters
//! Suite and environment files may reference `%name%` placeholders, filled
//! from the sources listed under `params` (inline mappings, the process
//! environment, YAML, INI and `.env` files).

mod files;
mod includes;
mod loader;
mod merge;
mod params;
mod suites;
mod template;
mod value;

pub use files::{load_file, load_optional};
pub use includes::{CONFIG_FILE_NAMES, expand_includes};
pub use loader::{CONFIG_DIST_FILE, CONFIG_FILE, Configuration, default_config};
pub use merge::{merge_all, merge_configs};
pub use params::{ParamSource, Params, parse_ini, prepare_params};
pub use suites::{
    default_suite_settings, discover_suites, enabled_modules, load_env_configs, load_suite_config,
    suite_environments,
};
pub use template::{DEFAULT_DELIMITER, Template};
pub use value::{ConfigTree, empty_map, scalar_to_string};
