//! Layered configuration resolution.
//!
//! A [`ConfigResolver`] assembles one flat, namespaced key space from a
//! hierarchy of `key=value` files:
//! 1. **Bootstrap** - a fixed-name file that selects the runtime environment
//!    and extra search directories
//! 2. **Defaults** - `defaults-ee.properties`
//! 3. **Environment** - `<environment>-ee.properties` (e.g. `production-ee.properties`)
//!
//! Later files override earlier ones key by key. Each file is looked up in the
//! configured search directories first, then relative to the caller's
//! [`ResourceRoot`].
//!
//! ## Value syntax
//! - `key = value` - plain string, surrounding whitespace trimmed
//! - `key = [Integer] 42` - typed value (see [`TypeTag`])
//! - `key = ${other}/suffix` - variable reference resolved against system
//!   properties, environment variables, then other properties
//!
//! ## Setting precedence
//! Bootstrap-layer settings (the constants in this module) resolve as
//! call-site options > system properties > already-loaded properties.

mod coerce;
mod definitions;
mod files;
mod loader;
mod options;
mod properties;
mod store;
mod substitute;

pub use coerce::{Coerced, DATE_FORMAT, DATE_TIME_FORMAT, TypeTag, TypedValue, coerce, convert};
pub use definitions::{DefinitionKind, LoadDefinition, LoadDefinitionLog};
pub use files::{
    EmbeddedFiles, Located, Lookup, Origin, ResourceRoot, ResourceSource, locate,
    locate_file_or_resource,
};
pub use loader::{ConfigResolver, LoadOutcome, ResolverState, file_name_for};
pub use options::{Options, SystemProperties, parse_search_paths, resolve_flag, resolve_setting};
pub use properties::{PropertySet, parse};
pub use store::{MergeEntry, PropertyStore};
pub use substitute::{
    Chained, MAX_EXPANDED_LENGTH, MAX_EXPANSION_DEPTH, MAX_SUBSTITUTION_PASSES,
    SubstitutionReport, Substitutor, VariableSource,
};

/// Namespace prefix shared by every setting key.
pub const NAMESPACE: &str = "eeprops";

pub const RUNTIME_ENVIRONMENT: &str = "eeprops.runtime.environment";
pub const ADDITIONAL_CONFIGURATION_PATHS: &str = "eeprops.runtime.additionalConfigurationPaths";
pub const CONFIGURATION_FILE_PREFIX: &str = "eeprops.configurationFile.prefix";
pub const CONFIGURATION_FILE_SUFFIX: &str = "eeprops.configurationFile.suffix";
pub const CONFIGURATION_FILE_EXTENSION: &str = "eeprops.configurationFile.extension";
pub const BOOTSTRAP_FILE_NAME_KEY: &str = "eeprops.bootstrap.fileName";
pub const CONSOLE_TRACING: &str = "eeprops.consoleTracing";
pub const BOOTSTRAP_LOGGING: &str = "eeprops.bootstrapLogging";
pub const BOOTSTRAP_LOGGING_FILE_KEY: &str = "eeprops.bootstrapLogging.configurationFile";
pub const EXTENDED_SYNTAX_ENABLED: &str = "eeprops.extendedPropertiesSyntax.enabled";
/// Minimum level for the resolver's own messages: trace, debug, info, warn or error.
pub const LOG_LEVEL: &str = "eeprops.logLevel";

pub const BOOTSTRAP_FILE_NAME: &str = "eeprops-bootstrap.properties";
pub const BOOTSTRAP_LOGGING_FILE_NAME: &str = "eeprops-logging-bootstrap.properties";

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULTS_NAME: &str = "defaults";
pub const DEFAULT_SUFFIX: &str = "-ee";
pub const DEFAULT_EXTENSION: &str = "properties";
