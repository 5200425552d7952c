//! Configuration resolver: bootstrap, layered loading and reload.
//!
//! Loads run through one pipeline: locate -> parse -> trim -> substitute ->
//! coerce -> merge -> record. No step returns an error to the caller; every
//! failure is logged and reported through [`LoadOutcome`].

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset};
use tracing::subscriber::DefaultGuard;

use super::coerce::{TypeTag, TypedValue, coerce};
use super::definitions::{DefinitionKind, LoadDefinition, LoadDefinitionLog};
use super::files::{Located, Lookup, Origin, ResourceRoot, locate, locate_file_or_resource};
use super::options::{Options, SystemProperties, parse_search_paths, resolve_flag, resolve_setting};
use super::properties;
use super::store::{MergeEntry, PropertyStore};
use super::substitute::{
    MAX_EXPANDED_LENGTH, MAX_EXPANSION_DEPTH, MAX_SUBSTITUTION_PASSES, Substitutor,
};
use super::{
    ADDITIONAL_CONFIGURATION_PATHS, BOOTSTRAP_FILE_NAME, BOOTSTRAP_FILE_NAME_KEY,
    BOOTSTRAP_LOGGING, BOOTSTRAP_LOGGING_FILE_KEY, BOOTSTRAP_LOGGING_FILE_NAME,
    CONFIGURATION_FILE_EXTENSION, CONFIGURATION_FILE_PREFIX, CONFIGURATION_FILE_SUFFIX,
    CONSOLE_TRACING, DEFAULT_ENVIRONMENT, DEFAULT_EXTENSION, DEFAULT_SUFFIX, DEFAULTS_NAME,
    EXTENDED_SYNTAX_ENABLED, LOG_LEVEL, NAMESPACE, RUNTIME_ENVIRONMENT,
};
use crate::error::LoadError;
use crate::logging::{BootstrapLogging, LogLevel, LogLevelFilter, Logger};

/// Result of loading one file.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The whole file was merged.
    Loaded { origin: Origin, keys: usize },
    /// No candidate location had the file.
    NotFound { file_name: String },
    /// The file was found but could not be read or parsed; nothing was merged.
    Failed { file_name: String, error: LoadError },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadOutcome::NotFound { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LoadOutcome::Failed { .. })
    }
}

/// Settings established by bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverState {
    pub runtime_environment: String,
    /// Append-only; never de-duplicated or reordered.
    pub search_paths: Vec<String>,
    pub extended_syntax: bool,
    pub bootstrap_loaded: bool,
}

impl Default for ResolverState {
    fn default() -> Self {
        Self {
            runtime_environment: DEFAULT_ENVIRONMENT.to_string(),
            search_paths: Vec::new(),
            extended_syntax: true,
            bootstrap_loaded: false,
        }
    }
}

/// Build `{prefix}{name}{suffix}.{extension}`, omitting absent components.
pub fn file_name_for(
    prefix: Option<&str>,
    name: &str,
    suffix: Option<&str>,
    extension: Option<&str>,
) -> String {
    let mut file_name = String::new();
    if let Some(prefix) = prefix {
        file_name.push_str(prefix);
    }
    file_name.push_str(name);
    if let Some(suffix) = suffix {
        file_name.push_str(suffix);
    }
    if let Some(extension) = extension {
        file_name.push('.');
        file_name.push_str(extension);
    }
    file_name
}

/// Mutable resolver state guarded by one lock.
struct Inner {
    state: ResolverState,
    store: PropertyStore,
    definitions: LoadDefinitionLog,
    logger: Logger,
}

impl Inner {
    /// Fresh state: empty store and log, bootstrap file loaded.
    fn bootstrap(
        options: &Options,
        system: &SystemProperties,
        own_root: &ResourceRoot,
        substitutor: &Substitutor,
        level_filter: &Arc<LogLevelFilter>,
    ) -> Self {
        let console_tracing = resolve_flag(CONSOLE_TRACING, options, system, None);
        let mut inner = Self {
            state: ResolverState::default(),
            store: PropertyStore::new(),
            definitions: LoadDefinitionLog::new(),
            logger: Logger::new()
                .with_name(NAMESPACE)
                .with_level_filter(Arc::clone(level_filter))
                .with_console_tracing(console_tracing),
        };
        if let Some(level) = resolve_setting(LOG_LEVEL, options, system, None, None) {
            match LogLevel::parse(&level) {
                Some(level) => level_filter.set(level),
                None => inner
                    .logger
                    .warn(&format!("ignoring unknown log level '{level}'")),
            }
        }
        inner.logger.debug(&format!(
            "creating resolver, runtime environment defaults to {}",
            inner.state.runtime_environment
        ));

        let _guard = inner.install_bootstrap_logging(options, system, own_root);
        inner.load_bootstrap_file(options, system, own_root, substitutor);
        inner
    }

    fn install_bootstrap_logging(
        &self,
        options: &Options,
        system: &SystemProperties,
        own_root: &ResourceRoot,
    ) -> Option<DefaultGuard> {
        if !resolve_flag(BOOTSTRAP_LOGGING, options, system, None) {
            return None;
        }

        let file_name = resolve_setting(
            BOOTSTRAP_LOGGING_FILE_KEY,
            options,
            system,
            None,
            Some(BOOTSTRAP_LOGGING_FILE_NAME),
        )
        .unwrap_or_else(|| BOOTSTRAP_LOGGING_FILE_NAME.to_string());

        let located = match locate_file_or_resource(&file_name, Some(own_root)) {
            Lookup::Found(located) => located,
            Lookup::NotFound => {
                self.logger
                    .error(&format!("bootstrap logging file {file_name} not found"));
                return None;
            }
            Lookup::Failed(e) => {
                self.logger
                    .error_with_cause("error initializing bootstrap logging", &e);
                return None;
            }
        };

        let settings = match properties::parse(&located.content) {
            Ok(props) => BootstrapLogging::from_properties(&props),
            Err(e) => {
                self.logger
                    .error_with_cause("error initializing bootstrap logging", &e);
                return None;
            }
        };

        match settings.install() {
            Ok(guard) => {
                self.logger.debug(&format!(
                    "bootstrap logging configured from {} with filter '{}'",
                    located.origin, settings.filter
                ));
                Some(guard)
            }
            Err(e) => {
                self.logger
                    .error_with_cause("error initializing bootstrap logging", &e);
                None
            }
        }
    }

    fn load_bootstrap_file(
        &mut self,
        options: &Options,
        system: &SystemProperties,
        own_root: &ResourceRoot,
        substitutor: &Substitutor,
    ) {
        let file_name = resolve_setting(
            BOOTSTRAP_FILE_NAME_KEY,
            options,
            system,
            None,
            Some(BOOTSTRAP_FILE_NAME),
        )
        .unwrap_or_else(|| BOOTSTRAP_FILE_NAME.to_string());
        self.logger
            .debug(&format!("bootstrap file name {file_name}"));

        let outcome = match locate_file_or_resource(&file_name, Some(own_root)) {
            Lookup::Found(located) => self.merge_located(located, substitutor, false),
            Lookup::NotFound => LoadOutcome::NotFound {
                file_name: file_name.clone(),
            },
            Lookup::Failed(error) => LoadOutcome::Failed {
                file_name: file_name.clone(),
                error,
            },
        };
        match &outcome {
            LoadOutcome::Loaded { origin, .. } => self
                .logger
                .info(&format!("bootstrap file loaded from {origin}")),
            LoadOutcome::NotFound { .. } => self
                .logger
                .error(&format!("bootstrap file {file_name} failed to load: not found")),
            LoadOutcome::Failed { error, .. } => self.logger.error_with_cause(
                &format!("bootstrap file {file_name} failed to load"),
                error,
            ),
        }
        self.state.bootstrap_loaded = outcome.is_loaded();

        let environment = resolve_setting(
            RUNTIME_ENVIRONMENT,
            options,
            system,
            Some(&self.store),
            Some(DEFAULT_ENVIRONMENT),
        )
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        self.store.put(RUNTIME_ENVIRONMENT, environment.clone());
        self.state.runtime_environment = environment;

        self.state.extended_syntax = resolve_setting(
            EXTENDED_SYNTAX_ENABLED,
            options,
            system,
            Some(&self.store),
            None,
        )
        .is_none_or(|v| v != "false");

        if let Some(paths) = resolve_setting(
            ADDITIONAL_CONFIGURATION_PATHS,
            options,
            system,
            Some(&self.store),
            None,
        ) {
            self.add_search_paths(&paths);
        }

        if self.logger.is_console_tracing() {
            self.logger.trace("bootstrap file contents");
            self.logger.dump_properties(LogLevel::Trace, &self.store);
        }
        self.logger.debug(&format!(
            "effective environment {}, extended syntax {}",
            self.state.runtime_environment, self.state.extended_syntax
        ));
    }

    fn add_search_paths(&mut self, paths: &str) {
        for path in parse_search_paths(paths) {
            self.logger.debug(&format!("adding search path {path}"));
            self.state.search_paths.push(path);
        }
    }

    /// Run a located file through parse, trim, substitute, coerce and merge.
    ///
    /// The file is parsed completely before anything is merged.
    fn merge_located(
        &mut self,
        located: Located,
        substitutor: &Substitutor,
        record: bool,
    ) -> LoadOutcome {
        let mut incoming = match properties::parse(&located.content) {
            Ok(incoming) => incoming,
            Err(e) => {
                let error = LoadError::parse(located.origin.to_string(), e);
                self.logger.error_with_cause("unable to parse file", &error);
                return LoadOutcome::Failed {
                    file_name: located.origin.to_string(),
                    error,
                };
            }
        };

        for value in incoming.values_mut() {
            *value = value.trim().to_string();
        }

        let report = substitutor.substitute_all(&mut incoming, &self.store);
        if report.capped {
            self.logger.warn(&format!(
                "variable substitution in {} stopped after {} passes; check for circular references",
                located.origin, MAX_SUBSTITUTION_PASSES
            ));
        }
        if report.truncated {
            self.logger.warn(&format!(
                "variable substitution in {} left references unexpanded (limit {} bytes, {} levels)",
                located.origin, MAX_EXPANDED_LENGTH, MAX_EXPANSION_DEPTH
            ));
        }

        let extended_syntax = self.state.extended_syntax;
        let mut entries = Vec::with_capacity(incoming.len());
        for (name, value) in incoming {
            let coerced = coerce(value.trim(), extended_syntax);
            if let Some(error) = &coerced.error {
                self.logger.debug_with_cause(
                    &format!("no typed value for {name} in {}", located.origin),
                    error,
                );
            }
            entries.push(MergeEntry { name, coerced });
        }

        let keys = self.store.merge(entries);
        if record {
            self.definitions
                .record(LoadDefinition::from_origin(&located.origin));
        }
        self.logger.dump_properties(LogLevel::Trace, &self.store);

        LoadOutcome::Loaded {
            origin: located.origin,
            keys,
        }
    }

    fn finish_lookup(
        &mut self,
        file_name: &str,
        lookup: Lookup,
        substitutor: &Substitutor,
    ) -> LoadOutcome {
        match lookup {
            Lookup::Found(located) => {
                let outcome = self.merge_located(located, substitutor, true);
                if let LoadOutcome::Loaded { origin, keys } = &outcome {
                    self.logger
                        .debug(&format!("loaded {file_name} from {origin} ({keys} keys)"));
                }
                outcome
            }
            Lookup::NotFound => {
                self.logger
                    .warn(&format!("unable to load {file_name} from anywhere"));
                LoadOutcome::NotFound {
                    file_name: file_name.to_string(),
                }
            }
            Lookup::Failed(error) => {
                self.logger
                    .error_with_cause(&format!("unable to load {file_name}"), &error);
                LoadOutcome::Failed {
                    file_name: file_name.to_string(),
                    error,
                }
            }
        }
    }

    fn load_from_locations(
        &mut self,
        file_name: &str,
        root: Option<&ResourceRoot>,
        substitutor: &Substitutor,
    ) -> LoadOutcome {
        let lookup = locate(file_name, &self.state.search_paths, root);
        self.finish_lookup(file_name, lookup, substitutor)
    }

    fn load_file_or_resource(
        &mut self,
        file_name: &str,
        root: Option<&ResourceRoot>,
        substitutor: &Substitutor,
    ) -> LoadOutcome {
        let lookup = locate_file_or_resource(file_name, root);
        self.finish_lookup(file_name, lookup, substitutor)
    }

    fn replay(&mut self, definitions: &[LoadDefinition], substitutor: &Substitutor) -> Vec<LoadOutcome> {
        definitions
            .iter()
            .map(|definition| {
                let root = match definition.kind {
                    DefinitionKind::AbsolutePath => None,
                    DefinitionKind::ResourceRelative => definition.root.as_ref(),
                };
                self.load_file_or_resource(&definition.path, root, substitutor)
            })
            .collect()
    }
}

/// Layered configuration resolver.
///
/// Construct once and share (e.g. behind an `Arc`). Every operation takes the
/// internal lock for its full duration, so loads never interleave and a reload
/// is atomic with respect to other loads.
pub struct ConfigResolver {
    options: Options,
    system: SystemProperties,
    own_root: ResourceRoot,
    substitutor: Substitutor,
    level_filter: Arc<LogLevelFilter>,
    inner: Mutex<Inner>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(Options::new())
    }
}

impl ConfigResolver {
    /// Bootstrap with the process-wide system properties and built-in resources.
    pub fn new(options: Options) -> Self {
        Self::with_system(options, SystemProperties::global())
    }

    pub fn with_system(options: Options, system: SystemProperties) -> Self {
        Self::with_resources(options, system, ResourceRoot::builtin())
    }

    /// Bootstrap with an explicit resource root for the bootstrap and
    /// bootstrap logging files.
    pub fn with_resources(options: Options, system: SystemProperties, own_root: ResourceRoot) -> Self {
        let substitutor = Substitutor::new(system.clone());
        let level_filter = Arc::new(LogLevelFilter::default());
        let inner = Inner::bootstrap(&options, &system, &own_root, &substitutor, &level_filter);
        Self {
            options,
            system,
            own_root,
            substitutor,
            level_filter,
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn file_setting(
        &self,
        inner: &Inner,
        key: &str,
        options: &Options,
        default: Option<&str>,
    ) -> Option<String> {
        resolve_setting(key, options, &self.system, Some(&inner.store), default)
            .filter(|v| !v.is_empty())
    }

    fn load_and_merge_locked(
        &self,
        inner: &mut Inner,
        names: &[String],
        root: Option<&ResourceRoot>,
        options: &Options,
    ) -> Vec<LoadOutcome> {
        if let Some(paths) = options.get(ADDITIONAL_CONFIGURATION_PATHS) {
            inner.add_search_paths(paths);
        }

        let prefix = self.file_setting(inner, CONFIGURATION_FILE_PREFIX, options, None);
        let suffix = self.file_setting(inner, CONFIGURATION_FILE_SUFFIX, options, Some(DEFAULT_SUFFIX));
        let extension =
            self.file_setting(inner, CONFIGURATION_FILE_EXTENSION, options, Some(DEFAULT_EXTENSION));

        names
            .iter()
            .map(|name| {
                let file_name = file_name_for(
                    prefix.as_deref(),
                    name,
                    suffix.as_deref(),
                    extension.as_deref(),
                );
                inner.logger.debug(&format!("checking for file {file_name}"));
                inner.load_from_locations(&file_name, root, &self.substitutor)
            })
            .collect()
    }

    /// Load `defaults` then the runtime environment's file for `root`.
    pub fn load_package_configuration(
        &self,
        root: &ResourceRoot,
        options: &Options,
    ) -> Vec<LoadOutcome> {
        let mut inner = self.lock();
        let names = vec![
            DEFAULTS_NAME.to_string(),
            inner.state.runtime_environment.clone(),
        ];
        self.load_and_merge_locked(&mut inner, &names, Some(root), options)
    }

    /// Same as [`load_package_configuration`](Self::load_package_configuration).
    pub fn resolve(&self, root: &ResourceRoot, options: &Options) -> Vec<LoadOutcome> {
        self.load_package_configuration(root, options)
    }

    /// Load an explicit list of logical names, in order.
    pub fn load_and_merge(
        &self,
        names: &[&str],
        root: Option<&ResourceRoot>,
        options: &Options,
    ) -> Vec<LoadOutcome> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let mut inner = self.lock();
        self.load_and_merge_locked(&mut inner, &names, root, options)
    }

    /// Load one file: an absolute path from disk, anything else from `root`.
    pub fn load_file(&self, file_name: &str, root: Option<&ResourceRoot>) -> LoadOutcome {
        self.lock()
            .load_file_or_resource(file_name, root, &self.substitutor)
    }

    /// Re-run the given loads, in order, against the current store.
    pub fn replay(&self, definitions: &[LoadDefinition]) -> Vec<LoadOutcome> {
        self.lock().replay(definitions, &self.substitutor)
    }

    /// Rebuild from scratch: fresh bootstrap, then replay every recorded load.
    ///
    /// Values set with [`put`](Self::put) or [`put_typed`](Self::put_typed)
    /// are not recorded and do not survive.
    pub fn reload_all(&self) -> Vec<LoadOutcome> {
        let mut inner = self.lock();
        let previous = inner.definitions.take();
        *inner = Inner::bootstrap(
            &self.options,
            &self.system,
            &self.own_root,
            &self.substitutor,
            &self.level_filter,
        );
        inner
            .logger
            .info(&format!("replaying {} load definitions", previous.len()));
        inner.replay(&previous, &self.substitutor)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock().store.get(name).map(str::to_string)
    }

    pub fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    pub fn get_typed(&self, name: &str) -> Option<TypedValue> {
        self.lock().store.get_typed(name).cloned()
    }

    pub fn typed_type(&self, name: &str) -> Option<TypeTag> {
        self.lock().store.typed_type(name)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_typed(name)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn get_integer(&self, name: &str) -> Option<i32> {
        self.get_typed(name).and_then(|v| v.as_integer())
    }

    pub fn get_short(&self, name: &str) -> Option<i16> {
        self.get_typed(name).and_then(|v| v.as_short())
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get_typed(name).and_then(|v| v.as_long())
    }

    pub fn get_byte(&self, name: &str) -> Option<i8> {
        self.get_typed(name).and_then(|v| v.as_byte())
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.get_typed(name).and_then(|v| v.as_float())
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.get_typed(name).and_then(|v| v.as_double())
    }

    pub fn get_boolean(&self, name: &str) -> Option<bool> {
        self.get_typed(name).and_then(|v| v.as_boolean())
    }

    pub fn get_date(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        self.get_typed(name).and_then(|v| v.as_date())
    }

    pub fn get_string_list(&self, name: &str) -> Option<Vec<String>> {
        self.get_typed(name)
            .and_then(|v| v.as_string_list().map(<[String]>::to_vec))
    }

    pub fn get_integer_list(&self, name: &str) -> Option<Vec<i32>> {
        self.get_typed(name)
            .and_then(|v| v.as_integer_list().map(<[i32]>::to_vec))
    }

    pub fn put(&self, name: &str, value: &str) {
        self.lock().store.put(name, value);
    }

    /// Set a typed value and its text form.
    ///
    /// Returns false, leaving the property untouched, when the value has no
    /// text form that converts back to it (e.g. a string list element
    /// containing a comma).
    pub fn put_typed(&self, name: &str, value: impl Into<TypedValue>) -> bool {
        let value = value.into();
        let inner = &mut *self.lock();
        if inner.store.put_typed(name, value) {
            return true;
        }
        inner
            .logger
            .warn(&format!("{name} not set: typed value has no text form that converts back"));
        false
    }

    /// Sorted property names.
    pub fn property_names(&self) -> Vec<String> {
        self.lock().store.names()
    }

    /// Copy of the merged store.
    pub fn snapshot(&self) -> PropertyStore {
        self.lock().store.clone()
    }

    /// Raw and typed values as a JSON object keyed by property name.
    pub fn to_json(&self) -> serde_json::Value {
        crate::format::store_to_json(&self.lock().store)
    }

    /// Write every property to `sink`. Returns false if the sink failed.
    pub fn list_all(&self, sink: &mut dyn Write) -> bool {
        let inner = self.lock();
        match inner.store.list(sink) {
            Ok(()) => true,
            Err(e) => {
                inner.logger.error_with_cause("unable to list properties", &e);
                false
            }
        }
    }

    pub fn load_definitions(&self) -> Vec<LoadDefinition> {
        self.lock().definitions.snapshot()
    }

    pub fn reset_load_definitions(&self) {
        self.lock().definitions.reset();
    }

    pub fn state(&self) -> ResolverState {
        self.lock().state.clone()
    }

    pub fn runtime_environment(&self) -> String {
        self.lock().state.runtime_environment.clone()
    }

    pub fn search_paths(&self) -> Vec<String> {
        self.lock().state.search_paths.clone()
    }

    pub fn extended_syntax_enabled(&self) -> bool {
        self.lock().state.extended_syntax
    }

    /// True when the resolver's messages go straight to stdout.
    pub fn console_tracing(&self) -> bool {
        self.lock().logger.is_console_tracing()
    }

    /// Minimum level of the resolver's own log messages.
    pub fn log_level(&self) -> LogLevel {
        self.level_filter.get()
    }

    /// Takes effect immediately. A reload re-applies the configured level.
    pub fn set_log_level(&self, level: LogLevel) {
        self.level_filter.set(level);
    }

    pub fn bootstrap_loaded(&self) -> bool {
        self.lock().state.bootstrap_loaded
    }

    /// Append colon-separated directories to the search path.
    pub fn add_search_paths(&self, paths: &str) {
        self.lock().add_search_paths(paths);
    }
}
