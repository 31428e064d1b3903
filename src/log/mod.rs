//! Diagnostic logging for simulation runs. This is not to be confused with _reports_ (see
//! `crate::report`), which record model output.
//!
//! The five logging macros `error!`, `warn!`, `info!`, `debug!` and `trace!` are re-exported
//! from the `log` crate:
//!
//! ```rust
//! use zika_sim::log::info;
//!
//! pub fn announce(code: &str) {
//!     info!("Seeding {code}");
//! }
//! ```
//!
//! Logging is _disabled_ by default. It is turned on either with the command line option
//! `--log-level <spec>` or programmatically:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!  - `set_log_level_from_str("info,zika_sim::engine=trace")`: the `--log-level` syntax
//!
//! Per-module filters are installed with `set_module_filter()` / `set_module_filters()` and
//! removed with `remove_module_filter()`. The engine emits one `trace!` line per node per
//! day-step, so a module filter is the usual way to look at a single stage:
//!
//! ```rust
//! use zika_sim::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! set_module_filter("zika_sim::engine", LevelFilter::Trace);
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::collections::hash_map::Entry;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, MutexGuard};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::error::ZikaError;
use crate::HashMap;

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// A level filter for every log message whose target starts with `module`
/// (e.g. `"zika_sim::driver"`).
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    module: String,
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Keeps track of the global and per-module filter levels and holds a handle to the installed
/// logger. Only one instance exists; the public API below locks it and forwards.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// Level for targets without a module filter. `LevelFilter::Off` disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(feature = "logging")]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        LogConfiguration {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations: HashMap::default(),
            #[cfg(feature = "logging")]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns true if the configuration changed.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().level == level {
                    return false;
                }
                entry.get_mut().level = level;
            }
            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    fn set_module_filters(&mut self, module_filters: &[(&str, LevelFilter)]) {
        let mut mutated = false;
        for (module, level) in module_filters {
            mutated |= self.insert_module_filter(module, *level);
        }
        if mutated {
            self.set_config();
        }
    }

    fn remove_module_filter(&mut self, module: &str) {
        if self.module_configurations.remove(module).is_some() {
            self.set_config();
        }
    }
}

/// Parses a `--log-level` value: a comma separated list whose items are either a bare level
/// (the global level) or `module=level`. An empty string turns logging off.
fn parse_log_spec(spec: &str) -> Result<(LevelFilter, Vec<(String, LevelFilter)>), ZikaError> {
    let parse_level = |value: &str| {
        LevelFilter::from_str(value.trim())
            .map_err(|_| ZikaError::configuration("log-level", value, "unknown log level"))
    };

    let mut global = DEFAULT_LOG_LEVEL;
    let mut modules = Vec::new();
    for item in spec.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.split_once('=') {
            Some((module, level)) => modules.push((module.trim().to_string(), parse_level(level)?)),
            None => global = parse_level(item)?,
        }
    }
    Ok((global, modules))
}

// The public API

/// Enables all log messages. Equivalent to `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    get_log_configuration().set_module_filters(&[(module_path, level_filter)]);
}

/// Sets the level filters for a set of modules in one go.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    get_log_configuration().set_module_filters(module_filters);
}

/// Removes a module-specific level filter. The global level filter will apply to the module.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

/// Configures logging from a `--log-level` value such as `"info"` or
/// `"warn,zika_sim::engine=trace"`.
///
/// # Errors
///
/// Returns `ZikaError::ConfigurationError` for an unknown level name.
pub fn set_log_level_from_str(spec: &str) -> Result<(), ZikaError> {
    let (global, modules) = parse_log_spec(spec)?;
    let filters: Vec<(&str, LevelFilter)> = modules
        .iter()
        .map(|(module, level)| (module.as_str(), *level))
        .collect();

    let mut configuration = get_log_configuration();
    configuration.set_module_filters(&filters);
    configuration.set_log_level(global);
    Ok(())
}

/// Returns the global log level currently in effect.
pub fn current_log_level() -> LevelFilter {
    get_log_configuration().global_log_level
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION.lock().expect("Mutex poisoned")
}
