//! `log` + `log4rs` setup shared by the binary and the test harness.

mod consts;

pub use consts::*;

use crate::foundation::{LoadError, Result};
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
    },
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::io::IsTerminal;
use std::path::Path;

const CONSOLE_APPENDER: &str = "stderr";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Parsed form of a filter expression such as `"debug,reqwest=info,root=warn"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilters {
    pub app_level: LevelFilter,
    pub root_level: LevelFilter,
    pub modules: Vec<(String, LevelFilter)>,
}

impl LogFilters {
    /// A bare level applies to the whitelisted crates, `root=<level>` opens up every
    /// third-party crate, `<module>=<level>` opens one.
    pub fn parse(filters: &str) -> Self {
        let mut parsed = Self { app_level: LevelFilter::Info, root_level: LevelFilter::Off, modules: Vec::new() };
        let mut app_level_seen = false;
        for part in filters.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            match part.split_once('=') {
                None => {
                    if app_level_seen {
                        continue;
                    }
                    if let Ok(level) = part.parse() {
                        parsed.app_level = level;
                        app_level_seen = true;
                    }
                }
                Some((module, level)) => {
                    let (module, level) = (module.trim(), level.trim());
                    let Ok(level) = level.parse::<LevelFilter>() else {
                        continue;
                    };
                    if module.is_empty() {
                        continue;
                    }
                    if module == "root" {
                        parsed.root_level = level;
                    } else {
                        parsed.modules.push((module.to_string(), level));
                    }
                }
            }
        }
        parsed
    }
}

/// Installs the global logger. Console output goes to stderr; with `log_dir` set, a rolling
/// log file and a warn-level error file are written there too.
///
/// The logger is global: a second call leaves the first configuration in place.
pub fn init_logger(log_dir: Option<&Path>, filters: &str) -> Result<()> {
    let config = build_config(log_dir, &LogFilters::parse(filters))?;
    let _ = log4rs::init_config(config);
    Ok(())
}

fn build_config(log_dir: Option<&Path>, filters: &LogFilters) -> Result<Config> {
    let console_pattern = if std::io::stderr().is_terminal() { LOG_LINE_PATTERN_COLORED } else { LOG_LINE_PATTERN };
    let console = ConsoleAppender::builder().target(Target::Stderr).encoder(Box::new(PatternEncoder::new(console_pattern))).build();

    let mut builder = Config::builder().appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)));
    let mut appenders = vec![CONSOLE_APPENDER.to_string()];

    if let Some(dir) = log_dir {
        builder = builder.appender(Appender::builder().build(LOG_FILE_APPENDER, Box::new(rolling_file(dir, LOG_FILE_NAME)?)));
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build(ERR_LOG_FILE_APPENDER, Box::new(rolling_file(dir, ERR_LOG_FILE_NAME)?)),
        );
        appenders.push(LOG_FILE_APPENDER.to_string());
        appenders.push(ERR_LOG_FILE_APPENDER.to_string());
    }

    for crate_name in WHITELISTED_CRATES {
        if filters.modules.iter().any(|(module, _)| module == crate_name) {
            continue;
        }
        builder = builder.logger(Logger::builder().appenders(appenders.clone()).additive(false).build(*crate_name, filters.app_level));
    }
    for (module, level) in &filters.modules {
        builder = builder.logger(Logger::builder().appenders(appenders.clone()).additive(false).build(module, *level));
    }

    builder
        .build(Root::builder().appenders(appenders).build(filters.root_level))
        .map_err(|err| LoadError::ConfigError(format!("logger config: {err}")))
}

fn rolling_file(dir: &Path, file_name: &str) -> Result<RollingFileAppender> {
    let archive = dir.join(format!("{file_name}.{{}}.gz"));
    let archive = archive.to_str().ok_or_else(|| LoadError::ConfigError(format!("log dir is not valid UTF-8: {}", dir.display())))?;
    let roller = FixedWindowRoller::builder()
        .base(1)
        .build(archive, LOG_FILE_MAX_ROLLS)
        .map_err(|err| LoadError::ConfigError(format!("log roller: {err}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(LOG_FILE_MAX_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_LINE_PATTERN)))
        .build(dir.join(file_name), Box::new(policy))
        .map_err(|err| LoadError::Io { operation: format!("open log file {file_name}"), details: err.to_string() })
}
