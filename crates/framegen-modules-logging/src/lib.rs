use env_logger::{Builder, WriteStyle};
use framegen_core::{FgError, FgResult};
use log::LevelFilter;

use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLoggerConfig {
    pub level: LevelFilter,
    pub colors: bool,
    pub include_module: bool,
}

impl ConsoleLoggerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let level = lookup("FRAMEGEN_LOG")
            .and_then(|v| v.trim().parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        let colors = lookup("FRAMEGEN_LOG_COLORS")
            .map(|v| v.trim() != "0")
            .unwrap_or(true);
        let include_module = lookup("FRAMEGEN_LOG_MODULE")
            .map(|v| v.trim() != "0")
            .unwrap_or(true);

        Self {
            level,
            colors,
            include_module,
        }
    }
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Installs the process-wide `log` sink. Backend callbacks arrive under the
/// `framegen::xefg` and `framegen::xell` targets.
pub struct ConsoleLogger {
    config: ConsoleLoggerConfig,
    initialized: bool,
}

impl ConsoleLogger {
    #[inline]
    pub fn new(config: ConsoleLoggerConfig) -> Self {
        Self {
            config,
            initialized: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &ConsoleLoggerConfig {
        &self.config
    }

    pub fn init(&mut self) -> FgResult<()> {
        if self.initialized {
            return Ok(());
        }

        let mut builder = Builder::new();
        builder.filter_level(self.config.level);
        builder.write_style(if self.config.colors {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        });

        let include_module = self.config.include_module;
        builder.format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            if include_module {
                writeln!(
                    buf,
                    "[{style}{:<5}{style:#}] {:<25} {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(buf, "[{style}{:<5}{style:#}] {}", record.level(), record.args())
            }
        });

        builder
            .try_init()
            .map_err(|e| FgError::Other(format!("logger init failed: {e}")))?;

        self.initialized = true;
        Ok(())
    }
}
