//! Logger setup for applications and tests

use std::sync::Once;

static INIT: Once = Once::new();

/// Logger options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives such as `"declarative_gl=debug"`. Falls back to
    /// `RUST_LOG`, then to `default_level`.
    pub filter: Option<String>,
    pub default_level: log::LevelFilter,
    /// Capture output for the test harness instead of printing directly.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            default_level: log::LevelFilter::Info,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    /// Trace-level logging captured by the test harness.
    pub fn for_tests() -> Self {
        Self {
            filter: None,
            default_level: log::LevelFilter::Trace,
            is_test: true,
        }
    }
}

/// Install the global logger. Later calls are no-ops.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or(config.default_level.to_string());
        let mut builder = env_logger::Builder::from_env(env);
        if let Some(filter) = &config.filter {
            builder.parse_filters(filter);
        }
        builder.is_test(config.is_test);
        // Another logger may already be installed by the host application.
        if builder.try_init().is_err() {
            log::debug!("Logger already initialized");
        }
    });
}

/// Install the browser console logger and panic hook. Later calls are no-ops.
#[cfg(target_arch = "wasm32")]
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        console_error_panic_hook::set_once();
        let level = config.default_level.to_level().unwrap_or(log::Level::Info);
        if console_log::init_with_level(level).is_err() {
            log::debug!("Logger already initialized");
        }
    });
}
