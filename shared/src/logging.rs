//! Shared logging utilities for consistent tracing across the harness

use crate::types::Component;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// Build the default filter directives for a component.
///
/// The binary target of the harness is `kwfs_tester` while its library is
/// `tester`, so both are listed.
pub fn default_filter(component: Component, base_level: &str) -> String {
    match component {
        Component::Tester => {
            format!("kwfs_tester={base_level},tester={base_level},shared={base_level}")
        }
        Component::Server | Component::Client | Component::Collaborator => {
            format!("{component}={base_level},shared={base_level}")
        }
    }
}

/// Initialize the stdout tracing subscriber.
///
/// `RUST_LOG` takes precedence over the component defaults when set.
pub fn init_tracing(component: Component, log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(component, base_level)));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for component-aware info logging
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware warning logging
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware error logging
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware debug logging
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: &Component, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(component: &Component, reason: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: &Component, context: &str, error: &dyn std::fmt::Display) {
    error!(
        component = %component,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for best-effort steps that did not succeed
pub fn log_warning(component: &Component, context: &str, error: &dyn std::fmt::Display) {
    warn!(
        component = %component,
        timestamp = format_timestamp(),
        error = %error,
        "⚠️ {} (continuing): {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(component: &Component, message: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

/// Contextual logging helper for progress updates
pub fn log_progress(component: &Component, action: &str, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "📋 {}: {}",
        action,
        details
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_binary_and_library() {
        let filter = default_filter(Component::Tester, "debug");
        assert!(filter.contains("kwfs_tester=debug"));
        assert!(filter.contains("tester=debug"));
        assert!(filter.contains("shared=debug"));

        let server = default_filter(Component::Server, "warn");
        assert!(server.starts_with("server=warn"));
    }

    #[test]
    fn test_timestamp_format() {
        let ts = format_timestamp();
        // HH:MM:SS.mmm
        assert_eq!(ts.len(), 12);
        assert_eq!(&ts[2..3], ":");
        assert_eq!(&ts[8..9], ".");
    }
}
