use std::fmt;

use clap::ValueEnum;

const CRATES: [&str; 3] = ["graphql_cost", "graphql_cost_analysis", "gateway_cost_control"];

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Completely disables logging
    Off,
    /// Only errors from the cost analysis
    Error,
    /// Warnings and errors from the cost analysis
    #[default]
    Warn,
    /// Info, warning and error messages from the cost analysis
    Info,
    /// Debug, info, warning and error messages from the cost analysis
    Debug,
    /// Trace, debug, info, warning and error messages from all dependencies
    Trace,
}

impl LogLevel {
    pub(crate) fn as_filter_string(&self) -> String {
        match self {
            LogLevel::Off => "off".to_owned(),
            LogLevel::Trace => "trace".to_owned(),
            level => {
                let directives = CRATES.map(|name| format!("{name}={level}"));
                format!("{},off", directives.join(","))
            }
        }
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Standard text
    Text,
    /// JSON objects
    Json,
}

impl AsRef<str> for LogStyle {
    fn as_ref(&self) -> &str {
        match self {
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}
