//! Configuration loading.

mod settings;

pub use settings::{
    AiSettings, AnalysisSettings, ConfigError, ConfigResult, FetchSettings, ImapSettings,
    Settings, SmtpSettings,
};
