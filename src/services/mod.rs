//! Long-lived services orchestrating the providers.

mod monitor;

pub use monitor::{FetchWindow, MonitorError, MonitorResult, MonitorService, RunReport};
