pub mod actions;
pub mod browser;
pub mod core;
pub mod data;
pub mod errors;
pub mod pages;
pub mod report;
pub mod scenarios;
pub mod testing;
pub mod types;
pub mod utils;
pub mod workflow;

pub use browser::{ChromeLauncher, ChromeSession, WaitEngine};
pub use crate::core::{Config, ElementHandle, Locator, SessionDriver, SessionFactory};
pub use data::{DataSource, JsonDataSource, MemoryDataSource};
pub use errors::{FailureKind, FormError, Result};
pub use report::{ReportEntry, Reporter, TracingReporter};
pub use scenarios::{Scenario, ScenarioReport, ScenarioRunner};
pub use types::*;
pub use workflow::{FormWorkflow, Stage, Transition, WorkflowContext};
