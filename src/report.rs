use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Fire-and-forget sink for run progress.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn pass(&self, message: &str);
    fn fail(&self, message: &str, attachment: Option<&Path>);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ReportEntry {
    Info(String),
    Pass(String),
    Fail {
        message: String,
        attachment: Option<PathBuf>,
    },
}

/// Writes report entries as structured log events.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    scope: String,
}

impl TracingReporter {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }
}

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!(scope = %self.scope, "{}", message);
    }

    fn pass(&self, message: &str) {
        info!(scope = %self.scope, status = "pass", "{}", message);
    }

    fn fail(&self, message: &str, attachment: Option<&Path>) {
        match attachment {
            Some(path) => {
                error!(scope = %self.scope, status = "fail", attachment = %path.display(), "{}", message)
            }
            None => error!(scope = %self.scope, status = "fail", "{}", message),
        }
    }
}
