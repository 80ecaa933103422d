use crate::core::{Config, SessionDriver};
use crate::report::Reporter;
use crate::types::FormData;
use crate::workflow::Stage;
use std::sync::Arc;
use uuid::Uuid;

/// State of one workflow run. Owns the session exclusively; page objects
/// only ever borrow it.
pub struct WorkflowContext {
    run_id: Uuid,
    driver: Box<dyn SessionDriver>,
    config: Config,
    data: FormData,
    pub(crate) stage: Stage,
    pub(crate) completed: Vec<Stage>,
    pub(crate) failed_at: Option<Stage>,
    pub(crate) reporter: Arc<dyn Reporter>,
}

impl WorkflowContext {
    /// Starts at eligibility with the form data carried by `config`.
    pub fn new(driver: Box<dyn SessionDriver>, config: Config, reporter: Arc<dyn Reporter>) -> Self {
        let data = config.form.clone();
        Self {
            run_id: Uuid::new_v4(),
            driver,
            config,
            data,
            stage: Stage::Eligibility,
            completed: Vec::new(),
            failed_at: None,
            reporter,
        }
    }

    pub fn with_data(mut self, data: FormData) -> Self {
        self.data = data;
        self
    }

    /// Picks up a form already showing `stage`, e.g. a saved draft.
    pub fn resume_at(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn driver(&self) -> &dyn SessionDriver {
        self.driver.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Stages whose inputs were filled and whose exit succeeded, in order.
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    pub fn failed_at(&self) -> Option<Stage> {
        self.failed_at
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    /// Ends the run, handing the session back for teardown.
    pub fn into_driver(self) -> Box<dyn SessionDriver> {
        self.driver
    }
}
