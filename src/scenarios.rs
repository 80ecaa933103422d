use crate::core::{Config, SessionFactory};
use crate::data::DataSource;
use crate::errors::{FormError, Result};
use crate::pages::{ContactDetailsPage, EligibilityPage, FormSection, ManualLoginPage, SignInPage};
use crate::report::Reporter;
use crate::types::Answer;
use crate::utils::ScreenshotManager;
use crate::workflow::{FormWorkflow, Stage, Transition, WorkflowContext};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

const FIELD_REQUIRED_TEXT: &str = "We need a response for this field";
const ELIGIBILITY_WARNING_TEXT: &str = "The applicant may not meet the eligibility criteria";

/// End-to-end checks against the grant portal. Each one runs in its own
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Sign in and reach the eligibility section.
    ValidLogin,
    /// Rejected credentials show the expected error.
    InvalidLogin,
    /// Clearing every contact checkbox surfaces a field error.
    ContactDetailsValidation,
    /// Complete every section and submit.
    FullSubmission,
    /// Answering "no" to eligibility shows the warning and FAQ link.
    WarningValidation,
    /// Skipping every section leaves error badges at review.
    ErrorCountValidation,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::ValidLogin,
        Scenario::InvalidLogin,
        Scenario::ContactDetailsValidation,
        Scenario::FullSubmission,
        Scenario::WarningValidation,
        Scenario::ErrorCountValidation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::ValidLogin => "valid_login",
            Scenario::InvalidLogin => "invalid_login",
            Scenario::ContactDetailsValidation => "contact_details_validation",
            Scenario::FullSubmission => "full_submission",
            Scenario::WarningValidation => "warning_validation",
            Scenario::ErrorCountValidation => "error_count_validation",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::ValidLogin => "sign in and reach the eligibility form",
            Scenario::InvalidLogin => "rejected credentials show the login error",
            Scenario::ContactDetailsValidation => "unchecked contact boxes raise a field error",
            Scenario::FullSubmission => "fill every section and submit the application",
            Scenario::WarningValidation => "ineligible answers show the warning and FAQ link",
            Scenario::ErrorCountValidation => "skipped sections leave error badges at review",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub run_id: Uuid,
    pub passed: bool,
    /// Form stage when the run ended.
    pub stage: Stage,
    pub failed_at: Option<Stage>,
    pub error: Option<String>,
    pub screenshot: Option<PathBuf>,
    pub duration_ms: u64,
}

/// Opens a session per scenario, runs it and always tears the session down.
pub struct ScenarioRunner {
    factory: Arc<dyn SessionFactory>,
    config: Config,
    data: Arc<dyn DataSource>,
    reporter: Arc<dyn Reporter>,
}

impl ScenarioRunner {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        config: Config,
        data: Arc<dyn DataSource>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            factory,
            config,
            data,
            reporter,
        }
    }

    pub async fn run_all(&self, scenarios: &[Scenario]) -> Result<Vec<ScenarioReport>> {
        let mut reports = Vec::with_capacity(scenarios.len());
        for &scenario in scenarios {
            reports.push(self.run(scenario).await?);
        }
        Ok(reports)
    }

    /// Runs one scenario. Only a session that cannot be opened is an `Err`;
    /// scenario failures are recorded in the report.
    pub async fn run(&self, scenario: Scenario) -> Result<ScenarioReport> {
        let started = Instant::now();
        let driver = self.factory.open(&self.config.browser).await?;
        let context = WorkflowContext::new(driver, self.config.clone(), self.reporter.clone());
        let run_id = context.run_id();
        let mut workflow = FormWorkflow::new(context);

        let span = info_span!("scenario", scenario = %scenario, run_id = %run_id);
        let outcome = self
            .execute(scenario, &mut workflow)
            .instrument(span)
            .await;

        let context = workflow.into_context();
        let mut screenshot = None;
        let error = match outcome {
            Ok(()) => {
                self.reporter.pass(&format!("{} passed", scenario));
                None
            }
            Err(e) => {
                screenshot = match ScreenshotManager::save_failure(
                    context.driver(),
                    &self.config.app.artifacts_dir,
                    scenario.name(),
                )
                .await
                {
                    Ok(path) => Some(path),
                    Err(capture) => {
                        warn!(scenario = %scenario, error = %capture, "failure screenshot not captured");
                        None
                    }
                };
                self.reporter
                    .fail(&format!("{} failed: {}", scenario, e), screenshot.as_deref());
                Some(e.to_string())
            }
        };

        let report = ScenarioReport {
            scenario,
            run_id,
            passed: error.is_none(),
            stage: context.stage(),
            failed_at: context.failed_at(),
            error,
            screenshot,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        if let Err(e) = context.into_driver().quit().await {
            warn!(scenario = %scenario, error = %e, "session did not quit cleanly");
        }
        info!(scenario = %scenario, passed = report.passed, "scenario finished");
        Ok(report)
    }

    async fn execute(&self, scenario: Scenario, workflow: &mut FormWorkflow) -> Result<()> {
        let app_url = &self.config.app.app_url;
        workflow.context().driver().navigate(app_url).await?;

        match scenario {
            Scenario::ValidLogin => self.reach_eligibility(workflow).await,
            Scenario::InvalidLogin => self.reject_invalid_logins(workflow).await,
            Scenario::ContactDetailsValidation => {
                self.reach_eligibility(workflow).await?;
                self.validate_contact_details(workflow).await
            }
            Scenario::FullSubmission => {
                self.reach_eligibility(workflow).await?;
                workflow.run_to_completion().await
            }
            Scenario::WarningValidation => {
                self.reach_eligibility(workflow).await?;
                self.validate_warning(workflow).await
            }
            Scenario::ErrorCountValidation => {
                self.reach_eligibility(workflow).await?;
                self.validate_error_count(workflow).await
            }
        }
    }

    async fn reach_eligibility(&self, workflow: &FormWorkflow) -> Result<()> {
        let context = workflow.context();
        let (driver, config) = (context.driver(), context.config());

        SignInPage::new(driver, config)?
            .login(&self.data.credentials("ValidLogin", 1)?)
            .await?;

        let manual = ManualLoginPage::new(driver, config)?;
        manual.verify_headers().await?;
        manual
            .fill_login_fields(&self.data.manual_login_details()?)
            .await?;
        manual.complete_and_navigate().await?;

        let url = driver.current_url().await?;
        if !url.contains(&config.app.eligibility_path) {
            return Err(FormError::Assertion(format!(
                "did not reach the eligibility form, landed on {}",
                url
            )));
        }
        context
            .reporter()
            .pass("Login successful and navigated to Eligibility form");
        Ok(())
    }

    async fn reject_invalid_logins(&self, workflow: &FormWorkflow) -> Result<()> {
        let context = workflow.context();
        let page = SignInPage::new(context.driver(), context.config())?;

        for row in 1..=2 {
            let credentials = self.data.credentials("InValidLogin", row)?;
            let expected = self.data.value("InValidLogin", row, 2)?;
            context
                .reporter()
                .info(&format!("Expecting error message: {}", expected));

            page.invalid_login(&credentials).await?;
            if !page.verify_error_message(&expected).await? {
                return Err(FormError::Assertion(format!(
                    "login error for row {} never read '{}'",
                    row, expected
                )));
            }
            context
                .reporter()
                .pass(&format!("Rejected credentials for {}", credentials.username));
        }
        Ok(())
    }

    async fn validate_contact_details(&self, workflow: &mut FormWorkflow) -> Result<()> {
        workflow.skip_unfilled(1).await?;

        let context = workflow.context();
        let contact = ContactDetailsPage::new(context.driver(), context.config())?;
        contact.check_all().await?;
        contact.uncheck_all().await?;
        context.reporter().info("All contact checkboxes unchecked");
        contact.save().await?;

        let errors = workflow.errors()?;
        if !errors.has_field_error().await? {
            return Err(FormError::Assertion("contact error message not displayed".into()));
        }
        let actual = errors.field_error_text().await?;
        if !actual.contains(FIELD_REQUIRED_TEXT) {
            return Err(FormError::Assertion(format!(
                "contact error read '{}', expected '{}'",
                actual, FIELD_REQUIRED_TEXT
            )));
        }
        Ok(())
    }

    async fn validate_warning(&self, workflow: &FormWorkflow) -> Result<()> {
        let context = workflow.context();
        EligibilityPage::new(context.driver(), context.config())?
            .answer_all(Answer::No)
            .await?;
        context
            .reporter()
            .info("Selected 'No' for all eligibility questions");

        let errors = workflow.errors()?;
        if !errors.is_warning_displayed().await? {
            return Err(FormError::Assertion("eligibility warning not displayed".into()));
        }
        let warning = errors.warning_text().await?;
        if !warning.contains(ELIGIBILITY_WARNING_TEXT) {
            return Err(FormError::Assertion(format!("unexpected warning '{}'", warning)));
        }

        let expected = self.data.config("FAQ_URL")?;
        let link = errors.faq_link().await?;
        if link.as_deref() != Some(expected.as_str()) {
            return Err(FormError::Assertion(format!(
                "FAQ link {:?} does not match {}",
                link, expected
            )));
        }
        let opened = errors.open_faq_link().await?;
        if opened != expected {
            return Err(FormError::Assertion(format!(
                "FAQ link opened {} instead of {}",
                opened, expected
            )));
        }
        context.reporter().pass("FAQ link verified");
        Ok(())
    }

    async fn validate_error_count(&self, workflow: &mut FormWorkflow) -> Result<()> {
        workflow.skip_unfilled(5).await?;
        if let Transition::Advanced(stage) = workflow.request_review().await? {
            warn!(stage = %stage, "review accepted an unfilled form");
        }

        let count = workflow.errors()?.error_count().await?;
        workflow
            .context()
            .reporter()
            .info(&format!("Total error count: {}", count));
        if count == 0 {
            return Err(FormError::Assertion("expected error indicators are not present".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BrowserConfig, SessionDriver};
    use crate::report::ReportEntry;
    use crate::testing::form_fixture;
    use crate::testing::{MemoryReporter, MockDriver};
    use async_trait::async_trait;
    use tokio_test::assert_ok;

    struct FixtureFactory {
        driver: MockDriver,
    }

    #[async_trait]
    impl SessionFactory for FixtureFactory {
        async fn open(&self, _config: &BrowserConfig) -> Result<Box<dyn SessionDriver>> {
            Ok(Box::new(self.driver.clone()))
        }
    }

    struct NoBrowser;

    #[async_trait]
    impl SessionFactory for NoBrowser {
        async fn open(&self, _config: &BrowserConfig) -> Result<Box<dyn SessionDriver>> {
            Err(FormError::LaunchFailed("chrome not installed".into()))
        }
    }

    fn config(artifacts: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.waits.explicit_timeout_ms = 2000;
        config.waits.poll_interval_ms = 100;
        config.waits.sync_timeout_ms = 500;
        config.app.artifacts_dir = artifacts.to_path_buf();
        config
    }

    fn runner(
        driver: &MockDriver,
        config: Config,
        data: impl DataSource + 'static,
    ) -> (ScenarioRunner, MemoryReporter) {
        let reporter = MemoryReporter::new();
        let runner = ScenarioRunner::new(
            Arc::new(FixtureFactory {
                driver: driver.clone(),
            }),
            config,
            Arc::new(data),
            Arc::new(reporter.clone()),
        );
        (runner, reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_scenario_passes_on_a_fresh_form() {
        let artifacts = tempfile::tempdir().unwrap();
        for scenario in Scenario::ALL {
            let config = config(artifacts.path());
            let driver = form_fixture::grant_form(&config);
            let (runner, _) = runner(&driver, config, form_fixture::data_source());

            let report = assert_ok!(runner.run(scenario).await);

            assert!(report.passed, "{} failed: {:?}", scenario, report.error);
            assert_eq!(report.screenshot, None);
            assert_eq!(driver.quit_calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_submission_ends_on_confirmation() {
        let artifacts = tempfile::tempdir().unwrap();
        let config = config(artifacts.path());
        let driver = form_fixture::grant_form(&config);
        let (runner, reporter) = runner(&driver, config, form_fixture::data_source());

        let report = runner.run(Scenario::FullSubmission).await.unwrap();

        assert_eq!(report.stage, Stage::Confirmation);
        assert!(driver.is_visible("confirmation-message"));
        assert!(matches!(
            reporter.entries().last(),
            Some(ReportEntry::Pass(message)) if message == "full_submission passed"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_captures_screenshot_and_quits() {
        let artifacts = tempfile::tempdir().unwrap();
        let config = config(artifacts.path());
        let driver = form_fixture::grant_form(&config);
        let data = form_fixture::data_source().with_config("FAQ_URL", "https://example.test/wrong-faq");
        let (runner, reporter) = runner(&driver, config, data);

        let report = runner.run(Scenario::WarningValidation).await.unwrap();

        assert!(!report.passed);
        assert!(report.error.as_deref().unwrap().contains("FAQ link"));
        let shot = report.screenshot.clone().unwrap();
        assert!(shot.starts_with(artifacts.path()));
        assert!(shot
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("warning_validation_"));
        assert!(shot.exists());
        assert_eq!(driver.quit_calls(), 1);
        match reporter.entries().last() {
            Some(ReportEntry::Fail { attachment, .. }) => assert_eq!(attachment.as_ref(), Some(&shot)),
            other => panic!("expected a failure entry, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_contact_error_surfaces_on_save() {
        let artifacts = tempfile::tempdir().unwrap();
        let config = config(artifacts.path());
        let driver = form_fixture::grant_form(&config);
        for i in 0..form_fixture::CONTACT_CHECKBOXES {
            driver.clear_click_hooks(&format!("contact-box-{i}"));
        }
        let (runner, _) = runner(&driver, config, form_fixture::data_source());

        let report = runner.run(Scenario::ContactDetailsValidation).await.unwrap();

        assert!(report.passed, "{:?}", report.error);
        assert_eq!(driver.successful_clicks("save"), 1);
        assert!(driver.is_visible("contact-error"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_expected_login_error_fails() {
        let artifacts = tempfile::tempdir().unwrap();
        let config = config(artifacts.path());
        let driver = form_fixture::grant_form(&config);
        let data = crate::data::MemoryDataSource::new()
            .with_row("InValidLogin", ["Username", "Password", "Error"])
            .with_row("InValidLogin", ["bad_user", "bad_pw", "Account locked"]);
        let (runner, _) = runner(&driver, config, data);

        let report = runner.run(Scenario::InvalidLogin).await.unwrap();

        assert!(!report.passed);
        assert!(report.error.unwrap().contains("Account locked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_that_cannot_open_is_an_error() {
        let artifacts = tempfile::tempdir().unwrap();
        let runner = ScenarioRunner::new(
            Arc::new(NoBrowser),
            config(artifacts.path()),
            Arc::new(form_fixture::data_source()),
            Arc::new(MemoryReporter::new()),
        );

        let err = runner.run(Scenario::ValidLogin).await.unwrap_err();
        assert!(matches!(err, FormError::LaunchFailed(_)));
    }

    #[test]
    fn test_scenario_names_are_snake_case() {
        assert_eq!(Scenario::ContactDetailsValidation.to_string(), "contact_details_validation");
        assert_eq!(
            serde_json::to_string(&Scenario::ErrorCountValidation).unwrap(),
            "\"error_count_validation\""
        );
    }
}
