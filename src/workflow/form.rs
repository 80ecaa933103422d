use crate::browser::wait::WaitEngine;
use crate::core::{Locator, SessionDriver};
use crate::errors::{FailureKind, FormError, Result};
use crate::pages::{marker_for, section_for, ErrorPage, FormSection, PageObject, ReviewPage};
use crate::workflow::{Stage, WorkflowContext};
use tracing::{debug, info, warn};

/// Outcome of a section's exit action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Advanced(Stage),
    /// The form stayed on `stage` showing validation indicators.
    Blocked { stage: Stage, messages: Vec<String> },
}

/// Drives the grant form section by section.
///
/// Each step waits for the current section's marker, fills it from the run
/// data, leaves it, and only moves on once a following section has rendered.
/// A failed step leaves the stage unchanged and fails the run; nothing here
/// retries a whole section.
pub struct FormWorkflow {
    context: WorkflowContext,
}

impl FormWorkflow {
    pub fn new(context: WorkflowContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    pub fn into_context(self) -> WorkflowContext {
        self.context
    }

    pub fn stage(&self) -> Stage {
        self.context.stage
    }

    /// Page object of the current section.
    pub fn section(&self) -> Result<Box<dyn FormSection + '_>> {
        section_for(self.context.stage, self.context.driver(), self.context.config())
    }

    /// Validation inspector; reading it never changes the stage.
    pub fn errors(&self) -> Result<ErrorPage<'_>> {
        ErrorPage::new(self.context.driver(), self.context.config())
    }

    /// Completes the current section and moves to whichever section the form
    /// shows next.
    pub async fn advance(&mut self) -> Result<Transition> {
        let stage = self.context.stage;
        if stage.is_terminal() {
            return Err(FormError::InvalidTransition {
                from: stage,
                reason: "the application is already submitted".to_string(),
            });
        }

        info!(run_id = %self.context.run_id(), stage = %stage, "completing section");
        let outcome = self.complete_section(stage).await;
        self.record(stage, outcome, true)
    }

    /// Advances until confirmation. Validation that blocks a section fails
    /// the run.
    pub async fn run_to_completion(&mut self) -> Result<()> {
        while !self.context.stage.is_terminal() {
            if let Transition::Blocked { stage, messages } = self.advance().await? {
                return Err(self.blocked(stage, messages));
            }
        }
        self.context
            .reporter()
            .pass("Application submitted and confirmation shown");
        Ok(())
    }

    /// Jumps back from review to an earlier section through the side menu.
    pub async fn revisit(&mut self, target: Stage) -> Result<()> {
        let from = self.context.stage;
        if from != Stage::Review || target >= Stage::Review {
            return Err(FormError::InvalidTransition {
                from,
                reason: format!("cannot go back to {}; only review links back", target),
            });
        }
        let config = self.context.config();
        let menu = config
            .selectors
            .form
            .menu_item(target)
            .ok_or_else(|| FormError::InvalidTransition {
                from,
                reason: format!("no side menu entry for {}", target),
            })?;

        {
            let page = ReviewPage::new(self.context.driver(), config)?;
            page.click(menu).await.map_err(|e| e.in_stage(from))?;
            page.wait_visible(marker_for(target, config), &format!("{} header", target))
                .await
                .map_err(|e| e.in_stage(target))?;
        }

        self.context.completed.retain(|stage| *stage < target);
        self.context.stage = target;
        info!(from = %from, to = %target, "revisited section");
        Ok(())
    }

    /// Presses "next" `count` times without filling anything. Returns the
    /// stage reached.
    pub async fn skip_unfilled(&mut self, count: usize) -> Result<Stage> {
        for _ in 0..count {
            let stage = self.context.stage;
            if stage >= Stage::Review {
                return Err(FormError::InvalidTransition {
                    from: stage,
                    reason: "next is not offered from here".to_string(),
                });
            }
            let outcome = self.skip_section(stage).await;
            if let Transition::Blocked { stage, messages } = self.record(stage, outcome, false)? {
                return Err(self.blocked(stage, messages));
            }
        }
        Ok(self.context.stage)
    }

    /// Presses the review button from the review section without filling it.
    pub async fn request_review(&mut self) -> Result<Transition> {
        let stage = self.context.stage;
        if stage != Stage::Review {
            return Err(FormError::InvalidTransition {
                from: stage,
                reason: "review can only be requested from the review section".to_string(),
            });
        }
        let outcome = self.press_review(stage).await;
        self.record(stage, outcome, false)
    }

    async fn skip_section(&self, stage: Stage) -> Result<Transition> {
        let section = self.section()?;
        section
            .wait_visible(section.marker(), &format!("{} header", stage))
            .await?;
        section.next().await?;
        self.await_transition(stage).await
    }

    async fn press_review(&self, stage: Stage) -> Result<Transition> {
        let page = ReviewPage::new(self.context.driver(), self.context.config())?;
        page.request_review().await?;
        self.await_transition(stage).await
    }

    async fn complete_section(&self, stage: Stage) -> Result<Transition> {
        let section = self.section()?;
        section
            .wait_visible(section.marker(), &format!("{} header", stage))
            .await?;
        section.fill(self.context.data()).await?;
        section.exit().await?;
        self.await_transition(stage).await
    }

    /// Waits for a successor's marker. On timeout the form either shows why
    /// it stayed (blocked) or the run fails; confirmation never counts as
    /// blocked.
    async fn await_transition(&self, from: Stage) -> Result<Transition> {
        let driver = self.context.driver();
        let config = self.context.config();
        let successors = from.successors();
        let wait = WaitEngine::from_config(driver, &config.waits)?;
        let description = successors
            .iter()
            .map(|stage| format!("{} header", stage))
            .collect::<Vec<_>>()
            .join(" or ");

        let reached = wait
            .poll(
                format!("visible {}", description),
                wait.timeout(),
                config.waits.poll_interval(),
                move || async move {
                    for &stage in successors {
                        if visible_now(driver, marker_for(stage, config)).await? {
                            return Ok(Some(stage));
                        }
                    }
                    Ok::<_, FormError>(None)
                },
            )
            .await;

        let timeout = match reached {
            Ok(next) => return Ok(Transition::Advanced(next)),
            Err(e @ FormError::Timeout { .. }) => e,
            Err(e) => return Err(e),
        };
        let not_ready = FormError::NotReady {
            label: description,
            condition: "visible",
            source: Box::new(timeout),
        };
        if successors.contains(&Stage::Confirmation) {
            return Err(not_ready);
        }

        let messages = ErrorPage::new(driver, config)?.validation_messages().await?;
        if messages.is_empty() {
            Err(not_ready)
        } else {
            Ok(Transition::Blocked {
                stage: from,
                messages,
            })
        }
    }

    /// Applies a step's outcome to the run state and reports it.
    fn record(&mut self, stage: Stage, outcome: Result<Transition>, filled: bool) -> Result<Transition> {
        let reporter = self.context.reporter.clone();
        match outcome {
            Ok(Transition::Advanced(next)) => {
                if filled {
                    self.context.completed.push(stage);
                }
                self.context.stage = next;
                reporter.pass(&format!("{} done, now on {}", stage, next));
                Ok(Transition::Advanced(next))
            }
            Ok(Transition::Blocked { stage, messages }) => {
                warn!(stage = %stage, ?messages, "section blocked by validation");
                reporter.info(&format!("{} blocked: {}", stage, messages.join("; ")));
                Ok(Transition::Blocked { stage, messages })
            }
            Err(e) => {
                let e = e.in_stage(stage);
                self.context.failed_at = Some(stage);
                reporter.fail(&e.to_string(), None);
                Err(e)
            }
        }
    }

    /// Turns a blocked transition into a run failure at `stage`.
    fn blocked(&mut self, stage: Stage, messages: Vec<String>) -> FormError {
        self.context.failed_at = Some(stage);
        FormError::ValidationBlocked { stage, messages }
    }
}

/// Visible right now, without waiting. A missing or re-rendering node is
/// simply not visible.
async fn visible_now(driver: &dyn SessionDriver, locator: &Locator) -> Result<bool> {
    let element = match driver.find_element(locator).await {
        Ok(element) => element,
        Err(e) if matches!(e.kind(), FailureKind::NotFound | FailureKind::StaleElement) => {
            return Ok(false)
        }
        Err(e) => return Err(e),
    };
    match driver.is_displayed(&element).await {
        Ok(displayed) => Ok(displayed),
        Err(e) if e.kind() == FailureKind::StaleElement => {
            debug!(locator = %locator, "marker re-rendered while checking");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::testing::form_fixture::{self, FIELD_REQUIRED_MESSAGE};
    use crate::testing::{MemoryReporter, MockDriver};
    use crate::report::ReportEntry;
    use crate::types::FormData;
    use std::sync::Arc;

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.waits.explicit_timeout_ms = 2000;
        config.waits.poll_interval_ms = 100;
        config.waits.sync_timeout_ms = 500;
        config
    }

    fn workflow(driver: &MockDriver, config: Config) -> (FormWorkflow, MemoryReporter) {
        let reporter = MemoryReporter::new();
        let context = WorkflowContext::new(Box::new(driver.clone()), config, Arc::new(reporter.clone()));
        (FormWorkflow::new(context), reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_submission_reaches_confirmation() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        let (mut workflow, reporter) = workflow(&driver, config);

        workflow.run_to_completion().await.unwrap();

        assert_eq!(workflow.stage(), Stage::Confirmation);
        assert_eq!(workflow.context().completed(), &Stage::ALL[..7]);
        assert_eq!(workflow.context().failed_at(), None);
        assert!(driver.is_visible("confirmation-message"));
        assert!(driver.is_selected("elig-yes-0"));
        assert_eq!(driver.value("contact-field-0").as_deref(), Some("name"));
        assert_eq!(driver.value("proposal-title").as_deref(), Some("Project Title"));
        assert_eq!(driver.value("impact-amount-7").as_deref(), Some("100"));
        assert_eq!(driver.value("cost-description").as_deref(), Some("details1"));
        assert!(driver.is_selected("review-no-2"));
        assert!(driver.is_selected("declaration-checkbox"));
        assert!(reporter
            .entries()
            .iter()
            .all(|entry| !matches!(entry, ReportEntry::Fail { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_moves_one_section_at_a_time() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        let (mut workflow, _) = workflow(&driver, config);

        assert_eq!(
            workflow.advance().await.unwrap(),
            Transition::Advanced(Stage::ContactDetails)
        );
        assert_eq!(workflow.stage(), Stage::ContactDetails);
        assert!(driver.is_visible("contact-header"));
        assert!(!driver.is_visible("eligibility-header"));
        assert_eq!(workflow.context().completed(), &[Stage::Eligibility]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_business_impact_can_lead_straight_to_review() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        driver.with_dom(|dom| {
            dom.detach_group("eligibility");
            dom.attach_group("impact");
        });
        driver.clear_click_hooks("next");
        driver.on_click("next", |dom| {
            if dom.is_group_attached("impact") {
                dom.detach_group("impact");
                dom.attach_group("review");
            }
        });
        let reporter = MemoryReporter::new();
        let context = WorkflowContext::new(Box::new(driver.clone()), config, Arc::new(reporter))
            .resume_at(Stage::BusinessImpact);
        let mut workflow = FormWorkflow::new(context);

        assert_eq!(
            workflow.advance().await.unwrap(),
            Transition::Advanced(Stage::Review)
        );
        assert_eq!(workflow.stage(), Stage::Review);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_keeps_the_form_on_its_section() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        driver.clear_click_hooks("next");
        driver.on_click("next", |dom| {
            if dom.is_group_attached("eligibility") {
                dom.detach_group("eligibility");
                dom.attach_group("contact");
            } else if dom.is_group_attached("contact") {
                let missing = dom.value("contact-field-4").map_or(true, |v| v.is_empty());
                dom.set_displayed("contact-error", missing);
                if !missing {
                    dom.detach_group("contact");
                    dom.attach_group("proposal");
                }
            }
        });
        let mut data = FormData::default();
        data.contact.alternate_email = String::new();
        let reporter = MemoryReporter::new();
        let context = WorkflowContext::new(Box::new(driver.clone()), config, Arc::new(reporter))
            .with_data(data);
        let mut workflow = FormWorkflow::new(context);

        let err = workflow.run_to_completion().await.unwrap_err();

        match err {
            FormError::ValidationBlocked { stage, messages } => {
                assert_eq!(stage, Stage::ContactDetails);
                assert_eq!(messages, vec![FIELD_REQUIRED_MESSAGE.to_string()]);
            }
            other => panic!("expected a validation block, got {other}"),
        }
        assert_eq!(workflow.stage(), Stage::ContactDetails);
        assert_eq!(workflow.context().completed(), &[Stage::Eligibility]);
        assert_eq!(workflow.context().failed_at(), Some(Stage::ContactDetails));
    }

    #[tokio::test(start_paused = true)]
    async fn test_section_failure_is_attributed_and_stage_kept() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        driver.with_dom(|dom| dom.set_displayed("save", false));
        let (mut workflow, reporter) = workflow(&driver, config);

        let err = workflow.advance().await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Eligibility));
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert_eq!(workflow.stage(), Stage::Eligibility);
        assert_eq!(workflow.context().failed_at(), Some(Stage::Eligibility));
        assert!(workflow.context().completed().is_empty());
        assert!(matches!(
            reporter.entries().last(),
            Some(ReportEntry::Fail { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_confirmation_fails_the_run() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        driver.clear_click_hooks("submit");
        let (mut workflow, _) = workflow(&driver, config);

        let err = workflow.run_to_completion().await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Declaration));
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert_eq!(workflow.stage(), Stage::Declaration);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipping_sections_leaves_error_badges() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        let (mut workflow, _) = workflow(&driver, config);

        assert_eq!(workflow.skip_unfilled(5).await.unwrap(), Stage::Review);
        assert!(workflow.context().completed().is_empty());

        match workflow.request_review().await.unwrap() {
            Transition::Blocked { stage, messages } => {
                assert_eq!(stage, Stage::Review);
                assert!(!messages.is_empty());
            }
            other => panic!("expected review to be blocked, got {other:?}"),
        }
        assert_eq!(workflow.stage(), Stage::Review);
        assert!(workflow.errors().unwrap().error_count().await.unwrap() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_skip_records_failed_stage() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        driver.clear_click_hooks("next");
        driver.on_click("next", |dom| {
            if dom.is_group_attached("eligibility") {
                dom.detach_group("eligibility");
                dom.attach_group("contact");
            } else if dom.is_group_attached("contact") {
                dom.set_displayed("contact-error", true);
            }
        });
        let (mut workflow, _) = workflow(&driver, config);

        let err = workflow.skip_unfilled(3).await.unwrap_err();

        assert!(matches!(
            err,
            FormError::ValidationBlocked { stage: Stage::ContactDetails, .. }
        ));
        assert_eq!(workflow.stage(), Stage::ContactDetails);
        assert_eq!(workflow.context().failed_at(), Some(Stage::ContactDetails));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revisit_only_from_review() {
        let config = quick_config();
        let driver = form_fixture::grant_form_at_eligibility(&config);
        let (mut workflow, _) = workflow(&driver, config);

        let err = workflow.revisit(Stage::Eligibility).await.unwrap_err();
        assert!(matches!(err, FormError::InvalidTransition { from: Stage::Eligibility, .. }));

        for _ in 0..5 {
            workflow.advance().await.unwrap();
        }
        assert_eq!(workflow.stage(), Stage::Review);

        workflow.revisit(Stage::Proposal).await.unwrap();
        assert_eq!(workflow.stage(), Stage::Proposal);
        assert_eq!(
            workflow.context().completed(),
            &[Stage::Eligibility, Stage::ContactDetails]
        );
        assert!(driver.is_visible("proposal-header"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_advance_past_confirmation() {
        let config = quick_config();
        let driver = MockDriver::new();
        let reporter = MemoryReporter::new();
        let context = WorkflowContext::new(Box::new(driver), config, Arc::new(reporter))
            .resume_at(Stage::Confirmation);
        let mut workflow = FormWorkflow::new(context);

        assert!(matches!(
            workflow.advance().await,
            Err(FormError::InvalidTransition { from: Stage::Confirmation, .. })
        ));
        workflow.run_to_completion().await.unwrap();
    }
}
