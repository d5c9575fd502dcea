mod driver;
mod executor;

pub use driver::EokaDriver;

use crate::config::{BrowserConfig, Config};
use crate::Result;
use eoka::{Browser, Page};
use eoka_steps::{Reporter, Session, Settings, TracingReporter};
use std::cell::Cell;
use std::time::Instant;
use tracing::{debug, info, warn};

pub(crate) type StepSession = Session<EokaDriver, StepReporter>;

/// Result of running a step file.
#[derive(Debug)]
pub struct RunResult {
    /// No step failed and none stopped the run.
    pub success: bool,
    /// Why the run stopped early, if it did.
    pub error: Option<String>,
    pub steps_executed: usize,
    /// Failures reported by the session, including swallowed ones.
    pub failures: usize,
    pub duration_ms: u64,
}

/// Logs through `tracing` and counts outcomes.
#[derive(Debug, Default)]
pub struct StepReporter {
    inner: TracingReporter,
    successes: Cell<usize>,
    failures: Cell<usize>,
}

impl StepReporter {
    pub fn successes(&self) -> usize {
        self.successes.get()
    }

    pub fn failures(&self) -> usize {
        self.failures.get()
    }

    fn reset(&self) {
        self.successes.set(0);
        self.failures.set(0);
    }
}

impl Reporter for StepReporter {
    fn success(&self, message: &str) {
        self.successes.set(self.successes.get() + 1);
        self.inner.success(message);
    }

    fn failure(&self, message: &str) {
        self.failures.set(self.failures.get() + 1);
        self.inner.failure(message);
    }

    fn warning(&self, message: &str) {
        self.inner.warning(message);
    }
}

/// Runs step files in one browser.
pub struct Runner {
    browser: Browser,
    session: StepSession,
}

impl Runner {
    /// Launch a browser and open a blank page for the session.
    pub async fn new(config: &BrowserConfig, settings: Settings) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;
        let session = Session::with_reporter(EokaDriver::new(page), StepReporter::default(), settings);

        Ok(Self { browser, session })
    }

    pub fn page(&self) -> &Page {
        self.session.driver().page()
    }

    pub fn session(&self) -> &StepSession {
        &self.session
    }

    /// Load the target page and run every step in order.
    ///
    /// Stops at the first step that returns an error. Failures the session
    /// only reports are counted but do not stop the run.
    pub async fn run(&mut self, config: &Config) -> Result<RunResult> {
        let start = Instant::now();
        self.session.reporter().reset();
        self.session.start().await?;

        info!("Navigating to: {}", config.target.url);
        self.page().goto(&config.target.url).await?;

        let mut steps_executed = 0;
        let mut error = None;
        for (i, step) in config.steps.iter().enumerate() {
            debug!("Executing step {}: {}", i + 1, step.name());
            if let Err(e) = executor::execute(&mut self.session, step).await {
                warn!("Step {} ({}) stopped the run: {}", i + 1, step.name(), e);
                error = Some(format!("step {} ({}): {}", i + 1, step.name(), e));
                break;
            }
            steps_executed += 1;
        }

        let failures = self.session.reporter().failures();
        debug!(
            "{} steps, {} successes, {} failures",
            steps_executed,
            self.session.reporter().successes(),
            failures
        );
        Ok(RunResult {
            success: error.is_none() && failures == 0,
            error,
            steps_executed,
            failures,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Close the session and the browser.
    pub async fn close(mut self) -> Result<()> {
        self.session.close().await?;
        self.browser.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_reporter_counts() {
        let reporter = StepReporter::default();
        reporter.success("one");
        reporter.failure("two");
        reporter.failure("three");
        reporter.warning("four");
        assert_eq!(reporter.successes(), 1);
        assert_eq!(reporter.failures(), 2);

        reporter.reset();
        assert_eq!(reporter.failures(), 0);
    }
}
