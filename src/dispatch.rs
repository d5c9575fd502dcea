//! The resolve-then-act protocol and session directives.

use crate::cache::ComponentCache;
use crate::component::Component;
use crate::criteria::{strip_quotes, CriterionSpec};
use crate::driver::Driver;
use crate::frames::{FrameContext, FrameIndex, FramePath};
use crate::handlers::{ActionContext, ComponentKind};
use crate::locator::Recognition;
use crate::report::{Reporter, TracingReporter};
use crate::search::ElementLocator;
use crate::settings::Settings;
use crate::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Action keyword that bypasses the component cache.
pub const EXISTENCE_CHECK: &str = "GUIDoesExist";

/// One browser session's resolution state.
///
/// Owns the driver, the settings, the frame index and the component cache.
/// Every operation takes `&mut self`, so steps run strictly in order.
pub struct Session<D, R = TracingReporter> {
    driver: D,
    reporter: R,
    settings: Settings,
    frames: FrameIndex,
    cache: ComponentCache,
    frame: FrameContext,
    frame_locked: bool,
    variables: HashMap<String, String>,
}

impl<D: Driver> Session<D> {
    /// Create a session that reports through `tracing`.
    pub fn new(driver: D, settings: Settings) -> Self {
        Self::with_reporter(driver, TracingReporter, settings)
    }
}

impl<D: Driver, R: Reporter> Session<D, R> {
    pub fn with_reporter(driver: D, reporter: R, settings: Settings) -> Self {
        Self {
            driver,
            reporter,
            settings,
            frames: FrameIndex::new(),
            cache: ComponentCache::new(),
            frame: FramePath::top(),
            frame_locked: false,
            variables: HashMap::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The frame the last resolution ended in.
    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn is_frame_locked(&self) -> bool {
        self.frame_locked
    }

    pub fn cache(&self) -> &ComponentCache {
        &self.cache
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Consume the session, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Reset per-session state and apply the configured wait timeout.
    pub async fn start(&mut self) -> Result<()> {
        self.invalidate().await?;
        self.driver
            .set_wait_timeout(Duration::from_secs(self.settings.wait_timeout_secs))
            .await?;
        self.reporter.success("session started");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.reset();
        self.driver.release_elements().await?;
        self.reporter.success("session closed");
        Ok(())
    }

    /// Forget the frame index, cached components and any frame lock, and
    /// return the driver to the top document. Call after the page navigates.
    pub async fn invalidate(&mut self) -> Result<()> {
        self.reset();
        self.driver.release_elements().await?;
        self.driver.switch_to_default_frame().await
    }

    fn reset(&mut self) {
        self.frames.invalidate();
        self.cache.clear();
        self.frame = FramePath::top();
        self.frame_locked = false;
    }

    /// Resolve `criteria` for `kind` and run `action` on the nth match.
    ///
    /// Exactly one success or failure is reported. Only [`Error::NotFound`]
    /// is returned, and only while [`Settings::abort_on_not_found`] is set;
    /// every other failure is reported and swallowed.
    pub async fn perform(
        &mut self,
        kind: ComponentKind,
        action: &str,
        criteria: &str,
        nth: usize,
        params: &[String],
    ) -> Result<()> {
        self.perform_as(kind, action, criteria, nth, params, None).await
    }

    /// Like [`perform`](Self::perform), searching for `declared_type`
    /// instead of the kind's own type.
    pub async fn perform_as(
        &mut self,
        kind: ComponentKind,
        action: &str,
        criteria: &str,
        nth: usize,
        params: &[String],
        declared_type: Option<&str>,
    ) -> Result<()> {
        let declared = declared_type.unwrap_or(kind.type_name());
        let spec = CriterionSpec::parse(criteria, Some(declared), self.settings.partial_match);
        let mut msg = format!("{} '{}'", action, spec);

        let result = self.resolve_and_act(kind, action, &spec, nth, params, &mut msg).await;

        if self.settings.highlight {
            if let Err(e) = self.driver.clear_highlight().await {
                debug!("clear highlight failed: {}", e);
            }
        }

        self.report_step(&msg, result)
    }

    /// Report `result` once; hand back only a not-found error, and only
    /// while aborting on it.
    fn report_step(&self, msg: &str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.reporter.success(msg);
                Ok(())
            }
            Err(e) => {
                self.reporter.failure(&format!("Failed to {}, due to {}", msg, e));
                if self.settings.abort_on_not_found && e.is_not_found() {
                    Err(e)
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn resolve_and_act(
        &mut self,
        kind: ComponentKind,
        action: &str,
        spec: &CriterionSpec,
        nth: usize,
        params: &[String],
        msg: &mut String,
    ) -> Result<()> {
        let bypass_cache = action.trim().eq_ignore_ascii_case(EXISTENCE_CHECK);

        let cached = if bypass_cache {
            None
        } else {
            match self
                .cache
                .lookup(&self.driver, &self.settings, spec, &self.frame)
                .await
            {
                Ok(hit) => hit,
                Err(e) => {
                    warn!("cache lookup failed: {}", e);
                    None
                }
            }
        };

        let component = match cached {
            Some(component) => {
                self.frame = component.frame.clone();
                component
            }
            None => {
                let component = self.resolve(kind, spec, nth).await?;
                if !bypass_cache {
                    self.cache.store(&self.settings, spec, &component);
                }
                component
            }
        };

        if self.settings.highlight {
            if let Err(e) = self.driver.highlight(&component.element).await {
                debug!("highlight failed: {}", e);
            }
        }

        msg.push_str(&format!(" of {}", component.identity()));
        if !params.is_empty() {
            msg.push_str(&format!(", with parameters: {:?}", params));
        }

        ActionContext {
            driver: &self.driver,
            component: &component,
            settings: &self.settings,
            variables: &mut self.variables,
        }
        .perform(action, params)
        .await
    }

    /// Search, then wrap candidates until the nth successful wrap.
    async fn resolve(&mut self, kind: ComponentKind, spec: &CriterionSpec, nth: usize) -> Result<Component> {
        let start = self.frame.clone();
        let outcome = ElementLocator::new(&self.driver, &self.settings)
            .search(spec, &mut self.frames, &start, self.frame_locked)
            .await?;
        if self.settings.log_details {
            debug!(
                "'{}': {} candidates via {:?} in {}",
                spec,
                outcome.elements.len(),
                outcome.strategy,
                outcome.frame
            );
        }

        let mut tally = 0;
        for element in outcome.elements {
            let wrapped = Component::wrap(
                &self.driver,
                kind,
                element,
                outcome.frame.clone(),
                outcome.scope.clone(),
                outcome.hint.clone(),
            )
            .await;
            match wrapped {
                Ok(component) => {
                    tally += 1;
                    if tally == nth {
                        self.frame = outcome.frame;
                        info!("resolved '{}' to {}", spec, component.identity());
                        return Ok(component);
                    }
                }
                Err(e) => warn!("skipping candidate: {}", e),
            }
        }

        // The driver stays in the last frame searched; the next search
        // starts again from `self.frame`.
        Err(Error::NotFound(format!(
            "Found {} times '{}', but the {} match is required",
            tally,
            spec,
            ordinal(nth)
        )))
    }

    pub fn continue_on_not_found(&mut self) {
        self.settings.abort_on_not_found = false;
        self.reporter.success("continue testing if an item is not found");
    }

    pub fn abort_on_not_found(&mut self) {
        self.settings.abort_on_not_found = true;
        self.reporter.success("abort testing if an item is not found");
    }

    pub fn set_partial_match(&mut self, accept: bool) {
        self.settings.partial_match = accept;
        self.reporter.success(if accept {
            "accept partial text matches"
        } else {
            "deny partial text matches"
        });
    }

    pub fn set_use_cache(&mut self, enabled: bool) {
        self.settings.use_cache = enabled;
        if !enabled {
            self.cache.clear();
        }
        self.reporter.success(if enabled {
            "use cached components"
        } else {
            "stop using cached components"
        });
    }

    pub fn set_log_details(&mut self, enabled: bool) {
        self.settings.log_details = enabled;
        self.reporter
            .success(&format!("log details {}", if enabled { "on" } else { "off" }));
    }

    pub fn set_highlight(&mut self, enabled: bool) {
        self.settings.highlight = enabled;
        self.reporter
            .success(&format!("highlight {}", if enabled { "on" } else { "off" }));
    }

    pub async fn set_wait_timeout(&mut self, secs: u64) -> Result<()> {
        self.settings.wait_timeout_secs = secs;
        let result = self.driver.set_wait_timeout(Duration::from_secs(secs)).await;
        self.report_directive(&format!("set wait timeout to {}s", secs), result)
    }

    /// Check that the page title is `title`, or contains it ignoring case
    /// while partial matches are accepted. `^name` reads the title from a
    /// variable. A wrong title is reported like a missing element.
    pub async fn window_displayed(&mut self, title: &str) -> Result<()> {
        let wanted = match title.trim().strip_prefix('^') {
            Some(name) => self
                .variables
                .get(name)
                .cloned()
                .unwrap_or_else(|| title.trim().to_string()),
            None => strip_quotes(title.trim()).to_string(),
        };
        let result = match self.driver.title().await {
            Ok(actual) if title_matches(&actual, &wanted, self.settings.partial_match) => {
                info!("window title '{}' matches '{}'", actual, wanted);
                Ok(())
            }
            Ok(actual) => Err(Error::NotFound(format!(
                "window titled '{}', the page title is '{}'",
                wanted, actual
            ))),
            Err(e) => Err(e),
        };
        self.report_step(&format!("find the '{}' window", wanted), result)
    }

    pub fn assign(&mut self, name: &str, value: &str) {
        self.variables.insert(name.to_string(), value.to_string());
        self.reporter.success(&format!("assign {} = '{}'", name, value));
    }

    /// Lock searches to the first embedded frame.
    pub async fn focus_first_frame(&mut self) -> Result<()> {
        let result = self.focus_first_frame_inner().await;
        self.report_directive("focus on the first frame", result)
    }

    async fn focus_first_frame_inner(&mut self) -> Result<()> {
        let nodes = self.frames.nodes(&self.driver).await?;
        let node = nodes
            .into_iter()
            .find(|n| !n.is_top())
            .ok_or_else(|| Error::NotFound("the page has no embedded frame".into()))?;
        self.lock_frame(node.path).await
    }

    /// Lock searches to a frame named by a recognition string (`FRAMEID=..`),
    /// or by the frame's id or name.
    pub async fn focus_frame(&mut self, key: &str) -> Result<()> {
        let result = self.focus_frame_inner(key).await;
        self.report_directive(&format!("focus on frame '{}'", key), result)
    }

    async fn focus_frame_inner(&mut self, key: &str) -> Result<()> {
        let path = match Recognition::parse(key).filter(|r| r.has_frames()) {
            Some(rec) => rec.frames,
            None => self
                .frames
                .find(&self.driver, key.trim())
                .await?
                .map(|n| n.path)
                .ok_or_else(|| Error::NotFound(format!("frame '{}'", key)))?,
        };
        self.lock_frame(path).await
    }

    async fn lock_frame(&mut self, path: FramePath) -> Result<()> {
        self.driver.reset_frame_context(&path).await?;
        info!("frame locked to {}", path);
        self.frame = path;
        self.frame_locked = true;
        Ok(())
    }

    /// Unlock the frame and return to the top document.
    pub async fn release_frame(&mut self) -> Result<()> {
        self.frame_locked = false;
        self.frame = FramePath::top();
        let result = self.driver.switch_to_default_frame().await;
        self.report_directive("release the focused frame", result)
    }

    fn report_directive(&self, what: &str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.reporter.success(what);
                Ok(())
            }
            Err(e) => {
                self.reporter.failure(&format!("Failed to {}, due to {}", what, e));
                Err(e)
            }
        }
    }
}

fn title_matches(actual: &str, wanted: &str, partial: bool) -> bool {
    let actual = actual.trim();
    let wanted = wanted.trim();
    actual == wanted || (partial && actual.to_lowercase().contains(&wanted.to_lowercase()))
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
