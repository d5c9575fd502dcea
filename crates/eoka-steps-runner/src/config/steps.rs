use eoka_steps::ComponentKind;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// One entry of a step file's `steps:` list.
#[derive(Debug, Clone)]
pub enum Step {
    /// Resolve an element and run a keyword on it.
    Perform(PerformStep),

    // Page
    Goto(GotoStep),
    Wait(WaitStep),
    Screenshot(ScreenshotStep),
    Log(LogStep),

    // Session directives
    AbortOnNotFound,
    ContinueOnNotFound,
    PartialMatches(bool),
    UseCache(bool),
    LogDetails(bool),
    Highlight(bool),
    WaitTimeout(u64),
    FocusFrame(String),
    FocusFirstFrame,
    ReleaseFrame,
    /// Page title to check; `^name` reads it from a variable.
    WindowDisplayed(String),
    Assign(AssignStep),
}

impl Step {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Perform(_) => "perform",
            Self::Goto(_) => "goto",
            Self::Wait(_) => "wait",
            Self::Screenshot(_) => "screenshot",
            Self::Log(_) => "log",
            Self::AbortOnNotFound => "abort_on_not_found",
            Self::ContinueOnNotFound => "continue_on_not_found",
            Self::PartialMatches(_) => "partial_matches",
            Self::UseCache(_) => "use_cache",
            Self::LogDetails(_) => "log_details",
            Self::Highlight(_) => "highlight",
            Self::WaitTimeout(_) => "wait_timeout",
            Self::FocusFrame(_) => "focus_frame",
            Self::FocusFirstFrame => "focus_first_frame",
            Self::ReleaseFrame => "release_frame",
            Self::WindowDisplayed(_) => "window_displayed",
            Self::Assign(_) => "assign",
        }
    }
}

const STEP_NAMES: &[&str] = &[
    "perform",
    "goto",
    "wait",
    "screenshot",
    "log",
    "abort_on_not_found",
    "continue_on_not_found",
    "partial_matches",
    "use_cache",
    "log_details",
    "highlight",
    "wait_timeout",
    "focus_frame",
    "focus_first_frame",
    "release_frame",
    "window_displayed",
    "assign",
];

const UNIT_STEPS: &[&str] = &[
    "abort_on_not_found",
    "continue_on_not_found",
    "focus_first_frame",
    "release_frame",
];

fn unit_step(name: &str) -> Option<Step> {
    match name {
        "abort_on_not_found" => Some(Step::AbortOnNotFound),
        "continue_on_not_found" => Some(Step::ContinueOnNotFound),
        "focus_first_frame" => Some(Step::FocusFirstFrame),
        "release_frame" => Some(Step::ReleaseFrame),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StepVisitor)
    }
}

struct StepVisitor;

impl<'de> Visitor<'de> for StepVisitor {
    type Value = Step;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a step (string for directives without a value, or map with single key)")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        unit_step(value).ok_or_else(|| de::Error::unknown_variant(value, UNIT_STEPS))
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::custom("expected step type key"))?;

        if let Some(step) = unit_step(&key) {
            let _: serde_yaml::Value = map.next_value()?;
            return Ok(step);
        }

        let step = match key.as_str() {
            "perform" => Step::Perform(map.next_value()?),
            "goto" => Step::Goto(map.next_value()?),
            "wait" => Step::Wait(map.next_value()?),
            "screenshot" => Step::Screenshot(map.next_value()?),
            "log" => Step::Log(map.next_value()?),
            "partial_matches" => Step::PartialMatches(map.next_value()?),
            "use_cache" => Step::UseCache(map.next_value()?),
            "log_details" => Step::LogDetails(map.next_value()?),
            "highlight" => Step::Highlight(map.next_value()?),
            "wait_timeout" => Step::WaitTimeout(map.next_value()?),
            "focus_frame" => Step::FocusFrame(map.next_value()?),
            "window_displayed" => Step::WindowDisplayed(map.next_value()?),
            "assign" => Step::Assign(map.next_value()?),
            other => return Err(de::Error::unknown_variant(other, STEP_NAMES)),
        };

        Ok(step)
    }
}

// --- Step payloads ---

fn default_nth() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerformStep {
    /// Action keyword, e.g. `Click` or `SetTextValue`.
    pub action: String,
    #[serde(default)]
    pub kind: ComponentKind,
    /// Recognition string or display text.
    pub criteria: String,
    /// Which match to act on, 1-based.
    #[serde(default = "default_nth")]
    pub nth: usize,
    #[serde(default)]
    pub params: Vec<String>,
    /// Searched-for type when it differs from the kind's own.
    #[serde(rename = "type")]
    pub declared_type: Option<String>,
}

impl fmt::Display for PerformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.action, self.kind, self.criteria)?;
        if self.nth != 1 {
            write!(f, " #{}", self.nth)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GotoStep {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitStep {
    pub ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenshotStep {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogStep {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignStep {
    pub name: String,
    pub value: String,
}
