//! # eoka-steps-runner
//!
//! Run browser test steps from YAML. Each `perform` step goes through the
//! `eoka-steps` engine against a real browser page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eoka_steps_runner::{Config, Runner};
//!
//! # #[tokio::main]
//! # async fn main() -> eoka_steps_runner::Result<()> {
//! let config = Config::load("checkout.yaml")?;
//! let mut runner = Runner::new(&config.browser, config.settings.clone()).await?;
//! let result = runner.run(&config).await?;
//! println!("Success: {} ({} failures)", result.success, result.failures);
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod runner;

pub use config::{
    BrowserConfig, Config, ParamDef, Params, PerformStep, Step, TargetUrl, Viewport,
};
pub use runner::{EokaDriver, RunResult, Runner, StepReporter};

/// Result type for eoka-steps-runner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or running a step file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("step failed: {0}")]
    Step(#[from] eoka_steps::Error),
}
