pub mod params;
pub mod schema;
pub mod steps;

pub use params::{ParamDef, Params};
pub use schema::{BrowserConfig, Config, TargetUrl, Viewport};
pub use steps::{PerformStep, Step};
