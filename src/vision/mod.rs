pub mod config;
pub mod correlation;
pub mod matcher;
pub mod template_store;

pub use self::config::MatchConfig;
pub use matcher::{MatchResult, Matcher};
pub use template_store::{Template, TemplateStore};
