//! Templated file output for script events.

mod router;
mod template;

pub use router::OutputRouter;
pub use template::{OutputTemplate, TemplateTokens, DEFAULT_TIMESTAMP_FORMAT};
