pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod validate;

pub use pipeline::{PipelineStatistics, RagPipeline};
pub use prompt::PromptBuilder;
pub use sanitize::AnswerSanitizer;
pub use validate::ContextValidator;
