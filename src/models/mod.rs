pub mod answer;
pub mod loaders;
pub mod question;
pub mod request;

pub use answer::FormattedAnswer;
pub use loaders::load_toml_to_form_page;
pub use question::{CacheKey, ContainerId, ExtractedQuestion, FormPage, FormQuestion, QuestionIdentity};
pub use request::{Content, GenerateRequest, GenerationConfig, Part};
