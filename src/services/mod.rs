pub mod answer_cache;
pub mod identity;
pub mod prompt;
pub mod response_decoder;

pub use answer_cache::{AnswerCache, JsonFileStore, KeyValueStore, MemoryStore};
pub use identity::{identity_of, normalize, CACHE_NAMESPACE};
pub use prompt::{build_prompt, PromptBuilder};
pub use response_decoder::{decode, RawPayload};
