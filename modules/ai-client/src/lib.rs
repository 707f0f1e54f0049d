pub mod claude;
pub mod error;
pub mod gateway;
mod http;
pub mod openai;
pub mod openrouter;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use error::AiError;
pub use gateway::{GenerationRequest, ProviderGateway};
pub use openai::OpenAi;
pub use openrouter::OpenRouter;
pub use traits::{Message, MessageRole, ModelNaming, TextProvider};
pub use util::{extract_json_object, strip_code_blocks, truncate_chars};
