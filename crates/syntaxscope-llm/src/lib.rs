//! AI augmentation for SyntaxScope catalog records.
//!
//! The augmentor talks to any [`TextGenerator`]; the Ollama HTTP client is
//! the production backend (feature `ollama`, on by default). Tests and
//! offline runs plug in their own generator.

pub mod augment;
pub mod generator;
pub mod ollama;
pub mod prompts;
pub mod retry;
pub mod sample;
pub mod tag_response;

pub use augment::*;
pub use generator::*;
pub use ollama::*;
pub use prompts::*;
pub use retry::*;
pub use sample::*;
pub use tag_response::*;
