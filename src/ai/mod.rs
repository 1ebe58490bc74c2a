mod summarizer;

pub use summarizer::{build_prompt, Language, PromptInput, Summarizer};
