pub mod openai;
pub mod prompts;
pub mod provider;
pub mod types;
