//! Client for the external text-generation service.

mod openai_client;
mod types;

pub use openai_client::OpenAiClient;
