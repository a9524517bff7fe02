//! HTTP adapters: the JSON-RPC backend client and the chat-completions
//! reasoner.

mod client;
mod reasoning;

pub use client::HttpBackendClient;
pub use reasoning::{ChatCompletionsConfig, ChatCompletionsReasoner};

/// Longest response body excerpt kept in error messages.
const BODY_EXCERPT_LIMIT: usize = 512;

fn body_excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LIMIT).collect()
}
