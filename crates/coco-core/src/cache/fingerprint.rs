//! Request fingerprints
//!
//! A fingerprint is the SHA-256 of a canonical JSON rendering of everything
//! that influences a completion: model, messages and sampling parameters.
//! `serde_json::Map` keeps keys sorted, so the rendering is stable.

use coco_llm::{CompletionParams, Message};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Content normalization applied before hashing
///
/// Line endings are unified and trailing whitespace dropped; nothing inside
/// the text is rewritten.
#[must_use]
pub fn normalize_content(content: &str) -> String {
    content.replace("\r\n", "\n").trim_end().to_string()
}

/// Deterministic cache key for a request
#[must_use]
pub fn fingerprint(model: &str, messages: &[Message], params: &CompletionParams) -> String {
    let messages: Vec<_> = messages
        .iter()
        .map(|m| {
            json!({
                "role": m.role.as_str(),
                "content": normalize_content(&m.content),
            })
        })
        .collect();

    let canonical = json!({
        "model": model,
        "messages": messages,
        "params": {
            // Temperatures equal to four decimals share a key
            "temperature": format!("{:.4}", params.temperature),
            "max_tokens": params.max_tokens,
            "stop": params.stop,
        },
    });

    hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
}
