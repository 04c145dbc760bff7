use llmwire_core::Message;
use sha2::{Digest, Sha256};

/// Deterministic key for a completion request.
///
/// Covers the model and the ordered messages only; generation options do not
/// take part. Every field is length-prefixed before hashing, so moving text
/// between adjacent fields always changes the key.
pub fn cache_key(model: &str, messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, model.as_bytes());
    for message in messages {
        update_field(&mut hasher, message.role.as_str().as_bytes());
        update_field(&mut hasher, message.content.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
