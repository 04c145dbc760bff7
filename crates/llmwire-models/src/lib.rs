mod scripted;
pub use scripted::ScriptedChatModel;

pub mod backend;
pub use backend::{FakeBackend, HttpBackend, ProviderBackend, ProviderRequest, ProviderResponse};

mod retry;
pub use retry::{RetryChatModel, RetryEmbeddings, RetryPolicy};

mod rate_limit;
pub use rate_limit::{RateLimitedChatModel, RateLimitedEmbeddings};
