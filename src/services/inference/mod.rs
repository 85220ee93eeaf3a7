/// Generative-text inference abstraction
///
/// The recommendation engine sends a single text request and gets free text
/// back. Any error here is recoverable: the engine falls back to deterministic
/// ranking instead of retrying.
use crate::error::AppResult;

pub mod huggingface;

pub use huggingface::HuggingFaceProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Sends one request and returns the raw reply text
    async fn infer(&self, request_text: &str) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
