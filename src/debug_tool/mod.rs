use crate::sys::{error::Result, llm::CompletionBackend, settings::Settings};

/// Offline backend for `--debug-llm`: answers with the prompt itself, behind a
/// reasoning span so the sanitizer has something to strip.
pub struct EchoBackend;

impl CompletionBackend for EchoBackend {
    fn complete(&self, prompt: &str, settings: &Settings) -> Result<String> {
        settings.require_api_key()?;
        log::debug!("echo backend, model={}", settings.model);
        Ok(format!(
            "<think>echo of {} chars for {}</think>\n{prompt}",
            prompt.chars().count(),
            settings.model
        ))
    }
}
