use std::path::PathBuf;

use error::{Error, Result};
use llm::CompletionBackend;
use output::OutputWriter;
use prompt::{NarrativeInputs, PromptBuilder};
use settings::{Loaded, Settings, SettingsStore};

pub mod error;
pub mod llm;
pub mod output;
pub mod prompt;
pub mod sanitize;
pub mod settings;

/// Everything a front-end needs: generate from the seven inputs, save the
/// result, and read or write the settings.
pub struct Assistant {
    store: SettingsStore,
    prompts: PromptBuilder,
    backend: Box<dyn CompletionBackend>,
    writer: OutputWriter,
}

impl Assistant {
    pub fn new(
        store: SettingsStore,
        backend: Box<dyn CompletionBackend>,
        writer: OutputWriter,
    ) -> Self {
        Self {
            store,
            prompts: PromptBuilder::new(),
            backend,
            writer,
        }
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.store
    }

    /// Validates the inputs, calls the backend with the current settings and
    /// returns the sanitized, trimmed text.
    pub fn submit_inputs(&self, inputs: &NarrativeInputs) -> Result<String> {
        let prompt = self.prompts.build(inputs)?;

        let settings = match self.store.load() {
            Loaded::Found(settings) => settings,
            Loaded::Missing => {
                return Err(Error::Config(format!(
                    "no settings found at {}, open the settings and enter an API key",
                    self.store.path().display()
                )))
            }
            Loaded::Invalid { reason } => return Err(Error::Config(reason)),
        };

        let raw = self.backend.complete(&prompt, &settings)?;
        Ok(sanitize::sanitize(&raw).trim().to_string())
    }

    pub fn save_result(&self, text: &str) -> Result<PathBuf> {
        if text.trim().is_empty() {
            return Err(Error::EmptyResult);
        }
        self.writer.persist(text)
    }

    pub fn load_settings(&self) -> Loaded {
        self.store.load()
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.store.save(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use super::llm::CompletionClient;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn inputs() -> NarrativeInputs {
        NarrativeInputs {
            protagonist: "小明".to_string(),
            cause: "丢了钥匙".to_string(),
            process: "沿着放学路一路寻找".to_string(),
            result: "在花坛边找到".to_string(),
            setting: "傍晚的街道".to_string(),
            characterization: "急得满头大汗".to_string(),
            emotion: "失而复得的喜悦".to_string(),
        }
    }

    fn assistant_in(dir: &Path, url: &str) -> Result<Assistant> {
        let store = SettingsStore::new(dir.join(settings::SETTINGS_FILE_NAME));
        store.save(&Settings {
            url: url.to_string(),
            api_key: "sk-test123".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.8,
        })?;
        Ok(Assistant::new(
            store,
            Box::new(CompletionClient::new()?),
            OutputWriter::new(dir),
        ))
    }

    fn txt_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect()
    }

    #[tokio::test]
    async fn generate_then_save() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "<think>plan</think>Final story."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let url = server.uri();
        let (text, saved) = tokio::task::spawn_blocking(move || {
            let assistant = assistant_in(&root, &url)?;
            let text = assistant.submit_inputs(&inputs())?;
            let saved = assistant.save_result(&text)?;
            Ok::<_, Error>((text, saved))
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(text, "Final story.");
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "Final story.");
    }

    #[tokio::test]
    async fn unauthorized_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let url = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            let assistant = assistant_in(&root, &url)?;
            let text = assistant.submit_inputs(&inputs())?;
            assistant.save_result(&text)
        })
        .await
        .unwrap();

        match result {
            Err(Error::Api(api)) => assert_eq!(api.status(), Some(401)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(txt_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn invalid_inputs_skip_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let url = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            let mut incomplete = inputs();
            incomplete.result = " ".to_string();
            assistant_in(&root, &url)?.submit_inputs(&incomplete)
        })
        .await
        .unwrap();

        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn missing_settings_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(
            SettingsStore::new(dir.path().join(settings::SETTINGS_FILE_NAME)),
            Box::new(crate::debug_tool::EchoBackend),
            OutputWriter::new(dir.path()),
        );
        assert!(matches!(
            assistant.submit_inputs(&inputs()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn settings_edits_apply_to_the_next_call() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(
            SettingsStore::new(dir.path().join(settings::SETTINGS_FILE_NAME)),
            Box::new(crate::debug_tool::EchoBackend),
            OutputWriter::new(dir.path()),
        );

        assistant
            .save_settings(&Settings::with_api_key(""))
            .unwrap();
        assert!(matches!(
            assistant.submit_inputs(&inputs()),
            Err(Error::Config(_))
        ));

        assistant
            .save_settings(&Settings::with_api_key("sk-test123"))
            .unwrap();
        let text = assistant.submit_inputs(&inputs()).unwrap();
        assert!(text.contains("失而复得的喜悦"));
        assert!(!text.contains("<think>"));
    }

    #[test]
    fn blank_result_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(
            SettingsStore::new(dir.path().join(settings::SETTINGS_FILE_NAME)),
            Box::new(crate::debug_tool::EchoBackend),
            OutputWriter::new(dir.path()),
        );
        assert!(matches!(
            assistant.save_result(" \n "),
            Err(Error::EmptyResult)
        ));
        assert!(txt_files(dir.path()).is_empty());
    }
}
