use crate::config::LlmConfig;
use crate::llm::LlmRequest;
use std::collections::HashMap;

/// Execution context shared by every agent in a run: string settings, a
/// human-readable run log, and the model client configuration.
pub struct Ctx {
    store: HashMap<String, String>,
    log: Vec<String>,
    llm: Option<LlmConfig>,
}

impl Ctx {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            log: vec![],
            llm: None,
        }
    }

    /// Attach the model configuration used by [`Ctx::llm`].
    pub fn with_llm(mut self, config: LlmConfig) -> Self {
        self.llm = Some(config);
        self
    }

    /// The attached model configuration, if any.
    pub fn llm_config(&self) -> Option<&LlmConfig> {
        self.llm.as_ref()
    }

    /// Start a chat request against the configured model.
    ///
    /// Sending fails with [`crate::StepError::Invalid`] when no model is
    /// configured.
    pub fn llm(&self) -> LlmRequest<'_> {
        LlmRequest::new(self.llm.as_ref())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.store.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.store.get(key).map(|s| s.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.store.remove(key)
    }

    pub fn log(&mut self, msg: impl Into<String>) {
        self.log.push(msg.into());
    }

    pub fn logs(&self) -> &[String] {
        &self.log
    }

    pub fn clear_logs(&mut self) {
        self.log.clear();
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}
