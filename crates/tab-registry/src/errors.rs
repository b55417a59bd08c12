use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unexpected message for {handler} handler: {got}")]
    UnexpectedMessage {
        handler: &'static str,
        got: &'static str,
    },
}

impl RegistryError {
    pub fn into_serp_error(self) -> serpwatch_core_types::SerpError {
        serpwatch_core_types::SerpError::new(self.to_string())
    }
}
