use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Instance not found: {name} (id: {id})")]
    NotFound { name: String, id: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Registry responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed registry message: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}
