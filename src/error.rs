#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP request, {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Could not read file: {0}")]
    IO(#[from] std::io::Error),

    #[error("Could not parse YAML in config file: {0}")]
    SerdeYml(#[from] serde_yml::Error),

    #[error("Could not parse JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Protocol scheme missing from base URL, expected http:// or https://: [{0}]")]
    ProtocolSchemeMissing(String),

    #[error("File path is invalid: [{0}]")]
    InvalidFilePath(String),

    #[error("GOOGLE_API_KEY not found. Copy .env.example to .env and add the key for local development, or set GOOGLE_API_KEY as an environment variable on the deploy host.")]
    ApiKeyMissing,

    #[error("The form relay rejected the submission")]
    FormRejected,

    #[error("Map library not ready after {0} attempts")]
    MapNotReady(u32),

    #[error("Map event is missing required fields: [{0}]")]
    InvalidMapEvent(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
