use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("GEMINI_API_KEY is not set (add it to the environment or a .env file)")]
    MissingApiKey,

    #[error("request to the generation endpoint failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("no text in the model response")]
    EmptyResponse,

    #[error("reply is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("reply is JSON but not an object")]
    NotAnObject,

    #[error("detection task failed: {0}")]
    Task(String),

    #[error("no image was uploaded")]
    NoImage,
}

pub type Result<T> = std::result::Result<T, DetectorError>;
