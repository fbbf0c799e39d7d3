//! Crop disease detection web app backed by Google Gemini.

pub mod config;
pub mod diagnosis;
pub mod encoder;
pub mod error;
pub mod gemini;
pub mod page;
pub mod render;
pub mod server;

pub use config::Config;
pub use diagnosis::{diagnose, DiagnosisResult, GenerativeModel, Precautions, NO_DISEASE_SENTINEL};
pub use encoder::{encode_image, ImagePayload};
pub use error::{DetectorError, Result};
pub use gemini::GeminiClient;
pub use page::{Page, ViewState};
pub use server::{router, AppState};
