pub mod domain;
pub mod error;
pub mod llm_http;

pub use domain::*;
pub use error::{EngineError, EngineResult};
