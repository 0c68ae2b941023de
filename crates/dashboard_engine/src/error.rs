use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Object credit {ok_nr} references unknown account {account_id}")]
    UnknownAccount { ok_nr: String, account_id: String },

    #[error("Invalid value '{value}' for parameter {param}")]
    InvalidParameter { param: String, value: String },

    #[error("View storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn invalid(param: &str, value: &str) -> Self {
        EngineError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
        }
    }
}
