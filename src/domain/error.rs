use {super::payment::Gateway, thiserror::Error};

#[derive(Debug, Error)]
pub enum PaymentError {
    /// Provider credentials are missing; the gateway is not usable at all.
    #[error("gateway {0} is not configured")]
    Configuration(Gateway),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("validation: {0}")]
    Validation(String),

    /// `message` is already normalized from the provider's error body.
    #[error("{gateway} rejected the request ({status}): {message}")]
    Provider {
        gateway: Gateway,
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("collaborator: {0}")]
    Collaborator(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("webhook auth: {0}")]
    WebhookAuth(String),
}

impl PaymentError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}
