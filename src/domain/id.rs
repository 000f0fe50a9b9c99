use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::PaymentError;

/// Brazilian tax id, CPF (11 digits) or CNPJ (14 digits), stored digits-only.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

impl TaxId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PaymentError> {
        let raw = raw.as_ref();
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let stray = raw
            .chars()
            .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ' ')));
        if stray || !(digits.len() == 11 || digits.len() == 14) {
            return Err(PaymentError::Validation(format!(
                "tax id must be a CPF (11 digits) or CNPJ (14 digits), got: {raw}"
            )));
        }
        Ok(Self(digits))
    }

    pub fn is_cnpj(&self) -> bool {
        self.0.len() == 14
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaxId {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaxId> for String {
    fn from(value: TaxId) -> Self {
        value.0
    }
}
