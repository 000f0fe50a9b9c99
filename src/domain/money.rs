use {
    super::error::PaymentError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Amount in BRL centavos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, PaymentError> {
        if cents < 0 {
            return Err(PaymentError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    /// Providers speak in decimal reais (`100.5` == R$ 100,50).
    pub fn from_decimal(value: f64) -> Result<Self, PaymentError> {
        if !value.is_finite() {
            return Err(PaymentError::Validation(format!(
                "amount is not a finite number: {value}"
            )));
        }
        Self::new((value * 100.0).round() as i64)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `round(self / parts, 2)` with half-away-from-zero rounding on the
    /// centavo. `parts * result` may miss `self` by up to half a centavo
    /// per part.
    pub fn split(&self, parts: u32) -> Option<MoneyAmount> {
        if parts == 0 {
            return None;
        }
        let parts = i64::from(parts);
        Some(MoneyAmount((self.0 * 2 + parts) / (parts * 2)))
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
