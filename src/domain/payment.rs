use {
    super::error::PaymentError,
    super::gateway::PixData,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    derive_more::Display,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    #[display("asaas")]
    Asaas,
    #[display("cardwallet")]
    CardWallet,
    #[display("mock")]
    Mock,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asaas => "asaas",
            Self::CardWallet => "cardwallet",
            Self::Mock => "mock",
        }
    }
}

impl TryFrom<&str> for Gateway {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "asaas" => Ok(Self::Asaas),
            "cardwallet" => Ok(Self::CardWallet),
            "mock" => Ok(Self::Mock),
            other => Err(PaymentError::Validation(format!("unknown gateway: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[display("pix")]
    Pix,
    #[display("credit_card")]
    CreditCard,
    #[display("debit_card")]
    DebitCard,
    #[display("boleto")]
    Boleto,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pix => "pix",
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Boleto => "boleto",
        }
    }

    pub fn is_card(&self) -> bool {
        matches!(self, Self::CreditCard | Self::DebitCard)
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pix" => Ok(Self::Pix),
            "credit_card" => Ok(Self::CreditCard),
            "debit_card" => Ok(Self::DebitCard),
            "boleto" => Ok(Self::Boleto),
            other => Err(PaymentError::Validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[display("pending")]
    Pending,
    #[display("processing")]
    Processing,
    #[display("approved")]
    Approved,
    #[display("rejected")]
    Rejected,
    #[display("refunded")]
    Refunded,
    #[display("cancelled")]
    Cancelled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Approved,
        Self::Rejected,
        Self::Refunded,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }

    /// pending → processing → {approved, rejected, cancelled}, pending may
    /// skip processing, approved → refunded. Everything else is refused,
    /// including same-status (callers treat that as a no-op before asking).
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Approved | Rejected | Cancelled)
                | (Processing, Approved | Rejected | Cancelled)
                | (Approved, Refunded)
        )
    }

    /// Not yet settled by the provider; candidates for a pull sync.
    pub fn is_unsettled(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = PaymentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "refunded" => Ok(Self::Refunded),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(PaymentError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Stored payment record (reads).
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway: Gateway,
    pub payment_method: PaymentMethod,
    pub amount: MoneyAmount,
    pub installments: u32,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub pix_code: Option<String>,
    pub pix_qr_code_base64: Option<String>,
    pub pix_expires_at: Option<DateTime<Utc>>,
    pub webhook_received: bool,
    pub webhook_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pix(&self) -> Option<PixData> {
        self.pix_code.as_ref().map(|code| PixData {
            code: code.clone(),
            qr_code_base64: self.pix_qr_code_base64.clone(),
            expires_at: self.pix_expires_at,
        })
    }
}

pub struct NewPaymentParams {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway: Gateway,
    pub payment_method: PaymentMethod,
    pub amount: MoneyAmount,
    pub installments: u32,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub gateway_payment_id: String,
    pub gateway_transaction_id: Option<String>,
    pub pix: Option<PixData>,
}

/// For INSERT. The id is generated in Rust via Uuid::now_v7() before the
/// provider call so it can double as the provider idempotency key.
#[derive(Debug, Clone)]
pub struct NewPayment {
    id: Uuid,
    order_id: Uuid,
    gateway: Gateway,
    payment_method: PaymentMethod,
    amount: MoneyAmount,
    installments: u32,
    status: PaymentStatus,
    status_detail: Option<String>,
    gateway_payment_id: String,
    gateway_transaction_id: Option<String>,
    pix: Option<PixData>,
}

impl NewPayment {
    pub fn new(p: NewPaymentParams) -> Self {
        Self {
            id: p.id,
            order_id: p.order_id,
            gateway: p.gateway,
            payment_method: p.payment_method,
            amount: p.amount,
            installments: p.installments.max(1),
            status: p.status,
            status_detail: p.status_detail,
            gateway_payment_id: p.gateway_payment_id,
            gateway_transaction_id: p.gateway_transaction_id,
            pix: p.pix,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn gateway(&self) -> Gateway {
        self.gateway
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn installments(&self) -> u32 {
        self.installments
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn status_detail(&self) -> Option<&str> {
        self.status_detail.as_deref()
    }

    pub fn gateway_payment_id(&self) -> &str {
        &self.gateway_payment_id
    }

    pub fn gateway_transaction_id(&self) -> Option<&str> {
        self.gateway_transaction_id.as_deref()
    }

    pub fn pix(&self) -> Option<&PixData> {
        self.pix.as_ref()
    }

    /// The record as it reads back right after insertion.
    pub fn to_payment(&self, at: DateTime<Utc>) -> Payment {
        Payment {
            id: self.id,
            order_id: self.order_id,
            gateway: self.gateway,
            payment_method: self.payment_method,
            amount: self.amount,
            installments: self.installments,
            status: self.status,
            status_detail: self.status_detail.clone(),
            gateway_payment_id: Some(self.gateway_payment_id.clone()),
            gateway_transaction_id: self.gateway_transaction_id.clone(),
            pix_code: self.pix.as_ref().map(|p| p.code.clone()),
            pix_qr_code_base64: self.pix.as_ref().and_then(|p| p.qr_code_base64.clone()),
            pix_expires_at: self.pix.as_ref().and_then(|p| p.expires_at),
            webhook_received: false,
            webhook_data: None,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Fields written by one reconciliation. Applied in a single conditional
/// write keyed by payment id (and the expected prior status).
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    /// `None` keeps the stored value.
    pub gateway_transaction_id: Option<String>,
    /// Sticky: `false` never clears a previous `true`.
    pub webhook_received: bool,
    /// `None` keeps the stored value.
    pub webhook_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Status advanced and post-commit hooks ran.
    Updated {
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    },
    /// Same status as stored, or a concurrent delivery won the write.
    Unchanged(Uuid),
    /// Transition refused by the state machine; logged, not applied.
    Ignored {
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    },
    /// No payment matches the provider identifier.
    NotFound { external_id: String },
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updated { .. } => "updated",
            Self::Unchanged(_) => "unchanged",
            Self::Ignored { .. } => "ignored",
            Self::NotFound { .. } => "not_found",
        }
    }
}
