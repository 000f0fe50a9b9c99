use {
    super::BoxFuture,
    super::id::TaxId,
    super::money::MoneyAmount,
    super::payment::{Gateway, PaymentMethod, PaymentStatus},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixData {
    pub code: String,
    pub qr_code_base64: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub postal_code: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Buyer data as supplied by checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub tax_id: Option<TaxId>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

/// Provider-side customer reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRef {
    pub id: String,
    /// `false` when an existing customer was found by tax id.
    pub created: bool,
}

/// Card data passed through to the provider untouched. Either a provider
/// token or raw fields, depending on what the provider accepts.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CardData {
    pub token: Option<String>,
    pub brand: Option<String>,
    pub issuer_id: Option<String>,
    pub holder_name: Option<String>,
    pub number: Option<String>,
    pub expiry_month: Option<String>,
    pub expiry_year: Option<String>,
    pub cvv: Option<String>,
}

impl fmt::Debug for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = self
            .number
            .as_deref()
            .map(|n| n.chars().skip(n.chars().count().saturating_sub(4)).collect::<String>());
        f.debug_struct("CardData")
            .field("brand", &self.brand)
            .field("has_token", &self.token.is_some())
            .field("last4", &last4)
            .finish_non_exhaustive()
    }
}

/// Everything an adapter needs to open one charge.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    /// Internal payment id, reserved before the call; used as idempotency key.
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub amount: MoneyAmount,
    pub installments: u32,
    pub description: String,
    pub customer: CustomerInfo,
    pub customer_ref: Option<CustomerRef>,
    pub card: Option<CardData>,
    pub remote_ip: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// Provider response reduced to what the core stores.
#[derive(Debug, Clone)]
pub struct NormalizedPayment {
    pub gateway_payment_id: String,
    pub gateway_transaction_id: Option<String>,
    /// Method the charge actually carries; differs from the requested one
    /// after the boleto fallback.
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub provider_status: String,
    pub pix: Option<PixData>,
    pub raw: serde_json::Value,
}

pub trait GatewayAdapter: Send + Sync {
    fn gateway(&self) -> Gateway;

    fn create<'a>(&'a self, request: &'a ChargeRequest) -> BoxFuture<'a, NormalizedPayment>;

    fn fetch<'a>(&'a self, gateway_payment_id: &'a str) -> BoxFuture<'a, NormalizedPayment>;

    fn fetch_pix_qr<'a>(&'a self, gateway_payment_id: &'a str) -> BoxFuture<'a, PixData>;

    fn refund<'a>(
        &'a self,
        gateway_payment_id: &'a str,
        amount: Option<MoneyAmount>,
    ) -> BoxFuture<'a, ()>;

    /// Providers that bill against their own customer records expose a
    /// resolver; checkout runs it before `create`.
    fn customer_resolver(&self) -> Option<&dyn CustomerResolver> {
        None
    }
}

pub trait CustomerResolver: Send + Sync {
    fn resolve<'a>(&'a self, customer: &'a CustomerInfo) -> BoxFuture<'a, CustomerRef>;
}
