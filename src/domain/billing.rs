use {
    super::money::MoneyAmount,
    super::payment::PaymentMethod,
    chrono::{DateTime, Duration, FixedOffset, Utc},
};

pub const PIX_EXPIRY_MINUTES: i64 = 5;
pub const BOLETO_EXPIRY_DAYS: i64 = 3;

/// Provider-side due instant. Drives expiration on the provider, so the
/// offsets are part of the contract: PIX +5 min, boleto (or unknown) +3 days,
/// cards today.
pub fn due_at(method: Option<PaymentMethod>, now: DateTime<Utc>) -> DateTime<Utc> {
    match method {
        Some(PaymentMethod::Pix) => now + Duration::minutes(PIX_EXPIRY_MINUTES),
        Some(PaymentMethod::CreditCard | PaymentMethod::DebitCard) => now,
        Some(PaymentMethod::Boleto) | None => now + Duration::days(BOLETO_EXPIRY_DAYS),
    }
}

/// `YYYY-MM-DD` in provider-local time (UTC-3) for providers that only
/// take a date.
pub fn due_date(method: Option<PaymentMethod>, now: DateTime<Utc>) -> String {
    let due = due_at(method, now);
    match FixedOffset::west_opt(3 * 3600) {
        Some(brt) => due.with_timezone(&brt).format("%Y-%m-%d").to_string(),
        None => due.format("%Y-%m-%d").to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentPlan {
    pub count: u32,
    pub value: MoneyAmount,
}

/// `None` at 1×: no installment fields are sent for a single installment.
pub fn installment_plan(amount: MoneyAmount, installments: u32) -> Option<InstallmentPlan> {
    if installments <= 1 {
        return None;
    }
    amount.split(installments).map(|value| InstallmentPlan {
        count: installments,
        value,
    })
}
