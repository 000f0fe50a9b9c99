//! Field extraction from provider JSON.
//!
//! Providers disagree (and sometimes change their minds) about which key
//! carries a value. Each field has one fixed, ordered list of named
//! extractors; the first non-empty hit wins. The lists are the complete set
//! of shapes seen from Asaas (`payments`, `pixQrCode`, webhook bodies) and
//! the card/wallet API (`point_of_interaction.transaction_data`).

use {
    chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc},
    serde_json::Value,
};

pub type Extractor = fn(&Value) -> Option<String>;

pub struct NamedExtractor {
    pub name: &'static str,
    pub extract: Extractor,
}

/// PIX copy-and-paste payload.
pub const PIX_CODE: &[NamedExtractor] = &[
    NamedExtractor { name: "payload", extract: |v| text_at(v, &["payload"]) },
    NamedExtractor { name: "pixCopiaECola", extract: |v| text_at(v, &["pixCopiaECola"]) },
    NamedExtractor { name: "pix_code", extract: |v| text_at(v, &["pix_code"]) },
    NamedExtractor { name: "qrCode.payload", extract: |v| text_at(v, &["qrCode", "payload"]) },
    NamedExtractor {
        name: "point_of_interaction.transaction_data.qr_code",
        extract: |v| text_at(v, &["point_of_interaction", "transaction_data", "qr_code"]),
    },
];

/// Base64 PNG of the QR code.
pub const PIX_QR_IMAGE: &[NamedExtractor] = &[
    NamedExtractor { name: "encodedImage", extract: |v| text_at(v, &["encodedImage"]) },
    NamedExtractor { name: "qrCodeBase64", extract: |v| text_at(v, &["qrCodeBase64"]) },
    NamedExtractor { name: "pix_qr_code_base64", extract: |v| text_at(v, &["pix_qr_code_base64"]) },
    NamedExtractor {
        name: "qrCode.encodedImage",
        extract: |v| text_at(v, &["qrCode", "encodedImage"]),
    },
    NamedExtractor {
        name: "point_of_interaction.transaction_data.qr_code_base64",
        extract: |v| text_at(v, &["point_of_interaction", "transaction_data", "qr_code_base64"]),
    },
];

pub const PIX_EXPIRATION: &[NamedExtractor] = &[
    NamedExtractor { name: "expirationDate", extract: |v| text_at(v, &["expirationDate"]) },
    NamedExtractor { name: "date_of_expiration", extract: |v| text_at(v, &["date_of_expiration"]) },
    NamedExtractor {
        name: "qrCode.expirationDate",
        extract: |v| text_at(v, &["qrCode", "expirationDate"]),
    },
];

pub const TRANSACTION_ID: &[NamedExtractor] = &[
    NamedExtractor { name: "transactionId", extract: |v| id_at(v, &["transactionId"]) },
    NamedExtractor { name: "transaction_id", extract: |v| id_at(v, &["transaction_id"]) },
    NamedExtractor { name: "authorization_code", extract: |v| id_at(v, &["authorization_code"]) },
    NamedExtractor { name: "nossoNumero", extract: |v| id_at(v, &["nossoNumero"]) },
];

pub fn first_match(extractors: &[NamedExtractor], value: &Value) -> Option<String> {
    extractors.iter().find_map(|e| {
        let hit = (e.extract)(value);
        if hit.is_some() {
            tracing::trace!(field = e.name, "extractor matched");
        }
        hit
    })
}

pub fn pix_code(value: &Value) -> Option<String> {
    first_match(PIX_CODE, value)
}

pub fn pix_qr_image(value: &Value) -> Option<String> {
    first_match(PIX_QR_IMAGE, value)
}

pub fn pix_expiration(value: &Value) -> Option<DateTime<Utc>> {
    first_match(PIX_EXPIRATION, value).and_then(|s| parse_timestamp(&s))
}

pub fn transaction_id(value: &Value) -> Option<String> {
    first_match(TRANSACTION_ID, value)
}

/// Webhook bodies arrive as `{event, payment}`, `{action, payment}`, or as
/// the payment object itself. The card/wallet provider's notification form
/// `{id, action, data: {id}}` is accepted too; its top-level id names the
/// notification, not the payment, and it never carries a status.
pub fn payment_object(payload: &Value) -> &Value {
    if let Some(p) = payload.get("payment").filter(|p| p.is_object()) {
        return p;
    }
    match payload.get("data") {
        Some(d) if d.is_object() && payload.get("status").is_none() => d,
        _ => payload,
    }
}

pub fn object_id(object: &Value) -> Option<String> {
    id_at(object, &["id"])
}

pub fn object_status(object: &Value) -> Option<String> {
    text_at(object, &["status"])
}

/// Provider error bodies: `{"errors": [{"code", "description"|"message"}]}`
/// or a single `{"message"}` / `{"error"}`. Returns the joined message and
/// the first error code.
pub fn provider_error(body: &Value) -> (String, Option<String>) {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        let messages: Vec<String> = errors
            .iter()
            .filter_map(|e| text_at(e, &["description"]).or_else(|| text_at(e, &["message"])))
            .collect();
        let code = errors.iter().find_map(|e| text_at(e, &["code"]));
        if !messages.is_empty() {
            return (messages.join("; "), code);
        }
    }

    let code = text_at(body, &["code"]).or_else(|| text_at(body, &["error"]));
    let message = text_at(body, &["message"])
        .or_else(|| text_at(body, &["error"]))
        .unwrap_or_else(|| "provider returned an error without a message".to_string());
    (message, code)
}

/// RFC 3339, or provider-local (UTC-3) `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DD`.
/// A bare date means end of that day.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let brt = FixedOffset::west_opt(3 * 3600)?;
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return brt.from_local_datetime(&naive).single().map(|d| d.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let naive = date.and_hms_opt(23, 59, 59)?;
        return brt.from_local_datetime(&naive).single().map(|d| d.with_timezone(&Utc));
    }
    None
}

fn at<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    at(value, path)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Ids come as strings from one provider and as numbers from the other.
fn id_at(value: &Value, path: &[&str]) -> Option<String> {
    match at(value, path)? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
