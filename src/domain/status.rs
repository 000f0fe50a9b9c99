//! Provider status vocabulary → canonical [`PaymentStatus`].
//!
//! Total by construction: unrecognized strings map to `Pending` and keep the
//! raw string as detail, so an unknown status can never advance a payment.

use super::payment::{Gateway, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedStatus {
    pub status: PaymentStatus,
    /// Raw provider string, preserved for `status_detail`.
    pub detail: String,
    pub recognized: bool,
}

pub fn map_status(gateway: Gateway, raw: &str) -> MappedStatus {
    let trimmed = raw.trim();
    let known = match gateway {
        Gateway::Asaas => asaas_status(trimmed),
        Gateway::CardWallet => cardwallet_status(trimmed),
        Gateway::Mock => PaymentStatus::try_from(trimmed.to_ascii_lowercase().as_str()).ok(),
    };

    match known {
        Some(status) => MappedStatus {
            status,
            detail: trimmed.to_string(),
            recognized: true,
        },
        None => {
            tracing::warn!(%gateway, raw = %trimmed, "unknown provider status, defaulting to pending");
            MappedStatus {
                status: PaymentStatus::Pending,
                detail: trimmed.to_string(),
                recognized: false,
            }
        }
    }
}

fn asaas_status(raw: &str) -> Option<PaymentStatus> {
    use PaymentStatus::*;
    let status = match raw.to_ascii_uppercase().as_str() {
        "PENDING" => Pending,
        "AWAITING_RISK_ANALYSIS" => Processing,
        "CONFIRMED" | "RECEIVED" | "RECEIVED_IN_CASH" | "DUNNING_RECEIVED" => Approved,
        // money is still captured until the refund settles
        "REFUND_REQUESTED" | "REFUND_IN_PROGRESS" => Approved,
        "REFUNDED" | "CHARGEBACK_REQUESTED" | "CHARGEBACK_DISPUTE"
        | "AWAITING_CHARGEBACK_REVERSAL" => Refunded,
        "OVERDUE" | "DELETED" | "DUNNING_REQUESTED" => Cancelled,
        "REPROVED_BY_RISK_ANALYSIS" => Rejected,
        _ => return None,
    };
    Some(status)
}

fn cardwallet_status(raw: &str) -> Option<PaymentStatus> {
    use PaymentStatus::*;
    let status = match raw.to_ascii_lowercase().as_str() {
        "pending" => Pending,
        "in_process" | "authorized" | "in_mediation" => Processing,
        "approved" => Approved,
        "rejected" => Rejected,
        "cancelled" => Cancelled,
        "refunded" | "charged_back" => Refunded,
        _ => return None,
    };
    Some(status)
}

/// Every status string each provider is documented to send.
pub fn known_statuses(gateway: Gateway) -> &'static [&'static str] {
    match gateway {
        Gateway::Asaas => &[
            "PENDING",
            "AWAITING_RISK_ANALYSIS",
            "CONFIRMED",
            "RECEIVED",
            "RECEIVED_IN_CASH",
            "DUNNING_RECEIVED",
            "REFUND_REQUESTED",
            "REFUND_IN_PROGRESS",
            "REFUNDED",
            "CHARGEBACK_REQUESTED",
            "CHARGEBACK_DISPUTE",
            "AWAITING_CHARGEBACK_REVERSAL",
            "OVERDUE",
            "DELETED",
            "DUNNING_REQUESTED",
            "REPROVED_BY_RISK_ANALYSIS",
        ],
        Gateway::CardWallet => &[
            "pending",
            "in_process",
            "authorized",
            "in_mediation",
            "approved",
            "rejected",
            "cancelled",
            "refunded",
            "charged_back",
        ],
        Gateway::Mock => &[
            "pending",
            "processing",
            "approved",
            "rejected",
            "refunded",
            "cancelled",
        ],
    }
}
