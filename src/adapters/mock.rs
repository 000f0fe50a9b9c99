use {
    crate::domain::{
        BoxFuture,
        billing::due_at,
        error::PaymentError,
        gateway::{ChargeRequest, GatewayAdapter, NormalizedPayment, PixData},
        money::MoneyAmount,
        payment::{Gateway, PaymentMethod, PaymentStatus},
        status::map_status,
    },
    serde_json::{Value, json},
    std::{collections::HashMap, sync::Mutex},
    uuid::Uuid,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Create { payment_id: Uuid, method: PaymentMethod },
    Fetch(String),
    FetchPixQr(String),
    Refund { gateway_payment_id: String, amount: Option<MoneyAmount> },
}

#[derive(Debug, Clone)]
struct MockCharge {
    method: PaymentMethod,
    status: PaymentStatus,
    pix: Option<PixData>,
}

#[derive(Default)]
struct MockState {
    charges: HashMap<String, MockCharge>,
    calls: Vec<MockCall>,
    fail_next: Option<String>,
}

/// In-process provider. Charges live in memory and only change when a test
/// says so through [`MockAdapter::set_status`].
#[derive(Default)]
pub struct MockAdapter {
    state: Mutex<MockState>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status the next `fetch` reports for this charge.
    pub fn set_status(&self, gateway_payment_id: &str, status: PaymentStatus) {
        let mut state = self.lock();
        if let Some(charge) = state.charges.get_mut(gateway_payment_id) {
            charge.status = status;
        } else {
            state.charges.insert(
                gateway_payment_id.to_string(),
                MockCharge {
                    method: PaymentMethod::Pix,
                    status,
                    pix: None,
                },
            );
        }
    }

    /// The next call of any kind fails with a provider error carrying `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, call: MockCall) -> Result<(), PaymentError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(message) => Err(PaymentError::Provider {
                gateway: Gateway::Mock,
                status: 400,
                message,
                code: None,
            }),
            None => Ok(()),
        }
    }

    fn create_sync(&self, req: &ChargeRequest) -> Result<NormalizedPayment, PaymentError> {
        self.begin(MockCall::Create {
            payment_id: req.payment_id,
            method: req.method,
        })?;

        let gateway_payment_id = format!("mock_pay_{}", Uuid::now_v7().simple());
        let status = if req.method.is_card() {
            PaymentStatus::Processing
        } else {
            PaymentStatus::Pending
        };
        let pix = (req.method == PaymentMethod::Pix).then(|| PixData {
            code: format!("00020126MOCKPIX{}", req.payment_id.simple()),
            qr_code_base64: None,
            expires_at: Some(due_at(Some(PaymentMethod::Pix), req.requested_at)),
        });

        let charge = MockCharge {
            method: req.method,
            status,
            pix,
        };
        let normalized = normalize(&gateway_payment_id, &charge);
        self.lock().charges.insert(gateway_payment_id, charge);
        Ok(normalized)
    }

    fn charge(&self, gateway_payment_id: &str) -> Result<MockCharge, PaymentError> {
        self.lock()
            .charges
            .get(gateway_payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found(format!("mock charge {gateway_payment_id}")))
    }
}

impl GatewayAdapter for MockAdapter {
    fn gateway(&self) -> Gateway {
        Gateway::Mock
    }

    fn create<'a>(&'a self, request: &'a ChargeRequest) -> BoxFuture<'a, NormalizedPayment> {
        Box::pin(async move { self.create_sync(request) })
    }

    fn fetch<'a>(&'a self, gateway_payment_id: &'a str) -> BoxFuture<'a, NormalizedPayment> {
        Box::pin(async move {
            self.begin(MockCall::Fetch(gateway_payment_id.to_string()))?;
            let charge = self.charge(gateway_payment_id)?;
            Ok(normalize(gateway_payment_id, &charge))
        })
    }

    fn fetch_pix_qr<'a>(&'a self, gateway_payment_id: &'a str) -> BoxFuture<'a, PixData> {
        Box::pin(async move {
            self.begin(MockCall::FetchPixQr(gateway_payment_id.to_string()))?;
            self.charge(gateway_payment_id)?.pix.ok_or_else(|| {
                PaymentError::not_found(format!("no pix code for mock charge {gateway_payment_id}"))
            })
        })
    }

    fn refund<'a>(
        &'a self,
        gateway_payment_id: &'a str,
        amount: Option<MoneyAmount>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.begin(MockCall::Refund {
                gateway_payment_id: gateway_payment_id.to_string(),
                amount,
            })?;
            let mut state = self.lock();
            if let Some(charge) = state.charges.get_mut(gateway_payment_id) {
                charge.status = PaymentStatus::Refunded;
            }
            Ok(())
        })
    }
}

fn normalize(gateway_payment_id: &str, charge: &MockCharge) -> NormalizedPayment {
    let mapped = map_status(Gateway::Mock, charge.status.as_str());
    let raw: Value = json!({
        "id": gateway_payment_id,
        "status": charge.status.as_str(),
        "method": charge.method.as_str(),
        "pix_code": charge.pix.as_ref().map(|p| p.code.clone()),
    });
    NormalizedPayment {
        gateway_payment_id: gateway_payment_id.to_string(),
        gateway_transaction_id: None,
        payment_method: charge.method,
        status: mapped.status,
        status_detail: Some(mapped.detail),
        provider_status: charge.status.as_str().to_string(),
        pix: charge.pix.clone(),
        raw,
    }
}
