use {
    crate::adapters::http::ProviderHttp,
    crate::domain::{
        BoxFuture,
        error::PaymentError,
        extract,
        gateway::{CustomerInfo, CustomerRef, CustomerResolver},
        id::TaxId,
        payment::Gateway,
    },
    serde_json::{Value, json},
    std::sync::Arc,
};

/// Find-or-create of Asaas customers keyed by CPF/CNPJ.
///
/// No caching and no field diffing: an existing customer is reused as is.
/// Two concurrent checkouts for a new buyer can both miss the search and
/// create duplicates; the provider tolerates that.
pub struct AsaasCustomerResolver {
    http: Arc<ProviderHttp>,
}

impl AsaasCustomerResolver {
    pub fn new(http: Arc<ProviderHttp>) -> Self {
        Self { http }
    }

    pub async fn resolve_customer(&self, info: &CustomerInfo) -> Result<CustomerRef, PaymentError> {
        let tax_id = info.tax_id.as_ref().ok_or_else(|| {
            PaymentError::precondition("CPF/CNPJ is required to register an asaas customer")
        })?;

        if let Some(id) = self.find_by_tax_id(tax_id).await? {
            tracing::debug!(customer_id = %id, "asaas customer found");
            return Ok(CustomerRef { id, created: false });
        }

        let created = self
            .http
            .post("/customers", &customer_body(info, tax_id), &[])
            .await?;
        let id = extract::object_id(&created).ok_or_else(|| PaymentError::Provider {
            gateway: Gateway::Asaas,
            status: 200,
            message: "customer response without id".into(),
            code: None,
        })?;
        tracing::info!(customer_id = %id, "asaas customer created");
        Ok(CustomerRef { id, created: true })
    }

    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<String>, PaymentError> {
        let found = self
            .http
            .get_query("/customers", &[("cpfCnpj", tax_id.as_str())])
            .await?;
        Ok(found
            .get("data")
            .and_then(Value::as_array)
            .and_then(|data| data.iter().find_map(extract::object_id)))
    }
}

impl CustomerResolver for AsaasCustomerResolver {
    fn resolve<'a>(&'a self, customer: &'a CustomerInfo) -> BoxFuture<'a, CustomerRef> {
        Box::pin(self.resolve_customer(customer))
    }
}

fn customer_body(info: &CustomerInfo, tax_id: &TaxId) -> Value {
    let address = info.address.clone().unwrap_or_default();
    json!({
        "name": info.name,
        "cpfCnpj": tax_id.as_str(),
        "email": info.email,
        "mobilePhone": info.phone,
        "postalCode": address.postal_code,
        "address": address.street,
        "addressNumber": address.number,
        "complement": address.complement,
        "province": address.district,
        "notificationDisabled": true,
    })
}
