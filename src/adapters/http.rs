use {
    crate::domain::{error::PaymentError, extract, payment::Gateway},
    reqwest::{Method, RequestBuilder},
    serde_json::Value,
    std::time::Duration,
};

#[derive(Clone)]
pub enum ProviderAuth {
    /// Static key in a named header (`access_token: <key>`).
    Header { name: &'static str, value: String },
    Bearer(String),
}

/// JSON-over-HTTPS client for one provider. Every call is bounded by the
/// client timeout; non-2xx bodies are normalized into `PaymentError::Provider`.
pub struct ProviderHttp {
    gateway: Gateway,
    base_url: String,
    auth: ProviderAuth,
    client: reqwest::Client,
}

impl ProviderHttp {
    pub fn new(
        gateway: Gateway,
        base_url: impl Into<String>,
        auth: ProviderAuth,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("paygate_sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            gateway,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            client,
        })
    }

    pub fn gateway(&self) -> Gateway {
        self.gateway
    }

    pub async fn get(&self, path: &str) -> Result<Value, PaymentError> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn get_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, PaymentError> {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        headers: &[(&str, String)],
    ) -> Result<Value, PaymentError> {
        let mut req = self.request(Method::POST, path).json(body);
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        self.send(req).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.client.request(method, url);
        match &self.auth {
            ProviderAuth::Header { name, value } => req.header(*name, value),
            ProviderAuth::Bearer(token) => req.bearer_auth(token),
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, PaymentError> {
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(gateway = %self.gateway, timeout = e.is_timeout(), error = %e, "provider call failed");
            PaymentError::Transport(e)
        })?;

        let status = resp.status();
        let text = resp.text().await?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        // Raw bodies stay in the logs; callers only ever see the normalized message.
        tracing::debug!(gateway = %self.gateway, status = status.as_u16(), body = %text, "provider error body");
        let (message, code) = match serde_json::from_str::<Value>(&text) {
            Ok(body) => extract::provider_error(&body),
            Err(_) => (format!("HTTP {}", status.as_u16()), None),
        };
        tracing::warn!(
            gateway = %self.gateway,
            status = status.as_u16(),
            code = code.as_deref().unwrap_or(""),
            "provider rejected request: {message}"
        );
        Err(PaymentError::Provider {
            gateway: self.gateway,
            status: status.as_u16(),
            message,
            code,
        })
    }
}
