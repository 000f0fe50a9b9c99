use {
    super::{
        asaas::{AsaasAdapter, AsaasConfig},
        cardwallet::{CardWalletAdapter, CardWalletConfig},
        mock::MockAdapter,
    },
    crate::{
        config::Config,
        domain::{error::PaymentError, gateway::GatewayAdapter, payment::Gateway},
    },
    std::{collections::HashMap, sync::Arc},
};

/// Configured adapters by gateway. A gateway without credentials is simply
/// absent; asking for it is a configuration error, not a panic.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    adapters: HashMap<Gateway, Arc<dyn GatewayAdapter>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn GatewayAdapter>) -> &mut Self {
        self.adapters.insert(adapter.gateway(), adapter);
        self
    }

    pub fn get(&self, gateway: Gateway) -> Result<Arc<dyn GatewayAdapter>, PaymentError> {
        self.adapters
            .get(&gateway)
            .cloned()
            .ok_or(PaymentError::Configuration(gateway))
    }

    pub fn is_configured(&self, gateway: Gateway) -> bool {
        self.adapters.contains_key(&gateway)
    }

    pub fn from_config(config: &Config) -> Result<Self, PaymentError> {
        let mut registry = Self::new();
        let timeout = config.http_timeout;

        if let Some(api_key) = &config.asaas_api_key {
            registry.register(Arc::new(AsaasAdapter::new(
                AsaasConfig {
                    api_key: api_key.clone(),
                    base_url: config.asaas_base_url.clone(),
                },
                timeout,
            )?));
        }
        if let Some(token) = &config.cardwallet_access_token {
            registry.register(Arc::new(CardWalletAdapter::new(
                CardWalletConfig {
                    access_token: token.clone(),
                    base_url: config.cardwallet_base_url.clone(),
                    notification_url: config.cardwallet_notification_url.clone(),
                },
                timeout,
            )?));
        }
        if config.mock_gateway_enabled {
            registry.register(Arc::new(MockAdapter::new()));
        }

        for gateway in [Gateway::Asaas, Gateway::CardWallet, Gateway::Mock] {
            if !registry.is_configured(gateway) {
                tracing::warn!(%gateway, "gateway not configured, requests for it will fail");
            }
        }
        Ok(registry)
    }
}
