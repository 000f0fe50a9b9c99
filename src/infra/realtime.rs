use {
    crate::domain::{BoxFuture, collaborators::RealtimePublisher},
    serde::Serialize,
    tokio::sync::broadcast,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeMessage {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// In-process fan-out. Whatever pushes to browsers subscribes here; with
/// nobody listening, messages are dropped.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<RealtimeMessage>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.tx.subscribe()
    }
}

impl RealtimePublisher for BroadcastPublisher {
    fn publish<'a>(
        &'a self,
        channel: &'a str,
        event: &'a str,
        payload: &'a serde_json::Value,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let message = RealtimeMessage {
                channel: channel.to_string(),
                event: event.to_string(),
                payload: payload.clone(),
            };
            if let Err(e) = self.tx.send(message) {
                tracing::debug!(channel, event, "no realtime subscribers: {e}");
            }
            Ok(())
        })
    }
}
