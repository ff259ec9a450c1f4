
use tokio::sync::{mpsc, oneshot};

use crate::{CelebrationEvent, Error, Result, FALLBACK_OPERATOR_NAME};

/// One-way messages from the composer side to the celebration side.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceMessage {
    NewEvent(CelebrationEvent),
    Dismiss,
}

/// Fire-and-forget delivery to a local surface.
///
/// `send` fails with `TransportDropped` when nobody is listening; callers
/// treat that as expected and move on.
pub trait TriggerSink: Send + Sync {
    fn send(&self, message: SurfaceMessage) -> Result<()>;
}

pub type SurfaceReceiver = mpsc::UnboundedReceiver<SurfaceMessage>;

/// Channel-backed sink; the receiving surface owns the other end.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<SurfaceMessage>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<SurfaceMessage>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, SurfaceReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl TriggerSink for ChannelTransport {
    fn send(&self, message: SurfaceMessage) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::TransportDropped)
    }
}

/// Send and swallow a drop. Returns whether anything received the message.
pub fn fire(sink: &dyn TriggerSink, message: SurfaceMessage) -> bool {
    match sink.send(message) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "trigger dropped");
            false
        }
    }
}

/// The local operator's display name: the OS user name, or a neutral fallback.
pub fn operator_name() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_OPERATOR_NAME.to_string())
}

type NameRequest = oneshot::Sender<String>;

/// Request side of the operator-name call.
#[derive(Clone)]
pub struct NameClient {
    tx: mpsc::UnboundedSender<NameRequest>,
}

impl NameClient {
    /// Ask the serving side for the operator name. Falls back locally when
    /// the service is gone.
    pub async fn operator_name(&self) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(reply_tx).is_err() {
            return FALLBACK_OPERATOR_NAME.to_string();
        }
        reply_rx
            .await
            .unwrap_or_else(|_| FALLBACK_OPERATOR_NAME.to_string())
    }
}

/// Spawn the serving side of the operator-name call, answering with `name`.
pub fn serve_operator_name(name: String) -> NameClient {
    let (tx, mut rx) = mpsc::unbounded_channel::<NameRequest>();
    tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            let _ = reply.send(name.clone());
        }
    });
    NameClient { tx }
}
