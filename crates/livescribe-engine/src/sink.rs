use livescribe_core::TranscriptEvent;
use tokio::sync::mpsc;

/// Receives transcript events in emission order.
///
/// The engine calls `emit` only from its single worker thread, so an
/// implementation never sees two calls at once. Delivery to whatever thread
/// the consumer lives on is the sink's business.
pub trait ResultSink: Send + Sync {
    fn emit(&self, event: TranscriptEvent);
}

impl<F> ResultSink for F
where
    F: Fn(TranscriptEvent) + Send + Sync,
{
    fn emit(&self, event: TranscriptEvent) {
        self(event)
    }
}

/// Forwards events into a tokio channel, typically drained by a
/// `DestinationHost` task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TranscriptEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<TranscriptEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TranscriptEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ResultSink for ChannelSink {
    fn emit(&self, event: TranscriptEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("result receiver dropped, discarding event");
        }
    }
}
