use crate::dest_trait::Destination;
use crate::registry::DestinationRegistry;
use livescribe_core::{DestinationError, TextMetadata, TranscriptEvent};
use tokio::sync::mpsc;

struct Route {
    destination: Box<dyn Destination>,
    prefix: String,
}

/// Delivers transcript events to every configured destination from one task,
/// so destinations observe each cycle's partials and final in order.
pub struct DestinationHost {
    registry: DestinationRegistry,
    routes: Vec<Route>,
    event_rx: Option<mpsc::UnboundedReceiver<TranscriptEvent>>,
    task_handle: Option<tokio::task::JoinHandle<usize>>,
}

impl DestinationHost {
    pub fn new(event_rx: mpsc::UnboundedReceiver<TranscriptEvent>) -> Self {
        Self::with_registry(event_rx, DestinationRegistry::new())
    }

    pub fn with_registry(
        event_rx: mpsc::UnboundedReceiver<TranscriptEvent>,
        registry: DestinationRegistry,
    ) -> Self {
        Self {
            registry,
            routes: Vec::new(),
            event_rx: Some(event_rx),
            task_handle: None,
        }
    }

    pub async fn add_route(
        &mut self,
        plugin_name: &str,
        prefix: &str,
        config: toml::Value,
    ) -> Result<(), DestinationError> {
        let mut dest = self.registry.create(plugin_name)?;
        dest.initialize(config).await?;
        tracing::info!(
            destination = plugin_name,
            partials = dest.accepts_partials(),
            "route added"
        );

        self.routes.push(Route {
            destination: dest,
            prefix: prefix.to_string(),
        });
        Ok(())
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Spawn the delivery task. It runs until every sender is dropped.
    pub fn start(&mut self) {
        let Some(mut rx) = self.event_rx.take() else {
            tracing::warn!("DestinationHost already started");
            return;
        };
        let routes = std::mem::take(&mut self.routes);

        let handle = tokio::spawn(async move {
            let mut delivered = 0usize;
            while let Some(event) = rx.recv().await {
                for route in &routes {
                    if !event.is_final && !route.destination.accepts_partials() {
                        continue;
                    }
                    let metadata = TextMetadata {
                        prefix: route.prefix.clone(),
                    };
                    match route.destination.send_event(&event, &metadata).await {
                        Ok(()) => delivered += 1,
                        Err(e) => tracing::error!(
                            cycle = event.cycle,
                            destination = %route.destination.name(),
                            "send_event failed: {e}"
                        ),
                    }
                }
            }

            for route in &routes {
                if let Err(e) = route.destination.shutdown().await {
                    tracing::warn!(destination = %route.destination.name(), "shutdown failed: {e}");
                }
            }
            delivered
        });

        self.task_handle = Some(handle);
    }

    /// Wait for the delivery task to drain and exit. Returns the number of
    /// successful deliveries.
    pub async fn shutdown(&mut self) -> usize {
        match self.task_handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                tracing::error!("destination task failed: {e}");
                0
            }),
            None => 0,
        }
    }
}
