//! Lazily-connected, shared media source handle.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use super::{MediaSource, SourceConnector, SourceError};

/// A media source that is connected on first use and shared afterwards.
///
/// Concurrent first callers wait on the same initialization; the connector
/// runs at most once per successful connection. A failed connection is not
/// cached, so a later job may try again.
pub struct LazySource {
    connector: Arc<dyn SourceConnector>,
    handle: OnceCell<Arc<dyn MediaSource>>,
}

impl LazySource {
    pub fn new(connector: Arc<dyn SourceConnector>) -> Self {
        Self {
            connector,
            handle: OnceCell::new(),
        }
    }

    /// Get the shared handle, connecting if this is the first use.
    pub async fn get(&self) -> Result<Arc<dyn MediaSource>, SourceError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let source = self.connector.connect().await?;
                info!("media source connected");
                Ok::<_, SourceError>(source)
            })
            .await?;
        Ok(handle.clone())
    }

    /// Whether a handle has been built yet.
    pub fn is_ready(&self) -> bool {
        self.handle.initialized()
    }
}

impl core::fmt::Debug for LazySource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LazySource")
            .field("ready", &self.is_ready())
            .finish()
    }
}
