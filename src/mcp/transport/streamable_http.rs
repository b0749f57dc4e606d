use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, ServiceExt};
use rmcp::transport::common::client_side_sse::FixedInterval;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use tracing::debug;

use super::{MCPRunningService, MCPTransport};
use crate::config::DEFAULT_RECONNECT_INTERVAL;

/// HTTP transport with a server-push event stream (for remote MCP servers).
///
/// When the event stream drops, rmcp re-opens it after a fixed interval.
pub struct StreamableHttpTransport {
    url: String,
    reconnect_interval: Duration,
    max_reconnects: Option<usize>,
}

impl StreamableHttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnects: None,
        }
    }

    /// Delay between stream reconnection attempts.
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Cap reconnection attempts. Unlimited by default.
    pub fn max_reconnects(mut self, attempts: usize) -> Self {
        self.max_reconnects = Some(attempts);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_config(&self) -> StreamableHttpClientTransportConfig {
        let mut config = StreamableHttpClientTransportConfig::with_uri(self.url.as_str());
        config.retry_config = Arc::new(FixedInterval {
            max_times: self.max_reconnects,
            duration: self.reconnect_interval,
        });
        config
    }
}

#[async_trait]
impl MCPTransport for StreamableHttpTransport {
    async fn connect(
        &mut self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError> {
        debug!(
            url = self.url.as_str(),
            reconnect_secs = self.reconnect_interval.as_secs(),
            "opening MCP HTTP stream"
        );
        let transport = StreamableHttpClientTransport::from_config(self.transport_config());
        client_info.into_dyn().serve(transport).await
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
