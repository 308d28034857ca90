//! WebSocket connector.
//!
//! Drives the real coordination link over a WebSocket, bridged to the sync
//! channel world on a private runtime. The connector resolves the connect
//! attempt synchronously; after that the reader/writer tasks own the
//! socket until the connection is dropped.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::connection::ChannelConfig;
use crate::connector::{Connector, LinkEvent, WireConnection};
use crate::error::TransportError;
use crate::TransportResult;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector over `tokio-tungstenite`.
///
/// Imposes no reconnect or timeout policy of its own; a failed connect is
/// reported once and retrying is the caller's decision.
#[derive(Debug, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn open(&mut self, config: &ChannelConfig) -> TransportResult<WireConnection> {
        let endpoint = config.endpoint_url();
        let url =
            Url::parse(&endpoint).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if url.host_str().is_none() {
            return Err(TransportError::InvalidUrl("missing host".to_string()));
        }

        let runtime = Runtime::new().map_err(TransportError::Io)?;

        info!(endpoint = %endpoint, "Opening WebSocket link");
        let ws = runtime
            .block_on(tokio_tungstenite::connect_async(endpoint.clone()))
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?
            .0;

        let (out_tx, out_rx) = crossbeam_channel::unbounded::<String>();
        let (in_tx, in_rx) = crossbeam_channel::unbounded::<String>();
        let (event_tx, event_rx) = crossbeam_channel::unbounded::<LinkEvent>();

        let (write, read) = ws.split();
        runtime.spawn(run_writer(write, out_rx));
        runtime.spawn(run_reader(read, in_tx, event_tx));

        Ok(WireConnection::with_runtime(out_tx, in_rx, event_rx, runtime))
    }
}

async fn run_writer(
    mut write: futures_util::stream::SplitSink<WsStream, Message>,
    outbound: Receiver<String>,
) {
    loop {
        match outbound.recv_timeout(Duration::from_millis(100)) {
            Ok(raw) => {
                if let Err(e) = write.send(Message::Text(raw)).await {
                    warn!("WebSocket send failed: {}", e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Outbound channel dropped, closing WebSocket");
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

async fn run_reader(
    mut read: futures_util::stream::SplitStream<WsStream>,
    inbound: Sender<String>,
    link_events: Sender<LinkEvent>,
) {
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if inbound.send(text).is_err() {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                debug!("Ignoring binary message of {} bytes", data.len());
            }
            Ok(Message::Close(_)) => {
                let _ = link_events.send(LinkEvent::Closed);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let _ = link_events.send(LinkEvent::Error(e.to_string()));
                break;
            }
        }
    }
}
