//! WebSocket client for the backend: container stats requests and log
//! streams for container tails and deploy actions.

use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, Stream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::sink::LogStream;
use crate::types::{ContainerStat, MetricSample, StreamFrame};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on the WebSocket handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on waiting for a stats reply.
pub const STATS_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the endpoint URL, appending the auth token as `?token=`.
pub fn endpoint(base: &str, token: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| Error::Connect {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(Error::Connect {
            url: base.to_string(),
            reason: format!("unsupported scheme '{}', expected ws or wss", url.scheme()),
        });
    }
    if let Some(t) = token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("token", t);
    }
    Ok(url)
}

// Connect to the backend and return the WS stream
pub async fn connect(url: &Url) -> Result<WsStream> {
    let (ws, _) = timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
        .await
        .map_err(|_| Error::Timeout("connect"))?
        .map_err(|e| Error::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    Ok(ws)
}

// Send a "container_stats" request and await a single JSON reply
pub async fn request_stats(ws: &mut WsStream) -> Result<Vec<MetricSample>> {
    ws.send(Message::Text(json!({ "op": "container_stats" }).to_string()))
        .await?;
    let text = next_text(ws).await?;
    decode_stats(&text)
}

/// Decodes a stats reply. The reply must be an array; entries are decoded one
/// by one and any that cannot be keyed or decoded are skipped.
pub fn decode_stats(text: &str) -> Result<Vec<MetricSample>> {
    let entries: Vec<Value> = serde_json::from_str(text)?;
    let now = Utc::now();
    let total = entries.len();
    let batch: Vec<MetricSample> = entries
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<ContainerStat>(v) {
            Ok(stat) => stat.into_sample(now),
            Err(e) => {
                debug!(error = %e, "undecodable stats entry");
                None
            }
        })
        .collect();
    if batch.len() < total {
        debug!(dropped = total - batch.len(), "stats entries skipped");
    }
    Ok(batch)
}

async fn next_text(ws: &mut WsStream) -> Result<String> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(t) => return Ok(t),
            Message::Binary(b) => return Ok(String::from_utf8_lossy(&b).into_owned()),
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(Error::Closed)
}

/// Turns the frames of a log connection into a [`LogStream`].
///
/// `{"type":"end"}` or a close frame ends the stream, `{"type":"error",...}`
/// fails it; anything else is a record. Dropping the stream drops the
/// connection.
pub fn log_stream<S>(frames: S) -> LogStream
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin + Send + 'static,
{
    stream::unfold(Some(frames), |state| async move {
        let mut frames = state?;
        loop {
            let text = match frames.next().await {
                None | Some(Ok(Message::Close(_))) => return None,
                Some(Err(e)) => return Some((Err(Error::from(e)), None)),
                Some(Ok(Message::Text(t))) => t,
                Some(Ok(Message::Binary(b))) => String::from_utf8_lossy(&b).into_owned(),
                Some(Ok(_)) => continue,
            };
            match StreamFrame::parse(&text) {
                StreamFrame::End => return None,
                StreamFrame::Failure(error) => return Some((Err(Error::Remote(error)), None)),
                StreamFrame::Record(record) => return Some((Ok(record), Some(frames))),
            }
        }
    })
    .boxed()
}

/// Opens log streams. Each stream gets its own connection, so this is cheap
/// to clone into a background task.
#[derive(Debug, Clone)]
pub struct LogClient {
    url: Url,
}

impl LogClient {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Tail of a container's logs.
    pub async fn container_logs(&self, container: &str) -> Result<LogStream> {
        self.open_stream(json!({ "op": "container_logs", "container": container }))
            .await
    }

    /// Runs the deploy action for a stack and streams its output.
    pub async fn deploy(&self, stack: &str) -> Result<LogStream> {
        self.open_stream(json!({ "op": "deploy", "stack": stack }))
            .await
    }

    async fn open_stream(&self, request: Value) -> Result<LogStream> {
        let mut ws = connect(&self.url).await?;
        ws.send(Message::Text(request.to_string())).await?;
        debug!(%request, "log stream opened");
        Ok(log_stream(ws))
    }
}

/// Backend handle: a persistent connection for stats plus a [`LogClient`]
/// for log streams.
pub struct Remote {
    url: Url,
    ws: Option<WsStream>,
    stats_timeout: Duration,
}

impl Remote {
    pub async fn connect(base: &str, token: Option<&str>) -> Result<Self> {
        let url = endpoint(base, token)?;
        let ws = connect(&url).await?;
        info!(url = %base, "connected");
        Ok(Self {
            url,
            ws: Some(ws),
            stats_timeout: STATS_TIMEOUT,
        })
    }

    pub fn with_stats_timeout(mut self, limit: Duration) -> Self {
        self.stats_timeout = limit;
        self
    }

    pub fn log_client(&self) -> LogClient {
        LogClient::new(self.url.clone())
    }

    /// Latest stats snapshot. Reconnects if the stats connection dropped or
    /// the last reply never came.
    pub async fn container_stats(&mut self) -> Result<Vec<MetricSample>> {
        if self.ws.is_none() {
            self.ws = Some(connect(&self.url).await?);
        }
        let Some(ws) = self.ws.as_mut() else {
            return Err(Error::Closed);
        };
        let res = match timeout(self.stats_timeout, request_stats(ws)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout("stats reply")),
        };
        if let Err(e) = &res {
            // a late reply would be read as the answer to the next request
            if matches!(e, Error::Transport(_) | Error::Closed | Error::Timeout(_)) {
                warn!(error = %e, "stats connection reset");
                self.ws = None;
            }
        }
        res
    }

    pub async fn container_logs(&self, container: &str) -> Result<LogStream> {
        self.log_client().container_logs(container).await
    }

    pub async fn deploy(&self, stack: &str) -> Result<LogStream> {
        self.log_client().deploy(stack).await
    }
}
