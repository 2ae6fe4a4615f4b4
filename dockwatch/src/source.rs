//! Where the dashboard gets its data: a live backend or the demo generator.
//!
//! Stats are fetched on a background task so a slow backend never stalls the
//! UI loop; log streams are opened through a cloneable [`LogOpener`].

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::demo::DemoSource;
use crate::error::Result;
use crate::sink::LogStream;
use crate::types::MetricSample;
use crate::ws::{LogClient, Remote};

pub enum Source {
    Remote(Remote),
    Demo(DemoSource),
}

impl Source {
    pub async fn container_stats(&mut self) -> Result<Vec<MetricSample>> {
        match self {
            Source::Remote(r) => r.container_stats().await,
            Source::Demo(d) => Ok(d.container_stats()),
        }
    }

    pub fn log_opener(&self) -> LogOpener {
        match self {
            Source::Remote(r) => LogOpener::Remote(r.log_client()),
            Source::Demo(d) => LogOpener::Demo(d.clone()),
        }
    }
}

/// Fetches stats every `interval` on its own task and sends each result.
/// The task ends once the receiver is dropped.
pub fn spawn_stats_feed(
    mut source: Source,
    interval: Duration,
) -> (JoinHandle<()>, mpsc::Receiver<Result<Vec<MetricSample>>>) {
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let res = source.container_stats().await;
            if tx.send(res).await.is_err() {
                debug!("stats feed receiver gone");
                break;
            }
        }
    });
    (handle, rx)
}

#[derive(Debug, Clone)]
pub enum LogOpener {
    Remote(LogClient),
    Demo(DemoSource),
}

impl LogOpener {
    pub async fn container_logs(&self, container: &str) -> Result<LogStream> {
        match self {
            LogOpener::Remote(c) => c.container_logs(container).await,
            LogOpener::Demo(d) => Ok(d.container_logs(container)),
        }
    }

    pub async fn deploy(&self, stack: &str) -> Result<LogStream> {
        match self {
            LogOpener::Remote(c) => c.deploy(stack).await,
            LogOpener::Demo(d) => Ok(d.deploy(stack)),
        }
    }
}
