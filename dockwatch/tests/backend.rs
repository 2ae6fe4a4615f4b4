//! Transport against an in-process WebSocket backend: stalled stats replies
//! time out, the stats feed keeps reporting, and log streams arrive in order.
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use dockwatch::demo::DemoSource;
use dockwatch::error::Error;
use dockwatch::scrollback::Scrollback;
use dockwatch::sink::LogSink;
use dockwatch::source::{spawn_stats_feed, Source};
use dockwatch::ws::Remote;

#[derive(Clone, Copy)]
enum Backend {
    // reads every request, answers none
    Silent,
    // answers a log request with two lines and an end frame
    Logs,
}

async fn serve(kind: Backend) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(tcp).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let Backend::Logs = kind else { continue };
                    if msg.to_text().unwrap_or("").contains("container_logs") {
                        for frame in ["line 1", "line 2", r#"{"type":"end"}"#] {
                            ws.send(Message::Text(frame.into())).await.unwrap();
                        }
                    }
                }
            });
        }
    });
    format!("ws://{addr}/ws")
}

#[tokio::test]
async fn stalled_stats_reply_times_out_and_reconnects() {
    let url = serve(Backend::Silent).await;
    let mut remote = Remote::connect(&url, None)
        .await
        .unwrap()
        .with_stats_timeout(Duration::from_millis(100));

    for _ in 0..2 {
        let res = timeout(Duration::from_secs(5), remote.container_stats())
            .await
            .expect("stats call must not hang");
        assert!(matches!(res, Err(Error::Timeout(_))), "{res:?}");
    }
}

#[tokio::test]
async fn stats_feed_reports_a_stalled_backend() {
    let url = serve(Backend::Silent).await;
    let remote = Remote::connect(&url, None)
        .await
        .unwrap()
        .with_stats_timeout(Duration::from_millis(50));
    let (feed, mut rx) = spawn_stats_feed(Source::Remote(remote), Duration::from_millis(10));

    let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert!(matches!(first, Some(Err(Error::Timeout(_)))));
    feed.abort();
}

#[tokio::test]
async fn stats_feed_delivers_batches_and_stops_with_its_receiver() {
    let (feed, mut rx) = spawn_stats_feed(Source::Demo(DemoSource::new()), Duration::from_millis(5));

    for _ in 0..3 {
        let batch = rx.recv().await.unwrap().unwrap();
        assert!(!batch.is_empty());
    }

    drop(rx);
    timeout(Duration::from_secs(5), feed)
        .await
        .expect("feed stops once nobody listens")
        .unwrap();
}

#[tokio::test]
async fn log_stream_from_backend_renders_in_order() {
    let url = serve(Backend::Logs).await;
    let remote = Remote::connect(&url, None).await.unwrap();
    let opener = Source::Remote(remote).log_opener();

    let stream = opener.container_logs("web").await.unwrap();
    let mut sink = LogSink::new(Scrollback::new());
    sink.attach(Some(stream));
    let n = timeout(Duration::from_secs(5), sink.drain()).await.unwrap().unwrap();

    assert_eq!(n, 2);
    assert_eq!(sink.surface().lines().collect::<Vec<_>>(), vec!["line 1", "line 2"]);
}
