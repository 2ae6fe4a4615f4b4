//! Demo backend feeding the real sink and aggregator.
use std::time::Duration;

use futures::StreamExt;

use dockwatch::demo::DemoSource;
use dockwatch::history::{memory_percent, MetricsAggregator};
use dockwatch::scrollback::Scrollback;
use dockwatch::sink::LogSink;
use dockwatch::types::MetricField;

#[test]
fn demo_stats_drive_pruning() {
    let mut demo = DemoSource::new();
    let mut agg = MetricsAggregator::new();

    agg.ingest(demo.container_stats());
    assert_eq!(agg.entities().collect::<Vec<_>>(), vec!["cache", "db", "web"]);

    for _ in 0..9 {
        agg.ingest(demo.container_stats());
    }
    assert!(agg.history("worker").is_some());
    assert_eq!(agg.history("worker").unwrap().len(), 1);
    assert_eq!(agg.history("web").unwrap().len(), 10);

    let web = agg.latest("web").unwrap();
    assert!(web.cpu_percent.is_some_and(|c| (0.0..=100.0).contains(&c)));
    assert!(memory_percent(web).is_some_and(|p| p <= 100.0));
    assert_eq!(agg.derive_series(MetricField::NetworkRxBytes, None).len(), 4);
}

#[tokio::test]
async fn demo_deploy_runs_to_completion() {
    let demo = DemoSource::new().with_log_interval(Duration::from_millis(2));
    let mut sink = LogSink::new(Scrollback::new());
    sink.attach(Some(demo.deploy("shop")));

    let n = sink.drain().await.unwrap();

    let lines: Vec<&str> = sink.surface().lines().collect();
    assert_eq!(n, lines.len());
    assert_eq!(lines[0], "Deploying stack 'shop'");
    assert!(lines.iter().any(|l| l.contains("shop-db-1")));
    assert!(lines.last().unwrap().contains("Deploy finished"));
}

#[tokio::test]
async fn demo_log_tail_keeps_going() {
    let demo = DemoSource::new().with_log_interval(Duration::from_millis(1));
    let first: Vec<_> = demo.container_logs("web").take(8).collect().await;
    assert_eq!(first.len(), 8);
    assert!(first.iter().all(|r| r.as_ref().is_ok_and(|r| r.content().contains("[web]"))));
}
