//! In-process demo backend: a handful of fake containers with drifting stats,
//! an endless log tail per container and a short deploy run.

use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::Error;
use crate::sink::LogStream;
use crate::types::{LogRecord, MetricField, MetricSample};

#[derive(Debug, Clone)]
struct FakeContainer {
    name: &'static str,
    base_cpu: f64,
    mem_limit: f64,
    mem_base: f64,
    // cumulative counters
    rx: f64,
    tx: f64,
    read: f64,
    write: f64,
}

#[derive(Debug, Clone)]
pub struct DemoSource {
    tick: u64,
    containers: Vec<FakeContainer>,
    log_interval: Duration,
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

const MIB: f64 = 1024.0 * 1024.0;

// "worker" goes away for part of every cycle so its history gets pruned.
const WORKER_CYCLE: u64 = 40;
const WORKER_DOWN: u64 = 10;

impl DemoSource {
    pub fn new() -> Self {
        let c = |name, base_cpu, mem_base, mem_limit| FakeContainer {
            name,
            base_cpu,
            mem_limit,
            mem_base,
            rx: 0.0,
            tx: 0.0,
            read: 0.0,
            write: 0.0,
        };
        Self {
            tick: 0,
            containers: vec![
                c("web", 18.0, 120.0 * MIB, 512.0 * MIB),
                c("db", 35.0, 800.0 * MIB, 2048.0 * MIB),
                c("cache", 6.0, 64.0 * MIB, 256.0 * MIB),
                c("worker", 55.0, 300.0 * MIB, 1024.0 * MIB),
            ],
            log_interval: Duration::from_millis(400),
        }
    }

    pub fn with_log_interval(mut self, every: Duration) -> Self {
        self.log_interval = every;
        self
    }

    /// Next snapshot batch.
    pub fn container_stats(&mut self) -> Vec<MetricSample> {
        self.tick += 1;
        let t = self.tick as f64;
        let now = Utc::now();
        let worker_up = self.tick % WORKER_CYCLE >= WORKER_DOWN;
        self.containers
            .iter_mut()
            .enumerate()
            .filter(|(_, c)| c.name != "worker" || worker_up)
            .map(|(i, c)| {
                let phase = i as f64 * 1.7;
                let wave = (t * 0.35 + phase).sin();
                c.rx += (40.0 + 30.0 * wave.abs()) * 1024.0;
                c.tx += (15.0 + 10.0 * (t * 0.2 + phase).cos().abs()) * 1024.0;
                c.read += (8.0 + 8.0 * wave.max(0.0)) * 1024.0;
                c.write += (4.0 + 6.0 * (-wave).max(0.0)) * 1024.0;
                let mem = (c.mem_base + c.mem_base * 0.1 * wave).min(c.mem_limit);
                MetricSample::new(c.name, now)
                    .with(MetricField::CpuPercent, (c.base_cpu + 12.0 * wave).clamp(0.0, 100.0))
                    .with(MetricField::MemoryUsedBytes, mem)
                    .with(MetricField::MemoryLimitBytes, c.mem_limit)
                    .with(MetricField::NetworkRxBytes, c.rx)
                    .with(MetricField::NetworkTxBytes, c.tx)
                    .with(MetricField::BlockReadBytes, c.read)
                    .with(MetricField::BlockWriteBytes, c.write)
            })
            .collect()
    }

    /// Endless log tail for `container`.
    pub fn container_logs(&self, container: &str) -> LogStream {
        let name = container.to_string();
        let every = self.log_interval;
        stream::unfold(0u64, move |n| {
            let name = name.clone();
            async move {
                tokio::time::sleep(every).await;
                let line = match n % 7 {
                    3 => format!("\x1b[33mWARN\x1b[0m [{name}] slow request id={n} took {}ms", 200 + n % 300),
                    6 => format!("\x1b[2mDEBUG\x1b[0m [{name}] cache hit ratio {:.2}", 0.5 + (n % 50) as f64 / 100.0),
                    _ => format!("\x1b[32mINFO\x1b[0m [{name}] handled request id={n}"),
                };
                Some((Ok::<_, Error>(LogRecord::from(line)), n + 1))
            }
        })
        .boxed()
    }

    /// Finite deploy run for `stack`.
    pub fn deploy(&self, stack: &str) -> LogStream {
        let mut steps: Vec<LogRecord> = vec![LogRecord::from(format!("Deploying stack '{stack}'"))];
        for c in &self.containers {
            steps.push(LogRecord::from(format!(" Container {stack}-{}-1  Pulling", c.name)));
            steps.push(LogRecord::from(format!(" Container {stack}-{}-1  \x1b[32mStarted\x1b[0m", c.name)));
        }
        steps.push(LogRecord::from("\x1b[1mDeploy finished\x1b[0m"));
        let every = self.log_interval / 2;
        stream::iter(steps)
            .then(move |r| async move {
                tokio::time::sleep(every).await;
                Ok::<_, Error>(r)
            })
            .boxed()
    }
}
