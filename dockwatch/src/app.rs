//! App state and main loop: input handling, stats refresh, log stream
//! consumption, and drawing.

use std::{io, time::Duration};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::history::{MetricsAggregator, PairedMetric, SeriesTransform};
use crate::error::Result;
use crate::scrollback::Scrollback;
use crate::sink::{LogSink, LogStream, SinkEvent};
use crate::source::{spawn_stats_feed, LogOpener, Source};
use crate::types::{MetricField, MetricSample};
use crate::ui::{
    charts::draw_chart,
    containers::{containers_handle_key, draw_containers},
    header::{draw_header, HeaderInfo},
    logs::draw_logs,
};

const MIB: f64 = 1.0 / (1024.0 * 1024.0);
const KIB: f64 = 1.0 / 1024.0;

/// What the log panel is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Container(String),
    Deploy(String),
}

impl LogTarget {
    fn title(&self) -> String {
        match self {
            LogTarget::Container(name) => format!("Logs: {name}"),
            LogTarget::Deploy(stack) => format!("Deploy: {stack}"),
        }
    }

    async fn open(&self, opener: &LogOpener) -> Result<LogStream> {
        match self {
            LogTarget::Container(name) => opener.container_logs(name).await,
            LogTarget::Deploy(stack) => opener.deploy(stack).await,
        }
    }
}

// Result of a log stream opened in the background. Only the most recent
// request (by `seq`) is attached.
struct OpenedLog {
    seq: u64,
    target: LogTarget,
    result: Result<LogStream>,
}

pub struct App {
    // Rolling stats per container
    stats: MetricsAggregator,

    // Log terminal
    sink: LogSink<Scrollback>,
    log_target: Option<LogTarget>,
    log_minimized: bool,
    opening: Option<LogTarget>,
    open_seq: u64,

    // Container table
    selected: usize,
    table_offset: usize,
    table_page: usize,

    // Header
    target: String,
    status: Option<String>,

    stack: String,
    interval: Duration,

    // Quit flag
    should_quit: bool,
}

impl App {
    pub fn new(target: impl Into<String>, stack: impl Into<String>, interval: Duration) -> Self {
        Self {
            stats: MetricsAggregator::new(),
            sink: LogSink::new(Scrollback::new()),
            log_target: None,
            log_minimized: false,
            opening: None,
            open_seq: 0,
            selected: 0,
            table_offset: 0,
            table_page: 1,
            target: target.into(),
            status: None,
            stack: stack.into(),
            interval,
            should_quit: false,
        }
    }

    pub async fn run(&mut self, source: Source) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let opener = source.log_opener();
        let (feed, stats) = spawn_stats_feed(source, self.interval);

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal, stats, &opener).await;

        // Teardown
        feed.abort();
        self.sink.dispose();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        mut stats: mpsc::Receiver<Result<Vec<MetricSample>>>,
        opener: &LogOpener,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut events = EventStream::new();
        let (open_tx, mut opened) = mpsc::unbounded_channel::<OpenedLog>();

        loop {
            // Draw before waiting again so every appended record is on screen
            // before the next one is requested.
            terminal.draw(|f| self.draw(f))?;
            if self.should_quit {
                break;
            }

            // No branch body awaits; anything slow runs on its own task.
            let consuming = self.sink.is_consuming();
            let fit_at = self.sink.fit_deadline();
            tokio::select! {
                maybe_ev = events.next() => match maybe_ev {
                    Some(Ok(Event::Key(k))) => self.handle_key(k, opener, &open_tx),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                Some(res) = stats.recv() => self.apply_stats(res),
                Some(o) = opened.recv() => self.on_opened(o),
                ev = self.sink.next_event(), if consuming => self.on_sink_event(ev),
                _ = sleep_until(fit_at.unwrap_or_else(Instant::now)), if fit_at.is_some() => {
                    self.sink.poll_fit(Instant::now());
                }
            }
        }

        Ok(())
    }

    fn apply_stats(&mut self, res: Result<Vec<MetricSample>>) {
        match res {
            Ok(batch) => {
                self.stats.ingest(batch);
                self.selected = self.selected.min(self.stats.len().saturating_sub(1));
                if self.status.as_deref().is_some_and(|s| s.starts_with("stats:")) {
                    self.status = None;
                }
            }
            // A failed tick leaves the histories untouched.
            Err(e) => {
                warn!(error = %e, "stats refresh failed");
                self.status = Some(format!("stats: {e}"));
            }
        }
    }

    fn on_sink_event(&mut self, ev: SinkEvent) {
        match ev {
            SinkEvent::Appended(_) => {}
            SinkEvent::Ended => {
                if let Some(t) = &self.log_target {
                    info!(log = %t.title(), "log stream finished");
                }
            }
            SinkEvent::Failed(e) => {
                let what = self
                    .log_target
                    .as_ref()
                    .map(LogTarget::title)
                    .unwrap_or_else(|| "log stream".into());
                self.status = Some(format!("{what} failed: {e}"));
            }
        }
    }

    fn handle_key(&mut self, k: KeyEvent, opener: &LogOpener, open_tx: &mpsc::UnboundedSender<OpenedLog>) {
        if k.kind != KeyEventKind::Press {
            return;
        }
        if containers_handle_key(&mut self.selected, k, self.stats.len(), self.table_page) {
            return;
        }
        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter | KeyCode::Char('l') => {
                let Some(name) = self.stats.entities().nth(self.selected).map(str::to_string) else {
                    return;
                };
                self.open_logs(LogTarget::Container(name), opener, open_tx);
            }
            KeyCode::Char('d') => {
                let stack = self.stack.clone();
                self.open_logs(LogTarget::Deploy(stack), opener, open_tx);
            }
            KeyCode::Char('c') => {
                // also cancels an open still in flight
                self.open_seq += 1;
                self.opening = None;
                self.sink.attach(None);
                self.log_target = None;
            }
            KeyCode::Char('m') => {
                self.log_minimized = !self.log_minimized;
                self.sink.schedule_fit(Instant::now());
            }
            _ => {}
        }
    }

    fn open_logs(&mut self, target: LogTarget, opener: &LogOpener, open_tx: &mpsc::UnboundedSender<OpenedLog>) {
        self.open_seq += 1;
        let seq = self.open_seq;
        self.opening = Some(target.clone());
        let opener = opener.clone();
        let tx = open_tx.clone();
        tokio::spawn(async move {
            let result = target.open(&opener).await;
            let _ = tx.send(OpenedLog { seq, target, result });
        });
    }

    fn on_opened(&mut self, o: OpenedLog) {
        if o.seq != self.open_seq {
            // superseded; dropping the stream closes its connection
            debug!(log = %o.target.title(), "discarding superseded log stream");
            return;
        }
        self.opening = None;
        match o.result {
            Ok(stream) => {
                info!(log = %o.target.title(), "attaching log stream");
                self.sink.attach(Some(stream));
                self.log_target = Some(o.target);
                self.status = None;
            }
            Err(e) => {
                warn!(error = %e, log = %o.target.title(), "could not open log stream");
                self.status = Some(format!("{}: {e}", o.target.title()));
            }
        }
    }

    fn logs_label(&self) -> String {
        if let Some(t) = &self.opening {
            return format!("opening {}", t.title());
        }
        match (&self.log_target, self.sink.is_consuming()) {
            (None, _) => "idle".into(),
            (Some(t), true) => format!("streaming {}", t.title()),
            (Some(t), false) => format!("{} (ended)", t.title()),
        }
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, charts, container table, log terminal
        let constraints = if self.log_minimized {
            [
                Constraint::Length(1),
                Constraint::Percentage(55),
                Constraint::Min(6),
                Constraint::Length(3),
            ]
        } else {
            [
                Constraint::Length(1),
                Constraint::Percentage(35),
                Constraint::Length(8),
                Constraint::Min(6),
            ]
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let logs = self.logs_label();
        draw_header(
            f,
            rows[0],
            &HeaderInfo {
                target: &self.target,
                containers: self.stats.len(),
                logs: &logs,
                status: self.status.as_deref(),
            },
        );

        self.draw_charts(f, rows[1]);

        self.table_page = rows[2].height.saturating_sub(3).max(1) as usize; // borders (2) + header (1)
        self.table_offset =
            draw_containers(f, rows[2], &self.stats, self.selected, self.table_offset);

        let title = self
            .log_target
            .as_ref()
            .map(LogTarget::title)
            .unwrap_or_else(|| "Logs".into());
        if !self.log_minimized {
            self.sink.observe_container(rows[3]);
        }
        draw_logs(f, rows[3], self.sink.surface(), &title, self.log_minimized);
    }

    fn draw_charts(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let halves = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(halves[0]);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(halves[1]);

        let n = self.stats.len();
        let cpu = self.stats.derive_series(MetricField::CpuPercent, None);
        draw_chart(f, top[0], "CPU", "%", &cpu, n);

        let mem = self
            .stats
            .derive_series(MetricField::MemoryUsedBytes, Some(&SeriesTransform::scaled(MIB)));
        draw_chart(f, top[1], "Memory (MiB)", "M", &mem, n);

        let net = self.stats.derive_paired(PairedMetric::Network, KIB);
        draw_chart(f, bottom[0], "Network Rx/Tx (KiB)", "K", &net, n);

        let blk = self.stats.derive_paired(PairedMetric::BlockIo, KIB);
        draw_chart(f, bottom[1], "Block IO Read/Write (KiB)", "K", &blk, n);
    }
}
