//! Streaming log sink: feeds one attached log stream into a terminal surface.
//!
//! The sink is a small state machine:
//!
//! ```text
//!   Idle --attach(Some)--> Consuming --end/error--> Idle
//!    ^                        |
//!    +------attach(None)------+        any --dispose--> Disposed
//! ```
//!
//! Attaching a new stream while consuming drops the old one unread and clears
//! the surface before the first record of the new stream is appended. Records
//! are pulled one at a time through [`LogSink::next_event`], so the owner
//! decides when to redraw between records.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use ratatui::layout::Rect;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::LogRecord;

/// Live, possibly endless sequence of log records.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<LogRecord, Error>> + Send>>;

/// Wait after an explicit layout change before measuring the container.
pub const FIT_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Visible rows/columns of a surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub rows: u16,
    pub cols: u16,
}

/// Render target for the sink. Implemented by the scrollback buffer drawn by
/// the log panel, and by capturing stubs in tests.
pub trait TerminalSurface {
    /// Write one line; `line` carries no terminator.
    fn append(&mut self, line: &str);
    fn clear(&mut self);
    /// Recompute geometry for a container of the given outer size.
    fn fit(&mut self, container: Rect) -> Geometry;
    fn dispose(&mut self);
}

pub enum SinkState {
    Idle,
    Consuming(LogStream),
    Disposed,
}

impl fmt::Debug for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkState::Idle => f.write_str("Idle"),
            SinkState::Consuming(_) => f.write_str("Consuming(..)"),
            SinkState::Disposed => f.write_str("Disposed"),
        }
    }
}

/// Outcome of one [`LogSink::next_event`] call.
#[derive(Debug)]
pub enum SinkEvent {
    /// A record was written as this many lines
    Appended(usize),
    /// The stream finished normally; rendered content is kept
    Ended,
    /// The stream failed; rendered content is kept and the error is handed back
    Failed(Error),
}

pub struct LogSink<S: TerminalSurface> {
    surface: S,
    state: SinkState,
    container: Option<Rect>,
    geometry: Geometry,
    fit_at: Option<Instant>,
}

impl<S: TerminalSurface> LogSink<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: SinkState::Idle,
            container: None,
            geometry: Geometry::default(),
            fit_at: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn state(&self) -> &SinkState {
        &self.state
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn is_consuming(&self) -> bool {
        matches!(self.state, SinkState::Consuming(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, SinkState::Disposed)
    }

    /// Binds the sink to `stream`, discarding any previous stream and clearing
    /// the surface. `None` leaves the view empty and idle.
    pub fn attach(&mut self, stream: Option<LogStream>) {
        if self.is_disposed() {
            warn!("attach on a disposed log sink ignored");
            return;
        }
        if self.is_consuming() {
            debug!("superseding attached log stream");
        }
        // Dropping the old stream here is the only cancellation it gets.
        self.state = SinkState::Idle;
        self.surface.clear();
        if let Some(stream) = stream {
            info!("log stream attached");
            self.state = SinkState::Consuming(stream);
        }
    }

    /// Waits for the next record of the attached stream and writes it.
    ///
    /// Pending forever while nothing is attached. Dropping the returned
    /// future between records loses nothing.
    pub async fn next_event(&mut self) -> SinkEvent {
        let SinkState::Consuming(stream) = &mut self.state else {
            return futures::future::pending().await;
        };
        let item = stream.next().await;
        match item {
            Some(Ok(record)) => {
                let n = write_record(&mut self.surface, &record.content());
                SinkEvent::Appended(n)
            }
            Some(Err(e)) => {
                warn!(error = %e, "log stream failed");
                self.state = SinkState::Idle;
                SinkEvent::Failed(e)
            }
            None => {
                debug!("log stream ended");
                self.state = SinkState::Idle;
                SinkEvent::Ended
            }
        }
    }

    /// Consumes the attached stream to its end. Returns the number of lines
    /// written, or the stream's error.
    pub async fn drain(&mut self) -> Result<usize, Error> {
        let mut total = 0;
        while self.is_consuming() {
            match self.next_event().await {
                SinkEvent::Appended(n) => total += n,
                SinkEvent::Ended => break,
                SinkEvent::Failed(e) => return Err(e),
            }
        }
        Ok(total)
    }

    /// Records the container's current size. A change refits right away
    /// unless a scheduled fit is still waiting for the layout to settle.
    pub fn observe_container(&mut self, area: Rect) {
        if self.is_disposed() || self.container == Some(area) {
            return;
        }
        self.container = Some(area);
        if self.fit_at.is_none() {
            self.resize();
        }
    }

    /// Schedules a fit once a layout transition has settled.
    pub fn schedule_fit(&mut self, now: Instant) {
        if !self.is_disposed() {
            self.fit_at = Some(now + FIT_SETTLE_DELAY);
        }
    }

    pub fn fit_deadline(&self) -> Option<Instant> {
        self.fit_at
    }

    /// Runs a scheduled fit if its deadline has passed. Returns whether it ran.
    pub fn poll_fit(&mut self, now: Instant) -> bool {
        match self.fit_at {
            Some(at) if at <= now => {
                self.fit_at = None;
                self.resize();
                true
            }
            _ => false,
        }
    }

    /// Recomputes rows/columns from the last observed container size.
    pub fn resize(&mut self) {
        if self.is_disposed() {
            return;
        }
        if let Some(area) = self.container {
            self.geometry = self.surface.fit(area);
        }
    }

    /// Releases the surface and stops observing size changes. Later calls
    /// are no-ops.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.state = SinkState::Disposed;
        self.container = None;
        self.fit_at = None;
        self.surface.dispose();
        info!("log sink disposed");
    }
}

// One record may carry several lines; each becomes its own terminal line.
fn write_record<S: TerminalSurface>(surface: &mut S, content: &str) -> usize {
    let mut n = 0;
    for line in content.split('\n') {
        surface.append(line.strip_suffix('\r').unwrap_or(line));
        n += 1;
    }
    n
}
