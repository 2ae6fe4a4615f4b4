//! Log sink behaviour: ordering, reattach resets, failures, geometry and the
//! bounded scrollback.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::mpsc;
use futures::stream::{self, StreamExt};
use ratatui::layout::Rect;
use tokio::time::Instant;

use dockwatch::error::Error;
use dockwatch::scrollback::{Scrollback, SCROLLBACK_LINES};
use dockwatch::sink::{
    Geometry, LogSink, LogStream, SinkEvent, TerminalSurface, FIT_SETTLE_DELAY,
};
use dockwatch::types::LogRecord;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Append(String),
    Clear,
    Fit(Rect),
    Dispose,
}

// Records every call; shared so the test can inspect it while the sink owns it.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<Call>>>);

impl Capture {
    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    fn appended(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Append(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl TerminalSurface for Capture {
    fn append(&mut self, line: &str) {
        self.0.lock().unwrap().push(Call::Append(line.to_string()));
    }
    fn clear(&mut self) {
        self.0.lock().unwrap().push(Call::Clear);
    }
    fn fit(&mut self, container: Rect) -> Geometry {
        self.0.lock().unwrap().push(Call::Fit(container));
        Geometry {
            rows: container.height.saturating_sub(2),
            cols: container.width.saturating_sub(2),
        }
    }
    fn dispose(&mut self) {
        self.0.lock().unwrap().push(Call::Dispose);
    }
}

fn lines(items: &[&str]) -> LogStream {
    let owned: Vec<Result<LogRecord, Error>> =
        items.iter().map(|s| Ok(LogRecord::from(*s))).collect();
    stream::iter(owned).boxed()
}

fn channel() -> (mpsc::UnboundedSender<Result<LogRecord, Error>>, LogStream) {
    let (tx, rx) = mpsc::unbounded();
    (tx, rx.boxed())
}

#[tokio::test]
async fn renders_records_in_arrival_order() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    sink.attach(Some(lines(&["a", "b", "c"])));

    let n = sink.drain().await.expect("stream ends cleanly");

    assert_eq!(n, 3);
    assert_eq!(cap.appended(), vec!["a", "b", "c"]);
    assert!(!sink.is_consuming());
}

#[tokio::test]
async fn each_record_is_written_before_the_next_is_pulled() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    let (tx, stream) = channel();
    sink.attach(Some(stream));

    tx.unbounded_send(Ok("first".into())).unwrap();
    assert!(matches!(sink.next_event().await, SinkEvent::Appended(1)));
    assert_eq!(cap.appended(), vec!["first"]);

    // Nothing queued: the sink waits without writing anything.
    let idle = tokio::time::timeout(Duration::from_millis(20), sink.next_event()).await;
    assert!(idle.is_err());
    assert_eq!(cap.appended(), vec!["first"]);

    tx.unbounded_send(Ok("second".into())).unwrap();
    assert!(matches!(sink.next_event().await, SinkEvent::Appended(1)));
    assert_eq!(cap.appended(), vec!["first", "second"]);
}

#[tokio::test]
async fn reattach_clears_before_new_content_and_ignores_old_stream() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());

    let (tx_a, stream_a) = channel();
    sink.attach(Some(stream_a));
    tx_a.unbounded_send(Ok("a1".into())).unwrap();
    sink.next_event().await;

    let (tx_b, stream_b) = channel();
    sink.attach(Some(stream_b));
    // The old producer keeps going; nobody reads it any more.
    let _ = tx_a.unbounded_send(Ok("a2".into()));
    tx_b.unbounded_send(Ok("b1".into())).unwrap();
    tx_b.unbounded_send(Ok("b2".into())).unwrap();
    drop(tx_b);
    sink.drain().await.unwrap();

    let calls = cap.calls();
    let reset = calls
        .iter()
        .rposition(|c| *c == Call::Clear)
        .expect("clear on reattach");
    let after: Vec<&Call> = calls[reset + 1..].iter().collect();
    assert_eq!(
        after,
        vec![&Call::Append("b1".into()), &Call::Append("b2".into())]
    );
    assert!(!calls[reset + 1..].contains(&Call::Append("a2".into())));
    assert!(calls[..reset].contains(&Call::Append("a1".into())));
}

#[tokio::test]
async fn reattach_drops_the_previous_stream() {
    let mut sink = LogSink::new(Capture::default());
    let (tx, stream) = channel();
    sink.attach(Some(stream));
    assert!(!tx.is_closed());

    sink.attach(Some(lines(&["x"])));
    assert!(tx.is_closed(), "superseded stream should have been dropped");
}

#[tokio::test]
async fn attach_none_leaves_empty_idle_view() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    sink.attach(Some(lines(&["a"])));
    sink.drain().await.unwrap();

    sink.attach(None);

    assert!(!sink.is_consuming());
    assert_eq!(cap.calls().last(), Some(&Call::Clear));
    // Idle sinks never resolve
    let idle = tokio::time::timeout(Duration::from_millis(20), sink.next_event()).await;
    assert!(idle.is_err());
}

#[tokio::test]
async fn failure_keeps_rendered_lines_and_hands_back_error() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    let items: Vec<Result<LogRecord, Error>> = vec![
        Ok("building".into()),
        Err(Error::Remote("image not found".into())),
        Ok("never shown".into()),
    ];
    sink.attach(Some(stream::iter(items).boxed()));

    let err = sink.drain().await.expect_err("stream failed");

    assert!(matches!(err, Error::Remote(ref m) if m == "image not found"));
    assert_eq!(cap.appended(), vec!["building"]);
    // only the clear from attach; the failure itself wipes nothing
    assert_eq!(cap.calls().iter().filter(|c| **c == Call::Clear).count(), 1);
    assert!(!sink.is_consuming());
}

#[tokio::test]
async fn multi_line_records_are_split() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    sink.attach(Some(lines(&["one\r\ntwo\nthree"])));

    assert_eq!(sink.drain().await.unwrap(), 3);
    assert_eq!(cap.appended(), vec!["one", "two", "three"]);
}

#[tokio::test]
async fn resize_is_safe_before_attach_and_idempotent() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());

    // No container observed yet: nothing to measure.
    sink.resize();
    assert!(cap.calls().is_empty());

    let area = Rect::new(0, 0, 42, 12);
    sink.observe_container(area);
    sink.observe_container(area);
    sink.resize();
    sink.resize();

    assert_eq!(sink.geometry(), Geometry { rows: 10, cols: 40 });
    let fits = cap.calls().iter().filter(|c| matches!(c, Call::Fit(_))).count();
    assert_eq!(fits, 3, "observe once plus two explicit resizes");
}

#[tokio::test]
async fn scheduled_fit_waits_for_layout_to_settle() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    sink.observe_container(Rect::new(0, 0, 30, 5));

    let now = Instant::now();
    sink.schedule_fit(now);
    // A size change while the fit is pending is recorded but not measured yet.
    sink.observe_container(Rect::new(0, 0, 30, 20));
    assert_eq!(sink.geometry(), Geometry { rows: 3, cols: 28 });

    assert!(!sink.poll_fit(now + FIT_SETTLE_DELAY / 2));
    assert_eq!(sink.fit_deadline(), Some(now + FIT_SETTLE_DELAY));
    assert!(sink.poll_fit(now + FIT_SETTLE_DELAY));
    assert_eq!(sink.geometry(), Geometry { rows: 18, cols: 28 });
    assert_eq!(sink.fit_deadline(), None);
}

#[tokio::test]
async fn dispose_runs_once_and_stops_everything() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    let (tx, stream) = channel();
    sink.attach(Some(stream));

    sink.dispose();
    sink.dispose();
    sink.attach(Some(lines(&["late"])));
    sink.observe_container(Rect::new(0, 0, 10, 10));
    sink.resize();

    let calls = cap.calls();
    assert_eq!(calls.iter().filter(|c| **c == Call::Dispose).count(), 1);
    assert!(!calls.iter().any(|c| matches!(c, Call::Append(_) | Call::Fit(_))));
    assert!(sink.is_disposed());
    assert!(tx.is_closed());
}

#[test]
fn dispose_without_attach_is_fine() {
    let cap = Capture::default();
    let mut sink = LogSink::new(cap.clone());
    sink.dispose();
    assert_eq!(cap.calls(), vec![Call::Dispose]);
}

#[tokio::test]
async fn scrollback_keeps_the_most_recent_lines() {
    let total = SCROLLBACK_LINES + 137;
    let owned: Vec<Result<LogRecord, Error>> =
        (0..total).map(|i| Ok(LogRecord::from(format!("line {i}")))).collect();
    let mut sink = LogSink::new(Scrollback::new());
    sink.attach(Some(stream::iter(owned).boxed()));
    sink.drain().await.unwrap();

    let kept: Vec<&str> = sink.surface().lines().collect();
    assert_eq!(kept.len(), SCROLLBACK_LINES);
    assert_eq!(kept[0], "line 137");
    assert_eq!(kept[SCROLLBACK_LINES - 1], format!("line {}", total - 1));
    assert!(kept
        .windows(2)
        .all(|w| w[0].trim_start_matches("line ").parse::<usize>().unwrap() + 1
            == w[1].trim_start_matches("line ").parse::<usize>().unwrap()));
}

#[test]
fn scrollback_tail_follows_geometry_and_wrapping() {
    let mut sb = Scrollback::with_capacity(10);
    for l in ["one", "two", "a very long line that wraps", "four"] {
        sb.append(l);
    }
    // 5 rows x 10 cols inside the border
    sb.fit(Rect::new(0, 0, 12, 7));

    // "four" = 1 row, long line = 3 rows, "two" = 1 row -> 5 rows
    assert_eq!(sb.visible(), vec!["two", "a very long line that wraps", "four"]);

    sb.clear();
    assert!(sb.visible().is_empty());
    assert!(sb.is_empty());
}

#[test]
fn scrollback_width_ignores_escape_sequences() {
    let mut sb = Scrollback::new();
    sb.append("\x1b[31merror\x1b[0m");
    sb.fit(Rect::new(0, 0, 7, 3));
    assert_eq!(sb.geometry(), Geometry { rows: 1, cols: 5 });
    assert_eq!(sb.visible(), vec!["\x1b[31merror\x1b[0m"]);
    assert_eq!(dockwatch::scrollback::wrapped_rows("\x1b[31merror\x1b[0m", 5), 1);
}
