//! Bounded scrollback buffer backing the log terminal panel.

use std::collections::VecDeque;

use ratatui::layout::Rect;

use crate::ansi::display_width;
use crate::history::push_capped;
use crate::sink::{Geometry, TerminalSurface};

/// Lines retained by the log terminal.
pub const SCROLLBACK_LINES: usize = 2500;

#[derive(Debug)]
pub struct Scrollback {
    lines: VecDeque<String>,
    cap: usize,
    geometry: Geometry,
    disposed: bool,
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new()
    }
}

impl Scrollback {
    pub fn new() -> Self {
        Self::with_capacity(SCROLLBACK_LINES)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(cap.min(256)),
            cap: cap.max(1),
            geometry: Geometry::default(),
            disposed: false,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Tail of the buffer that fills the visible rows once long lines wrap at
    /// the current column count. The first returned line may be taller than
    /// the space left for it; the renderer drops its leading rows.
    pub fn visible(&self) -> Vec<&str> {
        let Geometry { rows, cols } = self.geometry;
        if rows == 0 || cols == 0 {
            return Vec::new();
        }
        let mut used = 0usize;
        let mut tail = Vec::new();
        for line in self.lines.iter().rev() {
            if used >= rows as usize {
                break;
            }
            used += wrapped_rows(line, cols);
            tail.push(line.as_str());
        }
        tail.reverse();
        tail
    }
}

/// Screen rows a line needs when wrapped at `cols` columns.
pub fn wrapped_rows(line: &str, cols: u16) -> usize {
    let cols = cols.max(1) as usize;
    display_width(line).div_ceil(cols).max(1)
}

impl TerminalSurface for Scrollback {
    fn append(&mut self, line: &str) {
        if self.disposed {
            return;
        }
        push_capped(&mut self.lines, line.to_string(), self.cap);
    }

    fn clear(&mut self) {
        self.lines.clear();
    }

    fn fit(&mut self, container: Rect) -> Geometry {
        // one cell of border on every side
        self.geometry = Geometry {
            rows: container.height.saturating_sub(2),
            cols: container.width.saturating_sub(2),
        };
        self.geometry
    }

    fn dispose(&mut self) {
        self.lines = VecDeque::new();
        self.geometry = Geometry::default();
        self.disposed = true;
    }
}
