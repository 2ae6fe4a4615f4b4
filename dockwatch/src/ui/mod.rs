//! UI module root: exposes drawing functions for individual panels.

pub mod charts;
pub mod containers;
pub mod header;
pub mod logs;
pub mod theme;
pub mod util;
