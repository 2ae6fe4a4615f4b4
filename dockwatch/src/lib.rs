//! dockwatch: terminal dashboard for a Docker/Compose manager.
//!
//! The two pieces with real state live in [`sink`] (live log streams rendered
//! into a bounded scrollback) and [`history`] (rolling per-container stats
//! histories and the chart series derived from them). Everything else feeds
//! or draws them.

pub mod ansi;
pub mod app;
pub mod demo;
pub mod error;
pub mod history;
pub mod logging;
pub mod profiles;
pub mod scrollback;
pub mod sink;
pub mod source;
pub mod types;
pub mod ui;
pub mod ws;

pub use error::{Error, Result};
