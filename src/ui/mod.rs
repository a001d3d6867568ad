//! Interactive live-search session.
//!
//! - **[`session`]**: tick-driven controller owning query, flags and idle clock.
//! - **[`input`]**: idle clock and keystroke dispatch.
//! - **[`facets`]**: facet pagination.
//! - **[`perf`]**: parallel latency sampling and RSS reading.
//! - **[`data`]**: immutable render model handed to the view.
//! - **[`tui`]**: ratatui/crossterm view and terminal loop.

pub mod components;
pub mod data;
pub mod facets;
pub mod input;
pub mod perf;
pub mod session;
pub mod shortcuts;
pub mod tui;
