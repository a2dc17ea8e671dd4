//! Debounced checking for text that is still being edited
//!
//! A [`LiveChecker`] receives every edit, waits for the input to settle and
//! then runs one check against whatever the input is at that moment. Results
//! are published through a [`tokio::sync::watch`] channel.

pub mod checker;

pub use checker::{LiveChecker, LivePhase, LiveResult};
