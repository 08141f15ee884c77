//! State Module - the reactive store
//!
//! - **Signal** - JSON values with path-level read tracking and change broadcast
//! - **Tracking** - render frames, read sets, instance-local signal slots

mod signal;
pub mod tracking;

pub use signal::*;
pub use tracking::{SignalAccess, current_address, is_rendering};
