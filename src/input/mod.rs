//! Board input drivers feeding the HID state.
//!
//! - **Buttons**: tactile switches on GPIO, debounced, reported by key id

pub mod buttons;
