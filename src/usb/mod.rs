//! USB Device subsystem - the transport the HID state reports through.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`.  We create a **composite device** with two HID
//! interfaces:
//!
//! - Interface 0: Keyboard (boot protocol)
//! - Interface 1: Mouse    (16-bit motion)
//!
//! The device being configured by the host plays the role of a report
//! subscription; every endpoint write is acknowledged back to the HID
//! state so it can pace the next report.

pub mod hid_device;
