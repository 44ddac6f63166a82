//! USB subsystem
//!
//! This module handles:
//! - The host abstraction and its libusb implementation
//! - Interface matching (class check, endpoint pick, report descriptor)
//! - Enumeration bounded by a device count
//! - The registry of opened devices
//! - Interrupt and control transfers on opened devices
//!
//! Everything here is synchronous: each call blocks until its transfer
//! completes, fails or times out.

pub mod device;
pub mod enumerator;
pub mod host;
pub mod matcher;
pub mod registry;
pub mod rusb_host;
pub mod transfers;

pub use device::{ClaimedInterface, HidDevice};
pub use host::{
    AltSetting, ConfigLayout, DeviceIdentity, HandleOf, HostDevice, HostHandle, InterfaceLayout,
    UsbHost,
};
pub use matcher::{Rejection, Unqualified};
pub use registry::DeviceTable;
pub use rusb_host::RusbHost;
