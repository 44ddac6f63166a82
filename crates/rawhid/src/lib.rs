//! Raw HID over USB
//!
//! Finds generic HID interfaces (HID class, no boot protocol) by vendor id,
//! product id and the top-level usage declared in their report descriptor,
//! claims them, and exchanges fixed-size packets over their interrupt
//! endpoints.
//!
//! # Example
//!
//! ```no_run
//! use rawhid::{DeviceFilter, RawHid};
//! use std::time::Duration;
//!
//! # fn main() -> rawhid::Result<()> {
//! let mut hid = RawHid::system()?;
//! let filter = DeviceFilter::any()
//!     .vendor(0x16C0)
//!     .product(0x0480)
//!     .usage_page(0xFFAB)
//!     .usage(0x0200);
//!
//! if hid.open(1, &filter)? == 1 {
//!     let mut buf = [0u8; 64];
//!     let n = hid.recv(0, &mut buf, Duration::from_millis(220))?;
//!     println!("received {} bytes", n);
//! }
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod error;
pub mod filter;
pub mod hid;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod usb;

pub use descriptor::{Item, ItemCursor, TopLevelUsage};
pub use error::{RawHidError, Result};
pub use filter::DeviceFilter;
pub use hid::RawHid;
pub use usb::{DeviceTable, HidDevice, RusbHost};
