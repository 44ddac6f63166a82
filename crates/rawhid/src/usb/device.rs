//! Opened HID interfaces
//!
//! [`ClaimedInterface`] ties a claimed interface to the handle it was claimed
//! on. Dropping it releases the interface, hands the interface back to the
//! kernel driver if we detached one, and closes the handle, so every exit
//! path of the matcher cleans up the same way.

use crate::usb::host::{DeviceIdentity, HostHandle};
use tracing::{debug, warn};

/// An interface claimed on an open handle
pub struct ClaimedInterface<H: HostHandle> {
    handle: H,
    interface: u8,
    driver_detached: bool,
}

impl<H: HostHandle> ClaimedInterface<H> {
    /// Detach any kernel driver and claim `interface`
    ///
    /// On failure the handle is dropped (closed) and the driver re-attached
    /// if it had been detached.
    pub fn claim(handle: H, interface: u8) -> Result<Self, rusb::Error> {
        let mut driver_detached = false;

        match handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                handle.detach_kernel_driver(interface)?;
                driver_detached = true;
            }
            Ok(false) => {}
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }

        if let Err(e) = handle.claim_interface(interface) {
            if driver_detached {
                reattach(&handle, interface);
            }
            return Err(e);
        }

        debug!("Claimed interface {}", interface);
        Ok(Self {
            handle,
            interface,
            driver_detached,
        })
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }
}

impl<H: HostHandle> Drop for ClaimedInterface<H> {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            warn!("Failed to release interface {}: {}", self.interface, e);
        }
        if self.driver_detached {
            reattach(&self.handle, self.interface);
        }
        debug!("Released interface {}", self.interface);
    }
}

fn reattach<H: HostHandle>(handle: &H, interface: u8) {
    if let Err(e) = handle.attach_kernel_driver(interface) {
        debug!(
            "Could not reattach kernel driver to interface {}: {}",
            interface, e
        );
    }
}

/// A claimed generic HID interface with its endpoint pair
pub struct HidDevice<H: HostHandle> {
    claim: Option<ClaimedInterface<H>>,
    identity: DeviceIdentity,
    interface: u8,
    input_endpoint: u8,
    output_endpoint: Option<u8>,
}

impl<H: HostHandle> HidDevice<H> {
    /// Wrap a claimed interface. `input_endpoint` is a full IN address.
    pub fn new(
        claim: ClaimedInterface<H>,
        identity: DeviceIdentity,
        input_endpoint: u8,
        output_endpoint: Option<u8>,
    ) -> Self {
        let interface = claim.interface();
        Self {
            claim: Some(claim),
            identity,
            interface,
            input_endpoint,
            output_endpoint,
        }
    }

    pub fn is_open(&self) -> bool {
        self.claim.is_some()
    }

    /// Release the interface and close the handle. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.claim.take().is_some() {
            debug!(
                "Closed {:04x}:{:04x} interface {}",
                self.identity.vendor_id, self.identity.product_id, self.interface
            );
        }
    }

    /// The open handle, or `None` once closed
    pub fn handle(&self) -> Option<&H> {
        self.claim.as_ref().map(ClaimedInterface::handle)
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn input_endpoint(&self) -> u8 {
        self.input_endpoint
    }

    pub fn output_endpoint(&self) -> Option<u8> {
        self.output_endpoint
    }
}
