//! Interface matcher
//!
//! Decides whether one alternate setting of one interface is a generic HID
//! interface whose top-level usage passes the filter. Acceptance yields a
//! claimed [`HidDevice`]; any rejection drops the partially acquired claim or
//! handle before returning.

use crate::descriptor::TopLevelUsage;
use crate::filter::DeviceFilter;
use crate::usb::device::{ClaimedInterface, HidDevice};
use crate::usb::host::{AltSetting, DeviceIdentity, HostDevice, HostHandle};
use rusb::{Direction, Recipient, RequestType};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Capacity of the report descriptor read buffer
pub const REPORT_DESCRIPTOR_CAPACITY: usize = 1024;

/// Timeout for the report descriptor read
pub const DESCRIPTOR_TIMEOUT: Duration = Duration::from_millis(1000);

/// Standard GET_DESCRIPTOR request
const REQUEST_GET_DESCRIPTOR: u8 = 0x06;

/// HID class descriptor type: Report
const DESCRIPTOR_TYPE_REPORT: u8 = 0x22;

/// Why an interface was skipped
#[derive(Debug, Error)]
pub enum Rejection {
    #[error("interface does not qualify: {0}")]
    InterfaceUnqualified(#[from] Unqualified),

    #[error("{step} failed: {source}")]
    Usb {
        step: &'static str,
        #[source]
        source: rusb::Error,
    },

    #[error("report descriptor declares no top-level usage ({0:?})")]
    DescriptorMalformed(TopLevelUsage),
}

/// Interface properties that rule it out as a raw HID device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Unqualified {
    #[error("not a generic HID interface (class {class:#04x}, subclass {subclass}, protocol {protocol})")]
    NotGenericHid { class: u8, subclass: u8, protocol: u8 },

    #[error("no IN endpoint")]
    NoInputEndpoint,

    #[error("usage {usage_page:#06x}:{usage:#06x} does not match filter")]
    UsageMismatch { usage_page: u32, usage: u32 },
}

impl Rejection {
    fn usb(step: &'static str) -> impl FnOnce(rusb::Error) -> Self {
        move |source| Self::Usb { step, source }
    }
}

/// Evaluate one alternate setting of `interface` on `device`
pub fn match_interface<D: HostDevice>(
    device: &D,
    identity: DeviceIdentity,
    interface: u8,
    setting: &AltSetting,
    filter: &DeviceFilter,
) -> Result<HidDevice<D::Handle>, Rejection> {
    if !setting.is_generic_hid() {
        return Err(Unqualified::NotGenericHid {
            class: setting.class,
            subclass: setting.subclass,
            protocol: setting.protocol,
        }
        .into());
    }

    let (input_endpoint, output_endpoint) = setting.first_endpoints();
    let input_endpoint = input_endpoint.ok_or(Unqualified::NoInputEndpoint)?;
    debug!(
        "Interface {}: IN endpoint {:#04x}, OUT endpoint {:?}",
        interface, input_endpoint, output_endpoint
    );

    let handle = device.open().map_err(Rejection::usb("open"))?;
    let claim = ClaimedInterface::claim(handle, interface).map_err(Rejection::usb("claim"))?;

    let descriptor = read_report_descriptor(claim.handle(), interface)
        .map_err(Rejection::usb("report descriptor read"))?;
    debug!(
        "Interface {}: report descriptor, {} bytes",
        interface,
        descriptor.len()
    );

    let top_level = TopLevelUsage::scan(&descriptor);
    let (usage_page, usage) = top_level
        .pair()
        .ok_or(Rejection::DescriptorMalformed(top_level))?;

    if !filter.matches_usage(usage_page, usage) {
        return Err(Unqualified::UsageMismatch { usage_page, usage }.into());
    }

    Ok(HidDevice::new(
        claim,
        identity,
        input_endpoint,
        output_endpoint,
    ))
}

/// Fetch the HID report descriptor of `interface`
pub fn read_report_descriptor<H: HostHandle>(
    handle: &H,
    interface: u8,
) -> Result<Vec<u8>, rusb::Error> {
    let mut buf = vec![0u8; REPORT_DESCRIPTOR_CAPACITY];
    let len = handle.read_control(
        rusb::request_type(Direction::In, RequestType::Standard, Recipient::Interface),
        REQUEST_GET_DESCRIPTOR,
        u16::from(DESCRIPTOR_TYPE_REPORT) << 8,
        u16::from(interface),
        &mut buf,
        DESCRIPTOR_TIMEOUT,
    )?;
    buf.truncate(len);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockDeviceSpec, MockHost, generic_hid_setting};
    use crate::usb::host::{CLASS_HID, UsbHost};

    fn run(spec: MockDeviceSpec, filter: &DeviceFilter) -> (MockHost, Result<(), Rejection>) {
        let host = MockHost::new(vec![spec]);
        let devices = host.devices().unwrap();
        let device = &devices[0];
        let identity = device.identity().unwrap();
        let layout = device.config_layout(0).unwrap();
        let interface = &layout.interfaces[0];

        let result = match_interface(
            device,
            identity,
            interface.number,
            &interface.alt_settings[0],
            filter,
        )
        .map(drop);
        (host, result)
    }

    #[test]
    fn test_accepts_raw_hid() {
        let host = MockHost::new(vec![MockDeviceSpec::raw_hid(0x16c0, 0x0480)]);
        let devices = host.devices().unwrap();
        let device = &devices[0];
        let identity = device.identity().unwrap();
        let setting = generic_hid_setting(vec![0x81, 0x02]);

        let filter = DeviceFilter::any().usage_page(0xFFAB).usage(0x0200);
        let hid = match_interface(device, identity, 0, &setting, &filter).unwrap();

        assert!(hid.is_open());
        assert_eq!(hid.input_endpoint(), 0x81);
        assert_eq!(hid.output_endpoint(), Some(0x02));
        assert_eq!(host.device(0).open_handles(), 1);
        assert_eq!(host.device(0).claimed(), vec![0]);
    }

    #[test]
    fn test_rejects_boot_keyboard_without_opening() {
        let mut spec = MockDeviceSpec::raw_hid(0x16c0, 0x0480);
        spec.set_setting(0, AltSetting {
            setting_number: 0,
            class: CLASS_HID,
            subclass: 1,
            protocol: 1,
            endpoints: vec![0x81],
        });
        let (host, result) = run(spec, &DeviceFilter::any());

        assert!(matches!(
            result,
            Err(Rejection::InterfaceUnqualified(Unqualified::NotGenericHid { .. }))
        ));
        assert_eq!(host.device(0).times_opened(), 0);
    }

    #[test]
    fn test_rejects_missing_in_endpoint() {
        let mut spec = MockDeviceSpec::raw_hid(0x16c0, 0x0480);
        spec.set_setting(0, generic_hid_setting(vec![0x02]));
        let (host, result) = run(spec, &DeviceFilter::any());

        assert!(matches!(
            result,
            Err(Rejection::InterfaceUnqualified(Unqualified::NoInputEndpoint))
        ));
        assert_eq!(host.device(0).times_opened(), 0);
    }

    #[test]
    fn test_truncated_descriptor_releases_everything() {
        let mut spec = MockDeviceSpec::raw_hid(0x16c0, 0x0480);
        spec.report_descriptors.insert(0, vec![0x05]);
        let (host, result) = run(spec, &DeviceFilter::any());

        assert!(matches!(result, Err(Rejection::DescriptorMalformed(_))));
        assert_eq!(host.device(0).times_opened(), 1);
        assert_eq!(host.device(0).open_handles(), 0);
        assert!(host.device(0).claimed().is_empty());
    }

    #[test]
    fn test_descriptor_read_failure_releases_everything() {
        let mut spec = MockDeviceSpec::raw_hid(0x16c0, 0x0480);
        spec.report_descriptors.clear();
        let (host, result) = run(spec, &DeviceFilter::any());

        assert!(matches!(
            result,
            Err(Rejection::Usb {
                step: "report descriptor read",
                ..
            })
        ));
        assert_eq!(host.device(0).open_handles(), 0);
        assert!(host.device(0).claimed().is_empty());
    }

    #[test]
    fn test_usage_mismatch_releases_everything() {
        let spec = MockDeviceSpec::raw_hid(0x16c0, 0x0480);
        let filter = DeviceFilter::any().usage_page(0x0001);
        let (host, result) = run(spec, &filter);

        assert!(matches!(
            result,
            Err(Rejection::InterfaceUnqualified(
                Unqualified::UsageMismatch {
                    usage_page: 0xFFAB,
                    usage: 0x0200
                }
            ))
        ));
        assert_eq!(host.device(0).open_handles(), 0);
        assert!(host.device(0).claimed().is_empty());
    }

    #[test]
    fn test_unqualified_reasons_share_one_variant() {
        let reasons = [
            Unqualified::NotGenericHid {
                class: CLASS_HID,
                subclass: 1,
                protocol: 2,
            },
            Unqualified::NoInputEndpoint,
            Unqualified::UsageMismatch {
                usage_page: 0x0001,
                usage: 0x0006,
            },
        ];

        for reason in reasons {
            let rejection = Rejection::from(reason);
            assert!(matches!(&rejection, Rejection::InterfaceUnqualified(r) if *r == reason));
            assert!(rejection.to_string().contains(&reason.to_string()));
        }
    }

    #[test]
    fn test_open_failure() {
        let mut spec = MockDeviceSpec::raw_hid(0x16c0, 0x0480);
        spec.open_fails = true;
        let (host, result) = run(spec, &DeviceFilter::any());

        assert!(matches!(result, Err(Rejection::Usb { step: "open", .. })));
        assert_eq!(host.device(0).open_handles(), 0);
    }

    #[test]
    fn test_claim_failure_closes_handle() {
        let mut spec = MockDeviceSpec::raw_hid(0x16c0, 0x0480);
        spec.claim_fails = true;
        let (host, result) = run(spec, &DeviceFilter::any());

        assert!(matches!(result, Err(Rejection::Usb { step: "claim", .. })));
        assert_eq!(host.device(0).open_handles(), 0);
    }

    #[test]
    fn test_descriptor_request_shape() {
        let host = MockHost::new(vec![MockDeviceSpec::raw_hid(0x16c0, 0x0480)]);
        let devices = host.devices().unwrap();
        let device = &devices[0];
        let handle = device.open().unwrap();

        let descriptor = read_report_descriptor(&handle, 0).unwrap();
        assert_eq!(TopLevelUsage::scan(&descriptor).pair(), Some((0xFFAB, 0x0200)));
        assert_eq!(host.device(0).descriptor_reads(), vec![(0x81, 0x06, 0x2200, 0)]);
    }
}
