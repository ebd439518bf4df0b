//! USB sub-device abstraction
//!
//! This module wraps an opened rusb device as a [`SubDevice`], and provides
//! the bulk endpoint handed to the depth stream thread.

use crate::usb::transfers::{self, map_rusb_error};
use common::{BulkTransport, ControlTransport, SubDevice, SubDeviceKind};
use protocol::UsbError;
use rusb::{Context, Device, DeviceHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Opened USB sub-device
pub struct UsbDevice {
    /// Which part of the peripheral this is
    kind: SubDeviceKind,
    /// Underlying rusb device
    device: Device<Context>,
    /// Device handle, shared with the depth endpoint once one is opened
    handle: Option<Arc<DeviceHandle<Context>>>,
    /// Interfaces claimed by us
    claimed_interfaces: Vec<u8>,
    /// Interfaces whose kernel driver we detached
    detached_interfaces: Vec<u8>,
    /// Timeout of a single bulk read on endpoints opened from this device
    bulk_timeout: Duration,
}

impl UsbDevice {
    /// Open `device` for transfers
    pub fn open(
        device: Device<Context>,
        kind: SubDeviceKind,
        bulk_timeout: Duration,
    ) -> Result<Self, UsbError> {
        let handle = device.open().map_err(|e| {
            warn!("Failed to open {}: {}", kind, e);
            map_rusb_error(e)
        })?;

        debug!(
            "Opened {} at bus={}, addr={}",
            kind,
            device.bus_number(),
            device.address()
        );

        Ok(Self {
            kind,
            device,
            handle: Some(Arc::new(handle)),
            claimed_interfaces: Vec::new(),
            detached_interfaces: Vec::new(),
            bulk_timeout,
        })
    }

    /// Get the bus number
    pub fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    /// Get the device address
    pub fn device_address(&self) -> u8 {
        self.device.address()
    }

    /// Check if device is open
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn handle(&self) -> Result<&DeviceHandle<Context>, UsbError> {
        self.handle.as_deref().ok_or(UsbError::NoDevice)
    }
}

impl ControlTransport for UsbDevice {
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize, UsbError> {
        transfers::read_control(self.handle()?, request_type, request, value, index, buf)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, UsbError> {
        transfers::write_control(self.handle()?, request_type, request, value, index, data)
    }
}

impl SubDevice for UsbDevice {
    type Endpoint = DepthEndpoint;

    fn kind(&self) -> SubDeviceKind {
        self.kind
    }

    /// Claim `interface` and select `alt_setting`
    ///
    /// Detaches a bound kernel driver first. The returned endpoint shares the
    /// device handle, so only one endpoint may be open at a time.
    fn open_endpoint(
        &mut self,
        interface: u8,
        alt_setting: u8,
        endpoint: u8,
    ) -> Result<DepthEndpoint, UsbError> {
        let shared = self.handle.as_mut().ok_or(UsbError::NoDevice)?;
        let handle = Arc::get_mut(shared).ok_or(UsbError::Busy)?;

        match handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!(
                    "Detaching kernel driver from interface {} on {}",
                    interface, self.kind
                );
                match handle.detach_kernel_driver(interface) {
                    Ok(()) => self.detached_interfaces.push(interface),
                    Err(e) => warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    ),
                }
            }
            Ok(false) => {
                debug!("No kernel driver active on interface {}", interface);
            }
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }

        handle.claim_interface(interface).map_err(|e| {
            warn!("Failed to claim interface {}: {}", interface, e);
            map_rusb_error(e)
        })?;
        self.claimed_interfaces.push(interface);
        debug!("Claimed interface {} on {}", interface, self.kind);

        handle
            .set_alternate_setting(interface, alt_setting)
            .map_err(map_rusb_error)?;

        debug!(
            "Opened endpoint {:#04x} ({}/{}) on {}",
            endpoint, interface, alt_setting, self.kind
        );

        Ok(DepthEndpoint {
            handle: Arc::clone(shared),
            timeout: self.bulk_timeout,
        })
    }

    /// Release claimed interfaces, reattach kernel drivers, close the handle
    fn close(&mut self) {
        let Some(shared) = self.handle.take() else {
            return;
        };

        match Arc::try_unwrap(shared) {
            Ok(mut handle) => {
                for interface in &self.claimed_interfaces {
                    if let Err(e) = handle.release_interface(*interface) {
                        warn!("Failed to release interface {}: {}", interface, e);
                    }
                }

                for interface in &self.detached_interfaces {
                    if let Err(e) = handle.attach_kernel_driver(*interface) {
                        debug!(
                            "Could not reattach kernel driver to interface {}: {}",
                            interface, e
                        );
                    } else {
                        debug!(
                            "Reattached kernel driver to interface {} on {}",
                            interface, self.kind
                        );
                    }
                }
            }
            Err(_) => {
                warn!(
                    "{} handle still shared with an endpoint, closing on last release",
                    self.kind
                );
            }
        }

        self.claimed_interfaces.clear();
        self.detached_interfaces.clear();
        debug!("Closed {}", self.kind);
    }
}

impl Drop for UsbDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// Bulk IN endpoint owned by the depth stream thread
pub struct DepthEndpoint {
    handle: Arc<DeviceHandle<Context>>,
    timeout: Duration,
}

impl BulkTransport for DepthEndpoint {
    fn read_bulk(&self, endpoint: u8, buf: &mut [u8]) -> Result<usize, UsbError> {
        transfers::read_bulk(&self.handle, endpoint, buf, self.timeout)
    }
}
