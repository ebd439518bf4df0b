//! USB device manager
//!
//! Owns the libusb context and locates the three sub-devices of the
//! peripheral by vendor and product id.

use crate::config::KinectConfig;
use crate::error::{KinectError, Result};
use crate::session::SubDevices;
use crate::usb::device::UsbDevice;
use crate::usb::transfers::map_rusb_error;
use common::SubDeviceKind;
use protocol::VENDOR_ID;
use rusb::{Context, UsbContext};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// USB device manager
pub struct DeviceManager {
    /// USB context for device operations
    context: Context,
    /// Bulk read timeout handed to opened devices
    bulk_timeout: Duration,
}

impl DeviceManager {
    /// Create a new device manager
    ///
    /// Applies the configured libusb log level, if any.
    pub fn new(config: &KinectConfig) -> Result<Self> {
        let mut context = Context::new().map_err(map_rusb_error)?;

        if let Some(level) = &config.session.libusb_log_level {
            let level = crate::config::parse_libusb_log_level(level)
                .map_err(|e| KinectError::Config(e.to_string()))?;
            context.set_log_level(level);
        }

        Ok(Self {
            context,
            bulk_timeout: config.depth.bulk_timeout(),
        })
    }

    /// Get the USB context
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Find and open the camera, audio, and motor sub-devices
    ///
    /// The first match of each kind wins. A device that matches but cannot
    /// be opened fails discovery. Anything opened before a failure is closed
    /// again before returning.
    pub fn discover(&self) -> Result<SubDevices<UsbDevice>> {
        let devices = self.context.devices().map_err(map_rusb_error)?;
        let mut found: HashMap<SubDeviceKind, UsbDevice> = HashMap::new();

        for device in devices.iter() {
            let desc = match device.device_descriptor() {
                Ok(desc) => desc,
                Err(e) => {
                    debug!(
                        "Skipping device bus={}, addr={}: {}",
                        device.bus_number(),
                        device.address(),
                        e
                    );
                    continue;
                }
            };

            if desc.vendor_id() != VENDOR_ID {
                continue;
            }

            let Some(kind) = SubDeviceKind::from_product_id(desc.product_id()) else {
                debug!(
                    "Ignoring unknown product {:04x}:{:04x}",
                    desc.vendor_id(),
                    desc.product_id()
                );
                continue;
            };

            if found.contains_key(&kind) {
                warn!(
                    "Ignoring additional {} at bus={}, addr={}",
                    kind,
                    device.bus_number(),
                    device.address()
                );
                continue;
            }

            let opened = UsbDevice::open(device, kind, self.bulk_timeout)?;
            found.insert(kind, opened);
        }

        let mut take = |kind: SubDeviceKind| {
            found
                .remove(&kind)
                .ok_or(KinectError::DeviceNotFound(kind))
        };

        let camera = take(SubDeviceKind::Camera)?;
        let audio = take(SubDeviceKind::Audio)?;
        let motor = take(SubDeviceKind::Motor)?;

        info!(
            "Found camera at {}:{}, audio at {}:{}, motor at {}:{}",
            camera.bus_number(),
            camera.device_address(),
            audio.bus_number(),
            audio.device_address(),
            motor.bus_number(),
            motor.device_address()
        );

        Ok(SubDevices {
            camera,
            audio,
            motor,
        })
    }
}
