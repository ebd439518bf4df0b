//! USB subsystem
//!
//! rusb-backed implementation of the sub-device transport:
//! - Device discovery by vendor and product id
//! - Control and bulk transfer execution
//! - Interface claiming and kernel driver handling

pub mod device;
pub mod manager;
pub mod transfers;

// Re-export public types
pub use device::{DepthEndpoint, UsbDevice};
pub use manager::DeviceManager;
