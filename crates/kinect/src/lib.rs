//! Userspace driver for the Kinect sensor
//!
//! The peripheral enumerates as three USB sub-devices (camera, audio, motor)
//! under one vendor id. This crate brings the camera into depth streaming
//! mode, drives the tilt motor and LED, and pumps raw depth buffers on a
//! dedicated thread, signalling each arrival to the caller.
//!
//! # Example
//!
//! ```no_run
//! use kinect::{KinectConfig, KinectSession};
//!
//! let config = KinectConfig::load_or_default();
//! common::setup_logging(&config.session.log_level)?;
//!
//! let mut session = KinectSession::open(&config)?;
//! session.set_angle(15)?;
//! let frame = session.wait_for_depth_frame()?;
//! println!("frame {} ({} bytes)", frame.sequence, frame.len);
//! session.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Everything above the transport is generic over [`common::SubDevice`], so
//! sessions can be bound to test doubles with [`KinectSession::bind`].

pub mod command;
pub mod config;
pub mod depth_init;
pub mod error;
pub mod motor;
pub mod session;
pub mod stream;
pub mod usb;

pub use command::CommandTransport;
pub use config::KinectConfig;
pub use depth_init::{DEPTH_INIT_SEQUENCE, initialize_depth};
pub use error::{KinectError, Result};
pub use motor::{LedColor, MotorController, MotorStatusSample};
pub use session::{KinectSession, SubDevices};
pub use stream::{DepthStreamHandle, spawn_depth_stream};
