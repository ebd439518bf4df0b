//! Test utilities for rust-kinect
//!
//! Provides scripted stand-ins for the USB sub-devices so the protocol logic
//! can be exercised without hardware.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{MockDevice, MockReply};
//! use common::{ControlTransport, SubDeviceKind};
//!
//! let motor = MockDevice::new(SubDeviceKind::Motor);
//! motor.queue_read(0xC0, 0x10, MockReply::Data(vec![0x22]));
//!
//! let mut buf = [0u8; 1];
//! assert_eq!(motor.read_control(0xC0, 0x10, 0, 0, &mut buf).unwrap(), 1);
//! assert_eq!(buf[0], 0x22);
//! assert_eq!(motor.calls().len(), 1);
//! ```

use crate::usb_types::{BulkTransport, ControlTransport, SubDevice, SubDeviceKind};
use protocol::UsbError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared, ordered record of lifecycle events across mock devices
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        lock(&self.0).push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        lock(&self.0).clone()
    }
}

/// Scripted result of a control read
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Copy these bytes into the caller's buffer (truncated to fit)
    Data(Vec<u8>),
    /// Fail the transfer
    Error(UsbError),
}

/// A recorded control transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCall {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    /// Payload for OUT transfers, empty for IN transfers
    pub data: Vec<u8>,
}

impl ControlCall {
    pub fn is_in(&self) -> bool {
        (self.request_type & 0x80) != 0
    }
}

#[derive(Default)]
struct DeviceState {
    calls: Vec<ControlCall>,
    reads: HashMap<(u8, u8), VecDeque<MockReply>>,
    default_reads: HashMap<(u8, u8), MockReply>,
    write_failures: HashMap<(u8, u8), VecDeque<UsbError>>,
    endpoint: Option<MockEndpoint>,
    endpoint_error: Option<UsbError>,
    close_count: usize,
}

/// Scripted sub-device
///
/// Clones share state, so a test can keep one clone for inspection after
/// handing the other to the code under test.
///
/// Control reads pop replies queued for their `(request_type, request)` pair.
/// Once that queue is empty the default reply is used, or a zero-length read
/// when there is none. Control writes succeed unless a failure is queued.
#[derive(Clone)]
pub struct MockDevice {
    kind: SubDeviceKind,
    state: Arc<Mutex<DeviceState>>,
    log: EventLog,
}

impl MockDevice {
    pub fn new(kind: SubDeviceKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(DeviceState::default())),
            log: EventLog::new(),
        }
    }

    /// Record lifecycle events (close, endpoint open) into `log`
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    /// Queue one reply for reads of `(request_type, request)`
    pub fn queue_read(&self, request_type: u8, request: u8, reply: MockReply) {
        lock(&self.state)
            .reads
            .entry((request_type, request))
            .or_default()
            .push_back(reply);
    }

    /// Reply used once the queue for `(request_type, request)` is drained
    pub fn set_default_read(&self, request_type: u8, request: u8, reply: MockReply) {
        lock(&self.state)
            .default_reads
            .insert((request_type, request), reply);
    }

    /// Fail the next write of `(request_type, request)`
    pub fn fail_next_write(&self, request_type: u8, request: u8, error: UsbError) {
        lock(&self.state)
            .write_failures
            .entry((request_type, request))
            .or_default()
            .push_back(error);
    }

    /// Endpoint returned by [`SubDevice::open_endpoint`]
    pub fn set_endpoint(&self, endpoint: MockEndpoint) {
        lock(&self.state).endpoint = Some(endpoint);
    }

    /// Make [`SubDevice::open_endpoint`] fail
    pub fn fail_endpoint(&self, error: UsbError) {
        lock(&self.state).endpoint_error = Some(error);
    }

    /// Every control transfer issued so far, in order
    pub fn calls(&self) -> Vec<ControlCall> {
        lock(&self.state).calls.clone()
    }

    /// Control transfers matching `(request_type, request)`
    pub fn calls_for(&self, request_type: u8, request: u8) -> Vec<ControlCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.request_type == request_type && c.request == request)
            .collect()
    }

    /// Number of times [`SubDevice::close`] released the device
    pub fn close_count(&self) -> usize {
        lock(&self.state).close_count
    }
}

impl ControlTransport for MockDevice {
    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize, UsbError> {
        let mut state = lock(&self.state);
        state.calls.push(ControlCall {
            request_type,
            request,
            value,
            index,
            data: Vec::new(),
        });

        let key = (request_type, request);
        let queued = state.reads.get_mut(&key).and_then(|q| q.pop_front());
        let reply = queued.or_else(|| state.default_reads.get(&key).cloned());

        match reply {
            Some(MockReply::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(MockReply::Error(e)) => Err(e),
            None => Ok(0),
        }
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, UsbError> {
        let mut state = lock(&self.state);
        state.calls.push(ControlCall {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        });

        match state
            .write_failures
            .get_mut(&(request_type, request))
            .and_then(|q| q.pop_front())
        {
            Some(error) => Err(error),
            None => Ok(data.len()),
        }
    }
}

impl SubDevice for MockDevice {
    type Endpoint = MockEndpoint;

    fn kind(&self) -> SubDeviceKind {
        self.kind
    }

    fn open_endpoint(
        &mut self,
        interface: u8,
        alt_setting: u8,
        endpoint: u8,
    ) -> Result<MockEndpoint, UsbError> {
        let state = lock(&self.state);
        if let Some(error) = state.endpoint_error.clone() {
            return Err(error);
        }
        self.log.push(format!(
            "open endpoint {}/{}/{:#04x} on {}",
            interface, alt_setting, endpoint, self.kind
        ));
        Ok(state.endpoint.clone().unwrap_or_default())
    }

    fn close(&mut self) {
        let mut state = lock(&self.state);
        if state.close_count == 0 {
            self.log.push(format!("close {}", self.kind));
        }
        state.close_count += 1;
    }
}

#[derive(Default)]
struct EndpointState {
    script: VecDeque<Result<usize, UsbError>>,
    default: Option<Result<usize, UsbError>>,
    reads: usize,
}

/// Scripted bulk endpoint
///
/// Reads pop the scripted results in order, then repeat the default (a
/// zero-length read when none is set). Successful reads fill the buffer with
/// the low byte of the read counter.
#[derive(Clone, Default)]
pub struct MockEndpoint {
    state: Arc<Mutex<EndpointState>>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, result: Result<usize, UsbError>) {
        lock(&self.state).script.push_back(result);
    }

    pub fn set_default(&self, result: Result<usize, UsbError>) {
        lock(&self.state).default = Some(result);
    }

    /// Number of bulk reads issued so far
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }
}

impl BulkTransport for MockEndpoint {
    fn read_bulk(&self, _endpoint: u8, buf: &mut [u8]) -> Result<usize, UsbError> {
        let mut state = lock(&self.state);
        state.reads += 1;
        let fill = state.reads as u8;

        let result = match state.script.pop_front() {
            Some(result) => result,
            None => state.default.clone().unwrap_or(Ok(0)),
        };

        result.map(|n| {
            let n = n.min(buf.len());
            buf[..n].fill(fill);
            n
        })
    }
}

/// Build a camera response frame acknowledging with `values`
pub fn camera_reply(values: &[u16]) -> Vec<u8> {
    let header = protocol::ControlHeader {
        magic: protocol::FRAME_MAGIC,
        words: values.len() as u16,
        command: protocol::ControlCommand::SetParameter as u16,
        tag: 0,
    };
    let mut bytes = header.to_bytes().to_vec();
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Build a 10-byte motor status sample
pub fn motor_sample(strain: u8, moving: u8, status: u8) -> Vec<u8> {
    let mut sample = vec![0u8; 10];
    sample[1] = strain;
    sample[8] = moving;
    sample[9] = status;
    sample
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not hide the recorded state from the others
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
