//! We use this mocking module in unit tests to emulate a CAN transceiver.

use embedded_can::{Frame, Id};

use crate::frame::STATUS_RESPONSE_ID;

/// Our mock frame type used with [`MockCan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFrame {
    id: Id,
    data: [u8; 8],
    dlc: usize,
    remote: bool,
}

impl Frame for MockFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > 8 {
            return None;
        }
        let mut buffer = [0u8; 8];
        buffer[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            data: buffer,
            dlc: data.len(),
            remote: false,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }
        Some(Self {
            id: id.into(),
            data: [0u8; 8],
            dlc,
            remote: true,
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        &self.data[..self.dlc]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCanError {
    /// Generic simulated bus error for testing.
    SimulatedError,
}

impl embedded_can::Error for MockCanError {
    fn kind(&self) -> embedded_can::ErrorKind {
        embedded_can::ErrorKind::Other
    }
}

/// Our mock type used to emulate a CAN transceiver.
pub struct MockCan {
    /// Frames transmitted through the mock, in order.
    tx_log: heapless::Vec<MockFrame, 32>,
    /// Frames queued for the driver to receive.
    rx_queue: heapless::Deque<MockFrame, 32>,
    /// Flag to simulate a full transmit mailbox.
    busy: bool,
    /// Flag to simulate transmit errors.
    should_error_on_transmit: bool,
    /// Flag to simulate receive errors.
    should_error_on_receive: bool,
}

impl embedded_can::nb::Can for MockCan {
    type Frame = MockFrame;
    type Error = MockCanError;

    fn transmit(&mut self, frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        if self.should_error_on_transmit {
            return Err(nb::Error::Other(MockCanError::SimulatedError));
        }
        if self.busy {
            return Err(nb::Error::WouldBlock);
        }
        self.tx_log
            .push(frame.clone())
            .map_err(|_| nb::Error::Other(MockCanError::SimulatedError))?;
        Ok(None)
    }

    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        if self.should_error_on_receive {
            return Err(nb::Error::Other(MockCanError::SimulatedError));
        }
        self.rx_queue.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl MockCan {
    /// Create a new MockCan instance with empty buffers.
    pub fn new() -> Self {
        Self {
            tx_log: heapless::Vec::new(),
            rx_queue: heapless::Deque::new(),
            busy: false,
            should_error_on_transmit: false,
            should_error_on_receive: false,
        }
    }

    /// Get the frames that were transmitted through this mock, in order.
    pub fn transmitted(&self) -> &[MockFrame] {
        &self.tx_log
    }

    /// Clear the transmit log.
    pub fn clear_transmitted(&mut self) {
        self.tx_log.clear();
    }

    /// Queue an arbitrary frame for the driver to receive.
    pub fn queue_frame(&mut self, frame: MockFrame) {
        self.rx_queue.push_back(frame).unwrap();
    }

    /// Queue a well-formed status report for the given parameter id and
    /// raw value word.
    pub fn queue_status(&mut self, parameter: u8, raw: u32) {
        let value = raw.to_be_bytes();
        let data = [
            0x01, parameter, 0x00, 0x00, value[0], value[1], value[2], value[3],
        ];
        self.queue_frame(MockFrame::new(STATUS_RESPONSE_ID, &data).unwrap());
    }

    /// Configure whether the transmit mailbox should report busy.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Configure whether transmit operations should fail with an error.
    pub fn set_transmit_error(&mut self, should_error: bool) {
        self.should_error_on_transmit = should_error;
    }

    /// Configure whether receive operations should fail with an error.
    pub fn set_receive_error(&mut self, should_error: bool) {
        self.should_error_on_receive = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_can::nb::Can;

    #[test]
    fn test_transmit_is_logged() {
        let mut mock = MockCan::new();
        let frame = MockFrame::new(STATUS_RESPONSE_ID, &[1, 2, 3, 4]).unwrap();

        let result = mock.transmit(&frame);
        assert!(result.is_ok());
        assert_eq!(mock.transmitted().len(), 1);
        assert_eq!(mock.transmitted()[0], frame);
    }

    #[test]
    fn test_busy_mailbox_would_block() {
        let mut mock = MockCan::new();
        mock.set_busy(true);

        let frame = MockFrame::new(STATUS_RESPONSE_ID, &[0u8; 8]).unwrap();
        let result = mock.transmit(&frame);
        assert!(matches!(result, Err(nb::Error::WouldBlock)));
        assert!(mock.transmitted().is_empty());
    }

    #[test]
    fn test_transmit_error_simulation() {
        let mut mock = MockCan::new();
        mock.set_transmit_error(true);

        let frame = MockFrame::new(STATUS_RESPONSE_ID, &[0u8; 8]).unwrap();
        let result = mock.transmit(&frame);
        assert!(matches!(
            result,
            Err(nb::Error::Other(MockCanError::SimulatedError))
        ));
    }

    #[test]
    fn test_receive_returns_queued_frames_in_order() {
        let mut mock = MockCan::new();
        mock.queue_status(0x75, 100);
        mock.queue_status(0x78, 200);

        let first = mock.receive().unwrap();
        assert_eq!(first.data()[1], 0x75);
        let second = mock.receive().unwrap();
        assert_eq!(second.data()[1], 0x78);

        let result = mock.receive();
        assert!(matches!(result, Err(nb::Error::WouldBlock)));
    }

    #[test]
    fn test_receive_error_simulation() {
        let mut mock = MockCan::new();
        mock.queue_status(0x75, 100);
        mock.set_receive_error(true);

        let result = mock.receive();
        assert!(matches!(
            result,
            Err(nb::Error::Other(MockCanError::SimulatedError))
        ));
    }

    #[test]
    fn test_queued_status_frame_layout() {
        let mut mock = MockCan::new();
        mock.queue_status(0x81, 0x01020304);

        let frame = mock.receive().unwrap();
        assert_eq!(frame.id(), Id::Extended(STATUS_RESPONSE_ID));
        assert!(frame.is_extended());
        assert_eq!(frame.dlc(), 8);
        assert_eq!(
            frame.data(),
            &[0x01, 0x81, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_clear_transmitted() {
        let mut mock = MockCan::new();
        let frame = MockFrame::new(STATUS_RESPONSE_ID, &[0u8; 8]).unwrap();
        mock.transmit(&frame).unwrap();
        assert!(!mock.transmitted().is_empty());

        mock.clear_transmitted();
        assert!(mock.transmitted().is_empty());
    }

    #[test]
    fn test_frame_rejects_oversize_payloads() {
        assert!(MockFrame::new(STATUS_RESPONSE_ID, &[0u8; 9]).is_none());
        assert!(MockFrame::new(STATUS_RESPONSE_ID, &[0u8; 8]).is_some());
    }
}
