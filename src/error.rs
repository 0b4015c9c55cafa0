//! Our error types for the R4875G1 driver.

use thiserror::Error;

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Custom error type for Huawei R4875G1 communications.
#[derive(Error, Debug)]
pub enum Error<E: embedded_can::Error> {
    /// The bus rejected or failed to transmit an outbound frame. Carries the
    /// bus-layer cause; `nb::Error::WouldBlock` means the transmit mailbox was
    /// busy. The driver never retries, that is left to the caller.
    #[error("CAN transmit failed")]
    TransmitFailure(nb::Error<E>),
    /// A status frame carried fewer data bytes than the documented layout.
    /// The frame is dropped; nothing in the device state changes.
    #[error("Status frame shorter than documented layout")]
    MalformedFrame,
    /// A setpoint was not finite, was negative, or fell outside the configured
    /// limits. Nothing is transmitted.
    #[error("Setpoint rejected")]
    InvalidSetpoint,
    /// The update interval must be a positive duration.
    #[error("Invalid update interval")]
    InvalidInterval,
}

impl<E: embedded_can::Error> From<nb::Error<E>> for Error<E> {
    fn from(err: nb::Error<E>) -> Self {
        Error::TransmitFailure(err)
    }
}
