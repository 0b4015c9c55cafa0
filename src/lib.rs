//! This crate provides an interface for monitoring and controlling the Huawei
//! R4875G1 rectifier module over a CAN bus.
//!
//! It supports `no-std` environments by use of the `no_std` feature flag.
//!
//! The driver is generic over any bus implementing [`embedded_can::nb::Can`],
//! so it works with socketcan adapters on Linux hosts as well as
//! microcontroller CAN peripherals. It decodes the module's periodic status
//! reports into named sensor channels (input/output voltage, current, power,
//! input frequency and temperature), applies optional per-channel linear
//! calibration, monitors calibrated voltages and currents against configured
//! limits, and encodes the voltage/current/enable/disable command frames.
//!
//! The module speaks a request/response protocol over 29-bit extended
//! identifiers with 8-byte payloads:
//! * Default bus bitrate: 125 kbit/s
//! * Status reports are solicited; the driver requests them once per update
//!   interval (1 second by default)
//! * Reported values use a fixed 1/1024 scale
//!
//! The driver owns no clock and spawns nothing. Feed it time through
//! [`rectifier::R4875g1::poll`] from whatever loop or task schedules your bus.

#![cfg_attr(feature = "no_std", no_std)]

pub mod channel;
pub mod error;
pub mod frame;
pub mod rectifier;

#[cfg(test)]
mod mock_can;
