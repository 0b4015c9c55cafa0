//! This module contains the sensor channels reported by the rectifier and the
//! per-channel calibration and limit types applied to them.

use modular_bitfield::prelude::*;
use strum_macros::{EnumCount as EnumCountMacro, EnumIter};

/// All sensor channels the R4875G1 reports in its status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCountMacro, EnumIter)]
pub enum Channel {
    /// AC input voltage in volts.
    InputVoltage,
    /// AC input current in amps.
    InputCurrent,
    /// AC input frequency in hertz.
    InputFrequency,
    /// DC output voltage in volts.
    OutputVoltage,
    /// DC output current in amps.
    OutputCurrent,
    /// DC output power in watts.
    OutputPower,
    /// Module temperature in degrees celsius.
    Temperature,
}

/// The two physical quantities that carry configurable limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Current,
}

impl Channel {
    /// Return which limit set monitors this channel, if any.
    ///
    /// Frequency, power and temperature channels are reported but not
    /// monitored.
    pub fn monitored_quantity(self) -> Option<Quantity> {
        match self {
            Channel::InputVoltage | Channel::OutputVoltage => Some(Quantity::Voltage),
            Channel::InputCurrent | Channel::OutputCurrent => Some(Quantity::Current),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Linear transform converting a raw reported value into physical units.
///
/// The identity transform (multiplier 1, offset 0) is the default for
/// channels without an explicit calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub multiplier: f32,
    pub offset: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            offset: 0.0,
        }
    }
}

impl Calibration {
    pub const fn new(multiplier: f32, offset: f32) -> Self {
        Self { multiplier, offset }
    }

    /// Apply this calibration to a raw value.
    #[inline]
    pub fn apply(&self, raw: f32) -> f32 {
        raw * self.multiplier + self.offset
    }
}

/// Inclusive [min, max] bounds for a monitored quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub min: f32,
    pub max: f32,
}

impl Limits {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether a value lies within bounds. Both bounds are inclusive.
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Last-known measurement for one channel.
///
/// `value` is always recomputed from `raw` on every frame, never accumulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Value as reported by the module, before calibration.
    pub raw: f32,
    /// Calibrated physical value.
    pub value: f32,
}

/// One fault bit per monitored channel.
///
/// A bit is set while the channel's most recent calibrated value lies outside
/// its configured limits, and clears on the next in-range reading. There is no
/// manual reset.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultFlags {
    pub input_voltage: bool,
    pub input_current: bool,
    pub output_voltage: bool,
    pub output_current: bool,
    #[skip]
    __: B4,
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultFlags {
    /// Whether any monitored channel is currently faulted.
    pub fn any(&self) -> bool {
        self.into_bytes()[0] != 0
    }

    /// Fault state of a single channel. Unmonitored channels never fault.
    pub fn channel(&self, channel: Channel) -> bool {
        match channel {
            Channel::InputVoltage => self.input_voltage(),
            Channel::InputCurrent => self.input_current(),
            Channel::OutputVoltage => self.output_voltage(),
            Channel::OutputCurrent => self.output_current(),
            _ => false,
        }
    }

    pub(crate) fn set_channel(&mut self, channel: Channel, faulted: bool) {
        match channel {
            Channel::InputVoltage => self.set_input_voltage(faulted),
            Channel::InputCurrent => self.set_input_current(faulted),
            Channel::OutputVoltage => self.set_output_voltage(faulted),
            Channel::OutputCurrent => self.set_output_current(faulted),
            _ => {}
        }
    }
}
