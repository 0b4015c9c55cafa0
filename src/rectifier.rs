use embedded_can::nb::Can;
use embedded_can::{ExtendedId, Frame, Id};
use fugit::{Duration, Instant};
use strum::EnumCount;

use crate::{
    channel::{Calibration, Channel, FaultFlags, Limits, Quantity, Reading},
    error::{Error, Result},
    frame,
};

/// All driver timekeeping is done in milliseconds.
pub type MillisDuration = Duration<u32, 1, 1000>;
pub type MillisInstant = Instant<u32, 1, 1000>;

/// Default status poll interval.
pub const DEFAULT_UPDATE_INTERVAL: MillisDuration = MillisDuration::secs(1);

/// A module that has not produced a status frame for this long is considered
/// offline.
pub const OFFLINE_TIMEOUT: MillisDuration = MillisDuration::secs(5);

/// You can create a R4875g1 using any bus which implements
/// [`embedded_can::nb::Can`].
///
/// The driver never reads a clock of its own. Call [`R4875g1::poll`] from your
/// main loop with the current time; it drains received frames and issues one
/// status request per update interval. Received frames can also be injected
/// directly with [`R4875g1::handle_frame`] when the bus delivers them through
/// a callback instead.
///
/// For its methods we use the nomenclature that "set" means to write a
/// configuration or issue a command, and "value"/"raw" mean to read back a
/// measured value.
pub struct R4875g1<C: Can> {
    bus: C,
    update_interval: MillisDuration,
    /// Last scheduler tick. `None` until the first `poll` call arms the timer.
    last_tick: Option<MillisInstant>,
    /// When the last well-formed status frame arrived.
    last_frame: Option<MillisInstant>,
    enabled: bool,
    calibrations: [Calibration; Channel::COUNT],
    voltage_limits: Option<Limits>,
    current_limits: Option<Limits>,
    readings: [Option<Reading>; Channel::COUNT],
    faults: FaultFlags,
}

impl<C: Can> R4875g1<C> {
    /// Create a new driver instance owning the given bus.
    ///
    /// All channels start with identity calibration and no reading; limits are
    /// unset and nothing is monitored until they are configured.
    pub fn new(bus: C) -> Self {
        Self {
            bus,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_tick: None,
            last_frame: None,
            enabled: false,
            calibrations: [Calibration::default(); Channel::COUNT],
            voltage_limits: None,
            current_limits: None,
            readings: [None; Channel::COUNT],
            faults: FaultFlags::new(),
        }
    }

    /// Destroy the driver and hand the bus back.
    pub fn release(self) -> C {
        self.bus
    }

    /// Set the status poll interval. Must be a positive duration.
    pub fn set_update_interval(&mut self, interval: MillisDuration) -> Result<(), C::Error> {
        if interval.ticks() == 0 {
            return Err(Error::InvalidInterval);
        }
        self.update_interval = interval;
        Ok(())
    }

    /// Set the calibration applied to one channel's raw values.
    pub fn set_calibration(&mut self, channel: Channel, calibration: Calibration) {
        self.calibrations[channel.index()] = calibration;
    }

    /// Set the input voltage calibration.
    pub fn set_input_voltage_calibration(&mut self, multiplier: f32, offset: f32) {
        self.set_calibration(Channel::InputVoltage, Calibration::new(multiplier, offset));
    }

    /// Set the output voltage calibration.
    pub fn set_output_voltage_calibration(&mut self, multiplier: f32, offset: f32) {
        self.set_calibration(Channel::OutputVoltage, Calibration::new(multiplier, offset));
    }

    /// Set the input current calibration.
    pub fn set_input_current_calibration(&mut self, multiplier: f32, offset: f32) {
        self.set_calibration(Channel::InputCurrent, Calibration::new(multiplier, offset));
    }

    /// Set the output current calibration.
    pub fn set_output_current_calibration(&mut self, multiplier: f32, offset: f32) {
        self.set_calibration(Channel::OutputCurrent, Calibration::new(multiplier, offset));
    }

    /// Set the bounds monitored on the voltage channels.
    ///
    /// Also constrains future [`R4875g1::set_voltage`] setpoints.
    pub fn set_voltage_limits(&mut self, min: f32, max: f32) {
        self.voltage_limits = Some(Limits::new(min, max));
    }

    /// Set the bounds monitored on the current channels.
    ///
    /// Also constrains future [`R4875g1::set_current`] setpoints.
    pub fn set_current_limits(&mut self, min: f32, max: f32) {
        self.current_limits = Some(Limits::new(min, max));
    }

    /// Command a new output voltage setpoint.
    ///
    /// The setpoint must be finite and non-negative, and within the configured
    /// voltage limits when limits are set. Rejected setpoints produce no bus
    /// traffic.
    pub fn set_voltage(&mut self, volts: f32) -> Result<(), C::Error> {
        validate_setpoint(volts, self.voltage_limits)?;
        self.send(frame::SET_COMMAND_ID, frame::voltage_setpoint_payload(volts))
    }

    /// Command a new output current setpoint. Same constraints as
    /// [`R4875g1::set_voltage`], against the current limits.
    pub fn set_current(&mut self, amps: f32) -> Result<(), C::Error> {
        validate_setpoint(amps, self.current_limits)?;
        self.send(frame::SET_COMMAND_ID, frame::current_setpoint_payload(amps))
    }

    /// Enable the rectifier output.
    pub fn enable(&mut self) -> Result<(), C::Error> {
        self.send(frame::SET_COMMAND_ID, frame::control_payload(true))?;
        self.enabled = true;
        Ok(())
    }

    /// Disable the rectifier output.
    pub fn disable(&mut self) -> Result<(), C::Error> {
        self.send(frame::SET_COMMAND_ID, frame::control_payload(false))?;
        self.enabled = false;
        Ok(())
    }

    /// Send one status request immediately, outside the poll schedule.
    pub fn request_status(&mut self) -> Result<(), C::Error> {
        self.send(frame::STATUS_REQUEST_ID, frame::status_request_payload())
    }

    /// Drain received frames, then issue a scheduled status request when the
    /// update interval has elapsed.
    ///
    /// The first call arms the schedule without firing. A late `poll` issues a
    /// single request and resets the schedule from `now`; missed ticks are
    /// skipped, never queued. Malformed and unrecognized frames are dropped
    /// here without failing the poll.
    pub fn poll(&mut self, now: MillisInstant) -> Result<(), C::Error> {
        loop {
            match self.bus.receive() {
                Ok(received) => {
                    if self.handle_frame(&received, now).is_err() {
                        log::debug!("dropped malformed status frame");
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(err)) => {
                    log::warn!("CAN receive error: {:?}", err);
                    break;
                }
            }
        }

        match self.last_tick {
            None => self.last_tick = Some(now),
            Some(last) => {
                let elapsed = now.checked_duration_since(last);
                if elapsed.is_some_and(|elapsed| elapsed >= self.update_interval) {
                    // Consume the tick before transmitting so a failed
                    // request is not retried until the next interval.
                    self.last_tick = Some(now);
                    self.request_status()?;
                }
            }
        }
        Ok(())
    }

    /// Process one received CAN frame.
    ///
    /// Frames that do not carry the status response identifier, and status
    /// frames with an untracked parameter id, are ignored. Returns the channel
    /// that was updated, if any.
    pub fn handle_frame(
        &mut self,
        received: &C::Frame,
        now: MillisInstant,
    ) -> Result<Option<Channel>, C::Error> {
        if received.id() != Id::Extended(frame::STATUS_RESPONSE_ID) {
            return Ok(None);
        }
        let data = received.data();
        if data.len() < frame::STATUS_FRAME_LEN {
            return Err(Error::MalformedFrame);
        }
        // Any well-formed status frame proves the module is alive, tracked
        // parameter or not.
        self.last_frame = Some(now);

        let Some(channel) = frame::channel_for_parameter(data[1]) else {
            log::trace!("unhandled parameter id 0x{:02X}", data[1]);
            return Ok(None);
        };
        let raw = frame::raw_value(data) as f32 / frame::VALUE_DIVISOR;
        let value = self.calibrations[channel.index()].apply(raw);
        self.readings[channel.index()] = Some(Reading { raw, value });
        self.check_limits(channel, value);
        Ok(Some(channel))
    }

    /// Return the last calibrated value for a channel, if one has arrived.
    pub fn value(&self, channel: Channel) -> Option<f32> {
        self.readings[channel.index()].map(|reading| reading.value)
    }

    /// Return the last raw (pre-calibration) value for a channel.
    pub fn raw(&self, channel: Channel) -> Option<f32> {
        self.readings[channel.index()].map(|reading| reading.raw)
    }

    /// Whether a channel's most recent value violated its limits.
    pub fn fault(&self, channel: Channel) -> bool {
        self.faults.channel(channel)
    }

    /// The full per-channel fault state.
    pub fn faults(&self) -> FaultFlags {
        self.faults
    }

    /// Whether the output was last commanded on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the module has produced a status frame within
    /// [`OFFLINE_TIMEOUT`].
    pub fn is_online(&self, now: MillisInstant) -> bool {
        self.last_frame.is_some_and(|last| {
            now.checked_duration_since(last)
                .is_some_and(|silence| silence < OFFLINE_TIMEOUT)
        })
    }

    /// Binary status output: the output is commanded on and the module is
    /// still reporting.
    pub fn status(&self, now: MillisInstant) -> bool {
        self.is_enabled() && self.is_online(now)
    }

    fn check_limits(&mut self, channel: Channel, value: f32) {
        let Some(quantity) = channel.monitored_quantity() else {
            return;
        };
        let limits = match quantity {
            Quantity::Voltage => self.voltage_limits,
            Quantity::Current => self.current_limits,
        };
        let Some(limits) = limits else {
            return;
        };
        let faulted = !limits.contains(value);
        if faulted && !self.faults.channel(channel) {
            log::warn!(
                "{:?} reading {} outside [{}, {}]",
                channel,
                value,
                limits.min,
                limits.max
            );
        }
        self.faults.set_channel(channel, faulted);
    }

    fn send(&mut self, id: ExtendedId, payload: [u8; 8]) -> Result<(), C::Error> {
        // An 8-byte payload always fits a classic CAN data frame.
        let outbound = C::Frame::new(id, &payload).unwrap();
        // A displaced lower-priority frame is not retransmitted.
        let _ = self.bus.transmit(&outbound)?;
        Ok(())
    }
}

fn validate_setpoint<E: embedded_can::Error>(
    value: f32,
    limits: Option<Limits>,
) -> Result<(), E> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidSetpoint);
    }
    if limits.is_some_and(|limits| !limits.contains(value)) {
        return Err(Error::InvalidSetpoint);
    }
    Ok(())
}
