#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Outbound I/O system that turns queued emitter messages into wire packets.
//!
//! Emitter operators only describe what they want to send. This system keeps
//! one queue per sink, flushes every queue once per frame and encodes the
//! result into [`Packet`]s. Delivering packets is left to a [`Transport`]
//! supplied by the adapter.

use std::net::Ipv4Addr;

use orca_core::{ControlRequest, Event, Message};
use thiserror::Error;
use tracing::{debug, info, warn};

mod cc;
mod midi;
mod osc;
mod udp;

pub use cc::DEFAULT_CC_OFFSET;
pub use midi::note_number;
pub use osc::{encode as encode_osc, OscPreset, DEFAULT_OSC_PORT};
pub use udp::{DEFAULT_UDP_INPUT, DEFAULT_UDP_OUTPUT};

/// Destination address used until another one is selected.
pub const DEFAULT_IP: &str = "127.0.0.1";

/// Lowest port accepted for OSC and UDP output.
const MIN_PORT: u16 = 1000;

/// Encoded unit of output ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    /// Raw MIDI bytes for the selected output device.
    Midi(Vec<u8>),
    /// Encoded OSC message for the OSC port.
    Osc(Vec<u8>),
    /// Datagram payload for the UDP output port.
    Udp(Vec<u8>),
}

/// Failures raised while configuring or delivering output.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No MIDI output device is selected.
    #[error("no midi output selected")]
    NoMidiOutput,
    /// The requested MIDI device index does not exist.
    #[error("unknown midi device {0}")]
    UnknownDevice(i32),
    /// The port is below the accepted range.
    #[error("unavailable port {0}")]
    InvalidPort(u16),
    /// The address is neither IPv4 nor a `.local` host.
    #[error("invalid ip {0}")]
    InvalidAddress(String),
    /// Socket failure reported by the operating system.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Delivery backend supplied by the adapter.
pub trait Transport {
    /// Sends raw bytes to the MIDI output device with the given index.
    fn send_midi(&mut self, device: usize, bytes: &[u8]) -> Result<(), TransportError>;

    /// Sends a datagram to `host:port`.
    fn send_datagram(&mut self, host: &str, port: u16, bytes: &[u8])
        -> Result<(), TransportError>;
}

/// Destinations and encoding settings of the I/O system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoConfig {
    ip: String,
    osc_port: u16,
    udp_output: u16,
    udp_input: u16,
    cc_offset: u8,
    midi_output: Option<usize>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_IP.to_owned(),
            osc_port: DEFAULT_OSC_PORT,
            udp_output: DEFAULT_UDP_OUTPUT,
            udp_input: DEFAULT_UDP_INPUT,
            cc_offset: DEFAULT_CC_OFFSET,
            midi_output: Some(0),
        }
    }
}

impl IoConfig {
    /// Replaces the destination address used for OSC and UDP.
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    /// Replaces the OSC output port.
    #[must_use]
    pub const fn with_osc_port(mut self, port: u16) -> Self {
        self.osc_port = port;
        self
    }

    /// Replaces the UDP output port.
    #[must_use]
    pub const fn with_udp_output(mut self, port: u16) -> Self {
        self.udp_output = port;
        self
    }

    /// Replaces the UDP input port.
    #[must_use]
    pub const fn with_udp_input(mut self, port: u16) -> Self {
        self.udp_input = port;
        self
    }

    /// Replaces the control change offset.
    #[must_use]
    pub const fn with_cc_offset(mut self, offset: u8) -> Self {
        self.cc_offset = offset;
        self
    }

    /// Replaces the MIDI output device index.
    #[must_use]
    pub const fn with_midi_output(mut self, device: Option<usize>) -> Self {
        self.midi_output = device;
        self
    }

    /// Destination address for OSC and UDP.
    #[must_use]
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// OSC output port.
    #[must_use]
    pub const fn osc_port(&self) -> u16 {
        self.osc_port
    }

    /// UDP output port.
    #[must_use]
    pub const fn udp_output(&self) -> u16 {
        self.udp_output
    }

    /// UDP port incoming commands are read from.
    #[must_use]
    pub const fn udp_input(&self) -> u16 {
        self.udp_input
    }

    /// Offset added to every control change index.
    #[must_use]
    pub const fn cc_offset(&self) -> u8 {
        self.cc_offset
    }

    /// Selected MIDI output device.
    #[must_use]
    pub const fn midi_output(&self) -> Option<usize> {
        self.midi_output
    }
}

/// Owns every outbound queue and encodes them into packets once per frame.
#[derive(Debug, Default)]
pub struct Io {
    config: IoConfig,
    midi_input: Option<usize>,
    poly: midi::PolySink,
    mono: midi::MonoSink,
    controls: cc::ControlSink,
    osc: osc::OscSink,
    udp: udp::UdpSink,
}

impl Io {
    /// Creates the I/O system with empty queues.
    #[must_use]
    pub fn new(config: IoConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current destinations and encoding settings.
    #[must_use]
    pub const fn config(&self) -> &IoConfig {
        &self.config
    }

    /// Selected MIDI input device.
    #[must_use]
    pub const fn midi_input(&self) -> Option<usize> {
        self.midi_input
    }

    /// Enqueues the messages carried by grid events.
    ///
    /// Messages emitted with `flush` set are delivered straight away by
    /// running their sink.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Packet>) {
        for event in events {
            if let Event::MessageQueued { message, flush } = event {
                self.push(message.clone(), *flush, out);
            }
        }
    }

    fn push(&mut self, message: Message, flush: bool, out: &mut Vec<Packet>) {
        match message {
            Message::Note(note) => {
                self.poly.push(note, out);
                if flush {
                    self.poly.run(out);
                }
            }
            Message::Mono(note) => {
                self.mono.push(note, out);
                if flush {
                    self.mono.run(out);
                }
            }
            Message::ControlChange { .. }
            | Message::PitchBend { .. }
            | Message::ProgramChange { .. } => {
                self.controls.push(message);
                if flush {
                    self.controls.run(self.config.cc_offset, out);
                }
            }
            Message::Osc { path, payload } => {
                self.osc.push(path, payload);
                if flush {
                    self.osc.run(out);
                }
            }
            Message::Udp { payload } => {
                self.udp.push(payload);
                if flush {
                    self.udp.run(out);
                }
            }
        }
    }

    /// Drops the one-shot queues before a new frame is computed.
    pub fn clear(&mut self) {
        self.controls.clear();
        self.osc.clear();
        self.udp.clear();
    }

    /// Flushes every sink once.
    pub fn run(&mut self, out: &mut Vec<Packet>) {
        self.poly.run(out);
        self.controls.run(self.config.cc_offset, out);
        self.mono.run(out);
        self.udp.run(out);
        self.osc.run(out);
    }

    /// Releases every held note.
    pub fn silence(&mut self, out: &mut Vec<Packet>) {
        self.poly.silence(out);
        self.mono.silence(out);
    }

    /// Applies a configuration request. Requests addressed to the clock are
    /// ignored.
    pub fn apply_control(
        &mut self,
        request: &ControlRequest,
        out: &mut Vec<Packet>,
    ) -> Result<(), TransportError> {
        match request {
            ControlRequest::SelectOscPort(port) => {
                self.config.osc_port = checked_port(*port, self.config.osc_port)?;
                info!(port = self.config.osc_port, "osc output selected");
            }
            ControlRequest::SelectUdpOutput(port) => {
                self.config.udp_output = checked_port(*port, self.config.udp_output)?;
                info!(port = self.config.udp_output, "udp output selected");
            }
            ControlRequest::SelectUdpInput(port) => {
                self.config.udp_input = *port;
                info!(port, "udp input selected");
            }
            ControlRequest::SelectMidiOutput(device) => {
                self.config.midi_output = device_index(*device)?;
                info!(device, "midi output selected");
            }
            ControlRequest::SelectMidiInput(device) => {
                self.midi_input = device_index(*device)?;
                info!(device, "midi input selected");
            }
            ControlRequest::SetIp(ip) => {
                if ip.parse::<Ipv4Addr>().is_err() && !ip.contains(".local") {
                    return Err(TransportError::InvalidAddress(ip.clone()));
                }
                self.config.ip = ip.clone();
                info!(ip = %self.config.ip, "target ip selected");
            }
            ControlRequest::SetCcOffset(offset) => {
                self.config.cc_offset = *offset;
                info!(offset, "cc offset selected");
            }
            ControlRequest::Send(message) => self.push(message.clone(), true, out),
            ControlRequest::Play | ControlRequest::Stop | ControlRequest::SetSpeed { .. } => {}
        }
        Ok(())
    }

    /// Delivers packets through the transport, logging and skipping any
    /// failure. Returns the number of packets delivered.
    pub fn dispatch(&self, packets: &[Packet], transport: &mut dyn Transport) -> usize {
        let mut delivered = 0;
        for packet in packets {
            let result = match packet {
                Packet::Midi(bytes) => match self.config.midi_output {
                    Some(device) => transport.send_midi(device, bytes),
                    None => Err(TransportError::NoMidiOutput),
                },
                Packet::Osc(bytes) => {
                    transport.send_datagram(&self.config.ip, self.config.osc_port, bytes)
                }
                Packet::Udp(bytes) => {
                    transport.send_datagram(&self.config.ip, self.config.udp_output, bytes)
                }
            };
            match result {
                Ok(()) => delivered += 1,
                Err(error) => warn!(%error, "packet dropped"),
            }
        }
        debug!(delivered, total = packets.len(), "packets dispatched");
        delivered
    }

    /// Number of items waiting in every queue.
    #[must_use]
    pub fn length(&self) -> usize {
        self.poly.len() + self.mono.len() + self.controls.len() + self.udp.len() + self.osc.len()
    }

    /// Renders one `|` per pending item, padded with `.` up to `width`.
    #[must_use]
    pub fn inspect(&self, width: usize) -> String {
        let pending = self.length();
        let mut text = "|".repeat(pending);
        text.extend(std::iter::repeat('.').take(width.saturating_sub(pending)));
        text
    }
}

fn checked_port(port: u16, current: u16) -> Result<u16, TransportError> {
    if port < MIN_PORT {
        return Err(TransportError::InvalidPort(port));
    }
    if port == current {
        debug!(port, "port already selected");
    }
    Ok(port)
}

fn device_index(device: i32) -> Result<Option<usize>, TransportError> {
    match device {
        -1 => Ok(None),
        index => usize::try_from(index)
            .map(Some)
            .map_err(|_| TransportError::UnknownDevice(index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_pads_pending_items() {
        let mut io = Io::new(IoConfig::default());
        let mut out = Vec::new();
        io.handle(
            &[Event::MessageQueued {
                message: Message::Udp {
                    payload: "hi".to_owned(),
                },
                flush: false,
            }],
            &mut out,
        );
        assert_eq!(io.length(), 1);
        assert_eq!(io.inspect(4), "|...");
        io.clear();
        assert_eq!(io.inspect(2), "..");
    }

    #[test]
    fn control_requests_validate_ports_and_addresses() {
        let mut io = Io::new(IoConfig::default());
        let mut out = Vec::new();
        assert!(io
            .apply_control(&ControlRequest::SelectOscPort(80), &mut out)
            .is_err());
        io.apply_control(&ControlRequest::SelectOscPort(OscPreset::SonicPi.port()), &mut out)
            .expect("port accepted");
        assert_eq!(io.config().osc_port(), 4559);

        assert!(io
            .apply_control(&ControlRequest::SetIp("not-an-ip".to_owned()), &mut out)
            .is_err());
        io.apply_control(&ControlRequest::SetIp("norns.local".to_owned()), &mut out)
            .expect("mdns host accepted");
        assert_eq!(io.config().ip(), "norns.local");

        io.apply_control(&ControlRequest::SelectMidiOutput(-1), &mut out)
            .expect("none accepted");
        assert_eq!(io.config().midi_output(), None);
        assert!(io
            .apply_control(&ControlRequest::SelectMidiOutput(-7), &mut out)
            .is_err());
    }
}
