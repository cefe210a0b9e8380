#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure command-dispatch system for `name:value` messages.
//!
//! Messages arrive from the `$` operator through
//! [`Event::CommandRequested`] or from the UDP listener run by the adapter.
//! The commander never touches the grid or the clock directly: it answers
//! with grid [`Command`]s, applied by the driver once the current tick has
//! finished, and [`ControlRequest`]s addressed to the clock and the I/O
//! system.

use orca_core::{Command, ControlRequest, Event, Message, Position};
use thiserror::Error;
use tracing::{debug, warn};

mod param;

pub use param::Param;

/// Highest MIDI channel index.
const MAX_CHANNEL: i64 = 15;

/// Highest MIDI data byte.
const MAX_DATA: i64 = 127;

/// Failures raised while interpreting a command message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The message names no known command.
    #[error("unknown message `{0}`")]
    Unknown(String),
    /// The command needs an argument the value does not provide.
    #[error("`{command}` expects a number, got `{value}`")]
    MissingValue {
        /// Canonical command name.
        command: &'static str,
        /// Value the command received.
        value: String,
    },
    /// A numeric argument does not fit the field it configures.
    #[error("`{command}` cannot use {value}")]
    OutOfRange {
        /// Canonical command name.
        command: &'static str,
        /// Rejected argument.
        value: i64,
    },
}

/// Clock state commands are evaluated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Frame counter after the current tick.
    pub frame: u64,
    /// Current tempo in beats per minute.
    pub bpm: u32,
}

impl Timing {
    /// Creates a timing snapshot.
    #[must_use]
    pub const fn new(frame: u64, bpm: u32) -> Self {
        Self { frame, bpm }
    }

    /// Elapsed play time rendered as `mmss`, four frames per beat.
    #[must_use]
    pub fn elapsed(&self) -> String {
        let beat = 60.0 / f64::from(self.bpm.max(1));
        #[allow(clippy::cast_precision_loss)]
        let millis = 250.0 * (self.frame as f64 * beat);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = (millis / 1000.0).floor() as u64;
        format!("{:02}{:02}", (seconds / 60) % 60, seconds % 60)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Verb {
    Play,
    Stop,
    Run,
    Bpm,
    Apm,
    Frame,
    Rewind,
    Skip,
    Time,
    Write,
    Osc,
    Udp,
    Midi,
    Ip,
    Cc,
    Pg,
}

const VERBS: [(&str, Verb); 16] = [
    ("play", Verb::Play),
    ("stop", Verb::Stop),
    ("run", Verb::Run),
    ("bpm", Verb::Bpm),
    ("apm", Verb::Apm),
    ("frame", Verb::Frame),
    ("rewind", Verb::Rewind),
    ("skip", Verb::Skip),
    ("time", Verb::Time),
    ("write", Verb::Write),
    ("osc", Verb::Osc),
    ("udp", Verb::Udp),
    ("midi", Verb::Midi),
    ("ip", Verb::Ip),
    ("cc", Verb::Cc),
    ("pg", Verb::Pg),
];

impl Verb {
    /// Resolves a full name or its two-letter shorthand.
    fn lookup(name: &str) -> Option<(&'static str, Self)> {
        VERBS
            .iter()
            .copied()
            .find(|(full, _)| *full == name || (name.len() == 2 && full.starts_with(name)))
    }
}

/// Splits a message into its normalised command name and raw value.
///
/// The name is the text before the first `:`, trimmed, stripped of
/// non-word characters and lower-cased. The value starts one character past
/// the length of that name.
#[must_use]
pub fn split_message(message: &str) -> (String, &str) {
    let head = message.split(':').next().unwrap_or_default();
    let name: String = head
        .trim()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_')
        .flat_map(char::to_lowercase)
        .collect();
    let value = message
        .char_indices()
        .nth(name.chars().count() + 1)
        .map_or("", |(start, _)| &message[start..]);
    (name, value)
}

/// Command dispatcher keeping the history of accepted messages.
#[derive(Debug, Default, Clone)]
pub struct Commander {
    history: Vec<String>,
}

impl Commander {
    /// Creates a commander with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    /// Accepted messages, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Dispatches every command requested by the grid during the last tick.
    ///
    /// Rejected messages are logged and skipped.
    pub fn handle(
        &mut self,
        events: &[Event],
        timing: Timing,
        commands: &mut Vec<Command>,
        requests: &mut Vec<ControlRequest>,
    ) {
        for event in events {
            if let Event::CommandRequested { message, origin } = event {
                if let Err(error) = self.trigger(message, *origin, timing, commands, requests) {
                    warn!(%error, "command rejected");
                }
            }
        }
    }

    /// Interprets a single message.
    ///
    /// `origin` anchors commands that write into the grid; without one they
    /// write at the top-left corner.
    pub fn trigger(
        &mut self,
        message: &str,
        origin: Option<Position>,
        timing: Timing,
        commands: &mut Vec<Command>,
        requests: &mut Vec<ControlRequest>,
    ) -> Result<(), CommandError> {
        let (name, value) = split_message(message);
        let (verb_name, verb) =
            Verb::lookup(&name).ok_or_else(|| CommandError::Unknown(message.to_owned()))?;
        let param = Param::parse(value);
        debug!(command = verb_name, value, "command received");

        let needs_int = |param: &Param| {
            param.int().ok_or_else(|| CommandError::MissingValue {
                command: verb_name,
                value: param.text().to_owned(),
            })
        };

        match verb {
            Verb::Play => requests.push(ControlRequest::Play),
            Verb::Stop => requests.push(ControlRequest::Stop),
            Verb::Run => commands.push(Command::Tick),
            Verb::Bpm => {
                let bpm = to_unsigned(verb_name, needs_int(&param)?)?;
                requests.push(ControlRequest::SetSpeed {
                    value: Some(bpm),
                    target: Some(bpm),
                });
            }
            Verb::Apm => {
                let bpm = to_unsigned(verb_name, needs_int(&param)?)?;
                requests.push(ControlRequest::SetSpeed {
                    value: None,
                    target: Some(bpm),
                });
            }
            Verb::Frame => commands.push(Command::SetFrame {
                frame: needs_int(&param)?,
            }),
            Verb::Rewind | Verb::Skip => {
                let step = needs_int(&param)?;
                let current = i64::try_from(timing.frame).unwrap_or(i64::MAX);
                let frame = if verb == Verb::Rewind {
                    current.saturating_sub(step)
                } else {
                    current.saturating_add(step)
                };
                commands.push(Command::SetFrame { frame });
            }
            Verb::Time => commands.push(Command::WriteBlock {
                origin: origin.unwrap_or(Position::new(0, 0)),
                block: timing.elapsed(),
                overlap: false,
            }),
            Verb::Write => {
                let x = param.anchored_x().unwrap_or(0);
                let y = param.anchored_y().unwrap_or(0);
                commands.push(Command::WriteBlock {
                    origin: Position::new(to_coordinate(verb_name, x)?, to_coordinate(verb_name, y)?),
                    block: param.anchored_text().to_owned(),
                    overlap: false,
                });
            }
            Verb::Osc => requests.push(ControlRequest::SelectOscPort(to_port(
                verb_name,
                needs_int(&param)?,
            )?)),
            Verb::Udp => {
                let output = param.x().ok_or_else(|| CommandError::MissingValue {
                    command: verb_name,
                    value: param.text().to_owned(),
                })?;
                requests.push(ControlRequest::SelectUdpOutput(to_port(verb_name, output)?));
                if let Some(input) = param.y() {
                    requests.push(ControlRequest::SelectUdpInput(to_port(verb_name, input)?));
                }
            }
            Verb::Midi => {
                let output = param.x().ok_or_else(|| CommandError::MissingValue {
                    command: verb_name,
                    value: param.text().to_owned(),
                })?;
                requests.push(ControlRequest::SelectMidiOutput(to_device(
                    verb_name, output,
                )?));
                if let Some(input) = param.y() {
                    requests.push(ControlRequest::SelectMidiInput(to_device(verb_name, input)?));
                }
            }
            Verb::Ip => requests.push(ControlRequest::SetIp(param.text().to_owned())),
            Verb::Cc => {
                let offset = needs_int(&param)?;
                let offset =
                    u8::try_from(offset).map_err(|_| CommandError::OutOfRange {
                        command: verb_name,
                        value: offset,
                    })?;
                requests.push(ControlRequest::SetCcOffset(offset));
            }
            Verb::Pg => {
                let channel = param.int_at(0).ok_or_else(|| CommandError::MissingValue {
                    command: verb_name,
                    value: param.text().to_owned(),
                })?;
                requests.push(ControlRequest::Send(Message::ProgramChange {
                    channel: clamp_byte(channel, MAX_CHANNEL),
                    bank: param.int_at(1).map(|bank| clamp_byte(bank, MAX_DATA)),
                    sub: param.int_at(2).map(|sub| clamp_byte(sub, MAX_DATA)),
                    program: param.int_at(3).map(|program| clamp_byte(program, MAX_DATA)),
                }));
            }
        }

        self.history.push(message.to_owned());
        Ok(())
    }
}

fn to_unsigned(command: &'static str, value: i64) -> Result<u32, CommandError> {
    u32::try_from(value).map_err(|_| CommandError::OutOfRange { command, value })
}

fn to_port(command: &'static str, value: i64) -> Result<u16, CommandError> {
    u16::try_from(value).map_err(|_| CommandError::OutOfRange { command, value })
}

fn to_device(command: &'static str, value: i64) -> Result<i32, CommandError> {
    i32::try_from(value).map_err(|_| CommandError::OutOfRange { command, value })
}

fn to_coordinate(command: &'static str, value: i64) -> Result<i32, CommandError> {
    i32::try_from(value).map_err(|_| CommandError::OutOfRange { command, value })
}

fn clamp_byte(value: i64, max: i64) -> u8 {
    u8::try_from(value.clamp(0, max)).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalised() {
        assert_eq!(split_message("BPM:140"), ("bpm".to_owned(), "140"));
        assert_eq!(split_message(" b-pm:90"), ("bpm".to_owned(), "m:90"));
        assert_eq!(split_message("play"), ("play".to_owned(), ""));
        assert_eq!(split_message("write:hi;1;2"), ("write".to_owned(), "hi;1;2"));
    }

    #[test]
    fn shorthands_resolve_to_full_names() {
        assert_eq!(Verb::lookup("bp"), Some(("bpm", Verb::Bpm)));
        assert_eq!(Verb::lookup("re"), Some(("rewind", Verb::Rewind)));
        assert_eq!(Verb::lookup("wr"), Some(("write", Verb::Write)));
        assert_eq!(Verb::lookup("ip"), Some(("ip", Verb::Ip)));
        assert_eq!(Verb::lookup("pla"), None);
        assert_eq!(Verb::lookup("color"), None);
    }

    #[test]
    fn elapsed_time_counts_quarter_beats() {
        assert_eq!(Timing::new(0, 120).elapsed(), "0000");
        assert_eq!(Timing::new(8, 120).elapsed(), "0001");
        assert_eq!(Timing::new(480, 120).elapsed(), "0100");
        assert_eq!(Timing::new(1, 60).elapsed(), "0000");
    }
}
