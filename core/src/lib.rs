#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the orca engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative grid, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the grid executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to. Systems consume event streams and respond exclusively with new
//! command batches or [`ControlRequest`]s for the frame driver.

use serde::{Deserialize, Serialize};

pub mod glyph;

/// Upper bound applied whenever the frame counter is set explicitly.
pub const MAX_FRAME: u64 = 9_999_999;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Coordinates are signed so that port offsets may point outside the grid;
/// such reads resolve to the empty glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: i32,
    y: i32,
}

impl Position {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the cell displaced by the provided offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Commands that express all permissible grid mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Reinitialises the grid to a blank buffer and rewinds the frame counter.
    Reset {
        /// Number of columns in the new grid.
        width: u32,
        /// Number of rows in the new grid.
        height: u32,
    },
    /// Installs a sanitised program without touching the frame counter.
    Load {
        /// Number of columns in the loaded grid.
        width: u32,
        /// Number of rows in the loaded grid.
        height: u32,
        /// Newline-delimited program text.
        source: String,
    },
    /// Replaces a single glyph.
    Write {
        /// Cell receiving the glyph.
        position: Position,
        /// Glyph to store.
        glyph: char,
    },
    /// Writes a multi-line block anchored at the origin.
    WriteBlock {
        /// Upper-left cell of the block.
        origin: Position,
        /// Newline-delimited glyph rows.
        block: String,
        /// When set, empty glyphs in the block keep the existing content.
        overlap: bool,
    },
    /// Executes one complete frame.
    Tick,
    /// Runs the operator hosted at the position once, as if forced by a bang.
    Trigger {
        /// Cell hosting the operator.
        position: Position,
    },
    /// Moves the frame counter, clamped into `[0, MAX_FRAME]`.
    SetFrame {
        /// Requested frame value.
        frame: i64,
    },
}

/// Events broadcast by the grid after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that a frame completed and the counter advanced.
    FrameAdvanced {
        /// Frame counter after the tick.
        frame: u64,
    },
    /// An emitter composed an outbound message for an external sink.
    MessageQueued {
        /// Message record to enqueue.
        message: Message,
        /// Requests an immediate flush of the matching sink.
        flush: bool,
    },
    /// A self operator forwarded a command string to the command dispatcher.
    CommandRequested {
        /// Raw `name:value` command text.
        message: String,
        /// Cell the command should treat as its origin.
        origin: Option<Position>,
    },
    /// A moving operator collided or left the grid and turned into a bang.
    OperatorExploded {
        /// Cell that now holds the bang glyph.
        position: Position,
    },
}

/// Single note request shared by the polyphonic and monophonic MIDI sinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI channel in `[0, 15]`.
    pub channel: u8,
    /// Octave in `[0, 8]`.
    pub octave: u8,
    /// Note letter; its case selects naturals or sharps.
    pub note: char,
    /// Velocity in `[0, 16]`.
    pub velocity: u8,
    /// Number of frames the note is held.
    pub length: u8,
}

/// Outbound records composed by the I/O emitter operators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Message {
    /// Polyphonic note for the MIDI sink.
    Note(NoteEvent),
    /// Monophonic note for the mono sink.
    Mono(NoteEvent),
    /// MIDI control change.
    ControlChange {
        /// MIDI channel in `[0, 15]`.
        channel: u8,
        /// Controller index before the sink's offset is applied.
        knob: u8,
        /// Controller value scaled into `[0, 127]`.
        value: u8,
    },
    /// MIDI pitch bend.
    PitchBend {
        /// MIDI channel in `[0, 15]`.
        channel: u8,
        /// Least significant byte scaled into `[0, 127]`.
        lsb: u8,
        /// Most significant byte scaled into `[0, 127]`.
        msb: u8,
    },
    /// MIDI program change with optional bank select.
    ProgramChange {
        /// MIDI channel in `[0, 15]`.
        channel: u8,
        /// Bank select MSB.
        bank: Option<u8>,
        /// Bank select LSB.
        sub: Option<u8>,
        /// Program number in `[0, 127]`.
        program: Option<u8>,
    },
    /// Open Sound Control message.
    Osc {
        /// Address pattern, always starting with `/`.
        path: String,
        /// Glyphs whose base-36 values become integer arguments.
        payload: String,
    },
    /// Raw datagram payload.
    Udp {
        /// Text sent verbatim.
        payload: String,
    },
}

/// Requests addressed to the frame driver or the I/O layer rather than the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlRequest {
    /// Starts the clock.
    Play,
    /// Pauses the clock.
    Stop,
    /// Changes the tempo.
    SetSpeed {
        /// Tempo applied immediately, if any.
        value: Option<u32>,
        /// Tempo the clock animates toward, if any.
        target: Option<u32>,
    },
    /// Selects the OSC output port.
    SelectOscPort(u16),
    /// Selects the UDP output port.
    SelectUdpOutput(u16),
    /// Selects the UDP input port.
    SelectUdpInput(u16),
    /// Selects the MIDI output device by index.
    SelectMidiOutput(i32),
    /// Selects the MIDI input device by index.
    SelectMidiInput(i32),
    /// Sets the destination address for OSC and UDP.
    SetIp(String),
    /// Sets the offset added to every control change index.
    SetCcOffset(u8),
    /// Enqueues a message and flushes its sink immediately.
    Send(Message),
}

#[cfg(test)]
mod tests {
    use super::{Message, NoteEvent, Position};
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn offset_moves_in_both_axes() {
        let origin = Position::new(3, 4);
        assert_eq!(origin.offset(-1, 2), Position::new(2, 6));
        assert_eq!(origin.offset(0, 0), origin);
    }

    #[test]
    fn note_message_round_trips_through_bincode() {
        assert_round_trip(&Message::Note(NoteEvent {
            channel: 2,
            octave: 3,
            note: 'C',
            velocity: 15,
            length: 1,
        }));
    }

    #[test]
    fn osc_message_round_trips_through_bincode() {
        assert_round_trip(&Message::Osc {
            path: "/a".to_owned(),
            payload: "1ab".to_owned(),
        });
    }

    #[test]
    fn position_round_trips_through_bincode() {
        assert_round_trip(&Position::new(-2, 7));
    }
}
