//! Note sinks and MIDI note encoding.

use std::collections::BTreeMap;

use orca_core::NoteEvent;

use crate::Packet;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const MAX_OCTAVE: u8 = 8;
const LOWEST_NOTE: u8 = 24;

/// Pitch class (semitones above C) and octave offset of a note glyph.
///
/// Letters past `G` continue the scale into the following octaves, and the
/// lowercase letters without a sharp wrap onto the next natural.
const fn transpose(note: char) -> Option<(u8, u8)> {
    let entry = match note {
        'C' => (0, 0),
        'c' => (1, 0),
        'D' => (2, 0),
        'd' => (3, 0),
        'E' => (4, 0),
        'F' | 'e' => (5, 0),
        'f' => (6, 0),
        'G' => (7, 0),
        'g' => (8, 0),
        'A' | 'H' => (9, 0),
        'a' | 'h' => (10, 0),
        'B' | 'I' => (11, 0),
        'J' | 'b' | 'i' => (0, 1),
        'j' => (1, 1),
        'K' => (2, 1),
        'k' => (3, 1),
        'L' => (4, 1),
        'M' | 'l' => (5, 1),
        'm' => (6, 1),
        'N' => (7, 1),
        'n' => (8, 1),
        'O' => (9, 1),
        'o' => (10, 1),
        'P' => (11, 1),
        'Q' | 'p' => (0, 2),
        'q' => (1, 2),
        'R' => (2, 2),
        'r' => (3, 2),
        'S' => (4, 2),
        'T' | 's' => (5, 2),
        't' => (6, 2),
        'U' => (7, 2),
        'u' => (8, 2),
        'V' => (9, 2),
        'v' => (10, 2),
        'W' => (11, 2),
        'X' | 'w' => (0, 3),
        'x' => (1, 3),
        'Y' => (2, 3),
        'y' => (3, 3),
        'Z' => (4, 3),
        'z' => (5, 3),
        _ => return None,
    };
    Some(entry)
}

/// MIDI note number for a note glyph played at the given octave.
#[must_use]
pub fn note_number(note: char, octave: u8) -> Option<u8> {
    let (pitch, offset) = transpose(note)?;
    let octave = octave.saturating_add(offset).min(MAX_OCTAVE);
    Some((octave * 12 + pitch + LOWEST_NOTE).min(127))
}

fn trigger(event: &NoteEvent, down: bool, out: &mut Vec<Packet>) {
    let Some(id) = note_number(event.note, event.octave) else {
        return;
    };
    let status = (if down { NOTE_ON } else { NOTE_OFF }) + (event.channel & 0x0f);
    let velocity = (u16::from(event.velocity.min(16)) * 127 / 16) as u8;
    out.push(Packet::Midi(vec![status, id, velocity]));
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct HeldNote {
    event: NoteEvent,
    remaining: u8,
    played: bool,
}

impl HeldNote {
    const fn new(event: NoteEvent) -> Self {
        Self {
            event,
            remaining: event.length,
            played: false,
        }
    }

    fn same_key(&self, other: &NoteEvent) -> bool {
        self.event.channel == other.channel
            && self.event.octave == other.octave
            && self.event.note == other.note
    }

    /// Presses an unplayed note and counts down its length, returning
    /// whether the note is still held.
    fn step(&mut self, out: &mut Vec<Packet>) -> bool {
        if !self.played {
            trigger(&self.event, true, out);
            self.played = true;
        }
        if self.remaining < 1 {
            trigger(&self.event, false, out);
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Sends a note-off, but only for a note whose note-on went out.
    fn release(&self, out: &mut Vec<Packet>) {
        if self.played {
            trigger(&self.event, false, out);
        }
    }
}

/// Polyphonic sink: every pushed note is held independently.
#[derive(Debug, Default)]
pub(crate) struct PolySink {
    notes: Vec<HeldNote>,
}

impl PolySink {
    /// Queues a note, releasing any held note on the same key first.
    pub(crate) fn push(&mut self, event: NoteEvent, out: &mut Vec<Packet>) {
        self.notes.retain(|held| {
            if held.same_key(&event) {
                held.release(out);
                false
            } else {
                true
            }
        });
        self.notes.push(HeldNote::new(event));
    }

    pub(crate) fn run(&mut self, out: &mut Vec<Packet>) {
        self.notes.retain_mut(|held| held.step(out));
    }

    pub(crate) fn silence(&mut self, out: &mut Vec<Packet>) {
        for held in self.notes.drain(..) {
            held.release(out);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.notes.len()
    }
}

/// Monophonic sink: one held note per channel, the newest note wins.
#[derive(Debug, Default)]
pub(crate) struct MonoSink {
    slots: BTreeMap<u8, HeldNote>,
}

impl MonoSink {
    pub(crate) fn push(&mut self, event: NoteEvent, out: &mut Vec<Packet>) {
        if let Some(previous) = self.slots.insert(event.channel, HeldNote::new(event)) {
            previous.release(out);
        }
    }

    pub(crate) fn run(&mut self, out: &mut Vec<Packet>) {
        self.slots.retain(|_, held| held.step(out));
    }

    pub(crate) fn silence(&mut self, out: &mut Vec<Packet>) {
        for held in std::mem::take(&mut self.slots).into_values() {
            held.release(out);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
