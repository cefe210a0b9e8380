//! Control change, pitch bend and program change queue.

use orca_core::Message;
use tracing::warn;

use crate::Packet;

const CONTROL_CHANGE: u8 = 0xb0;
const PITCH_BEND: u8 = 0xe0;
const PROGRAM_CHANGE: u8 = 0xc0;
const BANK_SELECT: u8 = 0;
const BANK_SELECT_LSB: u8 = 32;

/// Offset added to every control change index unless configured otherwise.
pub const DEFAULT_CC_OFFSET: u8 = 64;

#[derive(Debug, Default)]
pub(crate) struct ControlSink {
    queue: Vec<Message>,
}

impl ControlSink {
    pub(crate) fn push(&mut self, message: Message) {
        self.queue.push(message);
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn run(&self, offset: u8, out: &mut Vec<Packet>) {
        for message in &self.queue {
            encode(message, offset, out);
        }
    }
}

fn encode(message: &Message, offset: u8, out: &mut Vec<Packet>) {
    match *message {
        Message::ControlChange {
            channel,
            knob,
            value,
        } if channel < 16 => {
            let controller = offset.saturating_add(knob).min(127);
            out.push(Packet::Midi(vec![CONTROL_CHANGE + channel, controller, value.min(127)]));
        }
        Message::PitchBend { channel, lsb, msb } if channel < 16 => {
            out.push(Packet::Midi(vec![PITCH_BEND + channel, lsb.min(127), msb.min(127)]));
        }
        Message::ProgramChange {
            channel,
            bank,
            sub,
            program,
        } if channel < 16 => {
            if let Some(bank) = bank {
                out.push(Packet::Midi(vec![CONTROL_CHANGE + channel, BANK_SELECT, bank.min(127)]));
            }
            if let Some(sub) = sub {
                out.push(Packet::Midi(vec![
                    CONTROL_CHANGE + channel,
                    BANK_SELECT_LSB,
                    sub.min(127),
                ]));
            }
            if let Some(program) = program {
                out.push(Packet::Midi(vec![PROGRAM_CHANGE + channel, program.min(127)]));
            }
        }
        ref other => warn!(message = ?other, "unknown control message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(message: Message) -> Vec<Packet> {
        let mut sink = ControlSink::default();
        sink.push(message);
        let mut out = Vec::new();
        sink.run(DEFAULT_CC_OFFSET, &mut out);
        out
    }

    #[test]
    fn control_change_adds_offset_to_knob() {
        let out = encoded(Message::ControlChange {
            channel: 1,
            knob: 10,
            value: 19,
        });
        assert_eq!(out, vec![Packet::Midi(vec![0xb1, 74, 19])]);
    }

    #[test]
    fn pitch_bend_uses_both_bytes() {
        let out = encoded(Message::PitchBend {
            channel: 0,
            lsb: 4,
            msb: 127,
        });
        assert_eq!(out, vec![Packet::Midi(vec![0xe0, 4, 127])]);
    }

    #[test]
    fn program_change_sends_bank_select_first() {
        let out = encoded(Message::ProgramChange {
            channel: 2,
            bank: Some(1),
            sub: None,
            program: Some(5),
        });
        assert_eq!(
            out,
            vec![
                Packet::Midi(vec![0xb2, 0, 1]),
                Packet::Midi(vec![0xc2, 5]),
            ]
        );
    }

    #[test]
    fn out_of_range_channel_is_skipped() {
        let out = encoded(Message::PitchBend {
            channel: 16,
            lsb: 0,
            msb: 0,
        });
        assert!(out.is_empty());
    }
}
