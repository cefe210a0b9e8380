//! Open Sound Control queue and message encoding.

use orca_core::glyph;

use crate::Packet;

/// Default OSC output port.
pub const DEFAULT_OSC_PORT: u16 = 49162;

/// Well-known OSC listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OscPreset {
    /// Generic listener on the default port.
    Default,
    /// TidalCycles.
    TidalCycles,
    /// Sonic Pi.
    SonicPi,
    /// SuperCollider.
    SuperCollider,
    /// Norns.
    Norns,
}

impl OscPreset {
    /// Port the preset listens on.
    #[must_use]
    pub const fn port(self) -> u16 {
        match self {
            Self::Default => DEFAULT_OSC_PORT,
            Self::TidalCycles => 6010,
            Self::SonicPi => 4559,
            Self::SuperCollider => 57120,
            Self::Norns => 10111,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct OscSink {
    queue: Vec<(String, String)>,
}

impl OscSink {
    pub(crate) fn push(&mut self, path: String, payload: String) {
        self.queue.push((path, payload));
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn run(&self, out: &mut Vec<Packet>) {
        for (path, payload) in &self.queue {
            out.push(Packet::Osc(encode(path, payload)));
        }
    }
}

/// Encodes an OSC 1.0 message whose arguments are the base-36 values of
/// the payload glyphs, each sent as a big-endian int32.
#[must_use]
pub fn encode(path: &str, payload: &str) -> Vec<u8> {
    let mut packet = Vec::with_capacity(path.len() + payload.len() * 5 + 8);
    push_padded(&mut packet, path);

    let mut tags = String::with_capacity(payload.len() + 1);
    tags.push(',');
    tags.extend(payload.chars().map(|_| 'i'));
    push_padded(&mut packet, &tags);

    for glyph in payload.chars() {
        let value = i32::try_from(glyph::value_of(glyph)).unwrap_or(0);
        packet.extend_from_slice(&value.to_be_bytes());
    }
    packet
}

// Strings are null-terminated and padded to a four-byte boundary.
fn push_padded(packet: &mut Vec<u8>, text: &str) {
    packet.extend_from_slice(text.as_bytes());
    let padding = 4 - text.len() % 4;
    packet.extend(std::iter::repeat(0).take(padding));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_address_tags_and_int_arguments() {
        let packet = encode("/a", "1z");
        let mut expected = b"/a\0\0,ii\0".to_vec();
        expected.extend_from_slice(&1_i32.to_be_bytes());
        expected.extend_from_slice(&35_i32.to_be_bytes());
        assert_eq!(packet, expected);
    }

    #[test]
    fn aligned_strings_receive_a_full_padding_word() {
        let packet = encode("/abc", "");
        assert_eq!(packet, b"/abc\0\0\0\0,\0\0\0".to_vec());
    }

    #[test]
    fn presets_map_to_known_ports() {
        assert_eq!(OscPreset::TidalCycles.port(), 6010);
        assert_eq!(OscPreset::Default.port(), 49162);
    }
}
