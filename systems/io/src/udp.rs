//! Raw datagram queue.

use crate::Packet;

/// Default UDP output port.
pub const DEFAULT_UDP_OUTPUT: u16 = 49161;
/// Default UDP input port.
pub const DEFAULT_UDP_INPUT: u16 = 49160;

#[derive(Debug, Default)]
pub(crate) struct UdpSink {
    queue: Vec<String>,
}

impl UdpSink {
    pub(crate) fn push(&mut self, payload: String) {
        self.queue.push(payload);
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn run(&self, out: &mut Vec<Packet>) {
        out.extend(
            self.queue
                .iter()
                .map(|payload| Packet::Udp(payload.as_bytes().to_vec())),
        );
    }
}
