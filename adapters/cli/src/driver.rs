//! Frame loop wiring the grid, the commander and the I/O system together.

use orca_core::{Command, ControlRequest, Event};
use orca_grid::{self as grid, Grid};
use orca_system_commander::{Commander, Timing};
use orca_system_io::{Io, Packet, Transport};
use tracing::{debug, info, warn};

use crate::clock::Clock;

/// Owns every piece of runtime state advanced once per frame.
#[derive(Debug)]
pub(crate) struct Driver {
    grid: Grid,
    io: Io,
    commander: Commander,
    clock: Clock,
    packets: Vec<Packet>,
}

impl Driver {
    pub(crate) fn new(grid: Grid, io: Io, clock: Clock) -> Self {
        Self {
            grid,
            io,
            commander: Commander::new(),
            clock,
            packets: Vec::new(),
        }
    }

    pub(crate) const fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) const fn io(&self) -> &Io {
        &self.io
    }

    pub(crate) const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Runs one frame and delivers its output, returning the number of
    /// packets the transport accepted.
    pub(crate) fn frame(&mut self, transport: &mut dyn Transport) -> usize {
        self.clock.animate();
        self.io.clear();

        let mut events = Vec::new();
        grid::apply(&mut self.grid, Command::Tick, &mut events);
        self.react(&events);

        debug!(
            frame = self.grid.frame(),
            bpm = self.clock.bpm(),
            target = self.clock.target(),
            pending = self.io.length(),
            "frame complete"
        );
        self.flush(transport)
    }

    /// Interprets a message received from outside the grid.
    pub(crate) fn receive(&mut self, message: &str, transport: &mut dyn Transport) -> usize {
        let mut commands = Vec::new();
        let mut requests = Vec::new();
        if let Err(error) = self.commander.trigger(
            message,
            None,
            self.timing(),
            &mut commands,
            &mut requests,
        ) {
            warn!(%error, "command rejected");
        }
        self.settle(commands, requests);
        self.flush(transport)
    }

    /// Releases every held note, as when playback stops.
    pub(crate) fn silence(&mut self, transport: &mut dyn Transport) -> usize {
        self.io.silence(&mut self.packets);
        self.flush(transport)
    }

    fn timing(&self) -> Timing {
        Timing::new(self.grid.frame(), self.clock.bpm())
    }

    fn react(&mut self, events: &[Event]) {
        let mut commands = Vec::new();
        let mut requests = Vec::new();
        self.commander
            .handle(events, self.timing(), &mut commands, &mut requests);
        self.io.handle(events, &mut self.packets);
        self.io.run(&mut self.packets);
        self.settle(commands, requests);
    }

    /// Applies the commands and requests collected while the last tick ran.
    fn settle(&mut self, commands: Vec<Command>, requests: Vec<ControlRequest>) {
        for command in commands {
            let mut events = Vec::new();
            grid::apply(&mut self.grid, command, &mut events);
            if events
                .iter()
                .any(|event| matches!(event, Event::FrameAdvanced { .. }))
            {
                self.io.clear();
                self.io.handle(&events, &mut self.packets);
                self.io.run(&mut self.packets);
            }
        }
        for request in requests {
            self.control(&request);
        }
    }

    fn control(&mut self, request: &ControlRequest) {
        match request {
            ControlRequest::Play => {
                self.clock.play();
                info!(bpm = self.clock.bpm(), "clock playing");
            }
            ControlRequest::Stop => {
                self.clock.stop();
                self.io.silence(&mut self.packets);
                info!("clock stopped");
            }
            ControlRequest::SetSpeed { value, target } => {
                self.clock.set_speed(*value, *target);
                info!(bpm = self.clock.bpm(), target = self.clock.target(), "tempo changed");
            }
            other => {
                if let Err(error) = self.io.apply_control(other, &mut self.packets) {
                    warn!(%error, "io request rejected");
                }
            }
        }
    }

    fn flush(&mut self, transport: &mut dyn Transport) -> usize {
        let packets = std::mem::take(&mut self.packets);
        self.io.dispatch(&packets, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orca_system_io::{IoConfig, TransportError};

    #[derive(Default)]
    struct Recorder {
        midi: Vec<Vec<u8>>,
        datagrams: Vec<(u16, Vec<u8>)>,
    }

    impl Transport for Recorder {
        fn send_midi(&mut self, _device: usize, bytes: &[u8]) -> Result<(), TransportError> {
            self.midi.push(bytes.to_vec());
            Ok(())
        }

        fn send_datagram(
            &mut self,
            _host: &str,
            port: u16,
            bytes: &[u8],
        ) -> Result<(), TransportError> {
            self.datagrams.push((port, bytes.to_vec()));
            Ok(())
        }
    }

    fn driver(width: u32, height: u32, source: &str) -> Driver {
        let mut grid = Grid::new(width, height);
        grid.load(width, height, source);
        Driver::new(grid, Io::new(IoConfig::default()), Clock::new(120))
    }

    #[test]
    fn frames_advance_the_grid_and_send_output() {
        let mut driver = driver(4, 2, ";hi.*...");
        let mut recorder = Recorder::default();

        assert_eq!(driver.frame(&mut recorder), 1);
        assert_eq!(driver.grid().frame(), 1);
        assert_eq!(recorder.datagrams, vec![(49161, b"hi".to_vec())]);
        assert_eq!(driver.frame(&mut recorder), 0);
    }

    #[test]
    fn self_commands_reach_the_clock() {
        let mut driver = driver(8, 2, "$bpm:90.*.......");
        let mut recorder = Recorder::default();
        let _ = driver.frame(&mut recorder);
        assert_eq!(driver.clock().bpm(), 90);
    }

    #[test]
    fn received_messages_configure_io() {
        let mut driver = driver(1, 1, ".");
        let mut recorder = Recorder::default();
        let _ = driver.receive("osc:57120", &mut recorder);
        assert_eq!(driver.io().config().osc_port(), 57120);

        let _ = driver.receive("osc:12", &mut recorder);
        assert_eq!(driver.io().config().osc_port(), 57120);
    }

    #[test]
    fn run_command_ticks_again() {
        let mut driver = driver(1, 1, ".");
        let mut recorder = Recorder::default();
        let _ = driver.receive("run", &mut recorder);
        assert_eq!(driver.grid().frame(), 1);
    }

    #[test]
    fn stop_releases_held_notes() {
        let mut driver = driver(5, 2, ".:03C.*...");
        let mut recorder = Recorder::default();
        let _ = driver.frame(&mut recorder);
        assert_eq!(recorder.midi, vec![vec![0x90, 60, 119]]);

        let _ = driver.receive("stop", &mut recorder);
        assert!(driver.clock().is_paused());
        assert_eq!(recorder.midi.last(), Some(&vec![0x80, 60, 119]));
    }
}
