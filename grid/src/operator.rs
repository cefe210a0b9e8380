use std::fmt;

use orca_core::{
    glyph::{self, BANG, EMPTY},
    Event, Position,
};
use tracing::trace;

use crate::{library, Grid, OperatorKind, OperatorSnapshot, PortRole, PortSnapshot};

/// Named relative offset plus read/write policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Port {
    x: i32,
    y: i32,
    default: Option<char>,
    min: Option<u32>,
    max: Option<u32>,
    output: bool,
    bang: bool,
    sensitive: bool,
    reader: bool,
}

impl Port {
    pub(crate) const fn input(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            default: None,
            min: None,
            max: None,
            output: false,
            bang: false,
            sensitive: false,
            reader: false,
        }
    }

    pub(crate) const fn output(x: i32, y: i32) -> Self {
        Self {
            output: true,
            ..Self::input(x, y)
        }
    }

    pub(crate) const fn with_default(self, glyph: char) -> Self {
        Self {
            default: Some(glyph),
            ..self
        }
    }

    pub(crate) const fn with_min(self, min: u32) -> Self {
        Self {
            min: Some(min),
            ..self
        }
    }

    pub(crate) const fn with_max(self, max: u32) -> Self {
        Self {
            max: Some(max),
            ..self
        }
    }

    pub(crate) const fn banging(self) -> Self {
        Self { bang: true, ..self }
    }

    pub(crate) const fn sensitive(self) -> Self {
        Self {
            sensitive: true,
            ..self
        }
    }

    pub(crate) const fn reading(self) -> Self {
        Self {
            reader: true,
            ..self
        }
    }

    fn role(&self) -> PortRole {
        if self.output && self.reader {
            PortRole::Reader
        } else if self.output {
            PortRole::Output
        } else if self.x < 0 || self.y < 0 {
            PortRole::Haste
        } else {
            PortRole::Input
        }
    }
}

/// Key under which a port is registered on an operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PortName {
    Named(&'static str),
    In(u32),
    Out(u32),
}

pub(crate) const OUTPUT: PortName = PortName::Named("output");

impl fmt::Display for PortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::In(index) => write!(f, "in{index}"),
            Self::Out(index) => write!(f, "out{index}"),
        }
    }
}

/// Result of a single operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Payload {
    Nothing,
    Glyph(char),
    Bang(bool),
}

impl Payload {
    fn is_truthy(self) -> bool {
        match self {
            Self::Nothing => false,
            Self::Glyph(_) => true,
            Self::Bang(flag) => flag,
        }
    }
}

/// Behaviour bound to an occupied cell for the duration of one tick.
#[derive(Clone, Debug)]
pub(crate) struct Operator {
    kind: OperatorKind,
    position: Position,
    glyph: char,
    passive: bool,
    renderable: bool,
    ports: Vec<(PortName, Port)>,
}

impl Operator {
    pub(crate) fn new(kind: OperatorKind, position: Position, glyph: char) -> Self {
        let passive = match kind.fixed_passivity() {
            Some(passive) => passive,
            None => glyph::is_passive(glyph),
        };
        Self {
            kind,
            position,
            glyph,
            passive,
            renderable: kind.is_renderable(passive),
            ports: library::ports(kind),
        }
    }

    pub(crate) const fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub(crate) const fn position(&self) -> Position {
        self.position
    }

    pub(crate) const fn glyph(&self) -> char {
        self.glyph
    }

    pub(crate) const fn passive(&self) -> bool {
        self.passive
    }

    pub(crate) fn hide(&mut self) {
        self.renderable = false;
    }

    pub(crate) fn cell(&self, port: &Port) -> Position {
        self.position.offset(port.x, port.y)
    }

    /// Reads the raw glyph under a port, substituting the port default for
    /// empty and bang glyphs.
    pub(crate) fn listen(&self, grid: &Grid, port: &Port) -> char {
        let cell = self.cell(port);
        let glyph = grid.glyph_at(cell.x(), cell.y());
        match port.default {
            Some(default) if glyph == EMPTY || glyph == BANG => default,
            _ => glyph,
        }
    }

    /// Reads the base-36 value under a port, clamped into the port range.
    pub(crate) fn listen_value(&self, grid: &Grid, port: &Port) -> u32 {
        let value = glyph::value_of(self.listen(grid, port));
        let min = port.min.unwrap_or(0);
        let max = match port.max {
            Some(max) if max > 0 => max,
            _ => glyph::RADIX,
        };
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    pub(crate) fn output(&self, grid: &mut Grid, glyph: char, port: &Port) {
        let glyph = if port.sensitive && self.should_upper_case(grid) {
            glyph.to_ascii_uppercase()
        } else {
            glyph
        };
        let cell = self.cell(port);
        let _ = grid.write(cell.x(), cell.y(), glyph);
    }

    fn bang(&self, grid: &mut Grid, flag: bool, port: &Port) {
        let cell = self.cell(port);
        let _ = grid.write(cell.x(), cell.y(), if flag { BANG } else { EMPTY });
        grid.lock(cell.x(), cell.y());
    }

    /// Computes the payload, locks every declared port and commits the output.
    pub(crate) fn run(&mut self, grid: &mut Grid, force: bool, out: &mut Vec<Event>) {
        match self.kind {
            OperatorKind::Null => return,
            OperatorKind::Bang => {
                self.renderable = false;
                self.replace(grid, EMPTY);
                return;
            }
            _ => {}
        }

        let payload = library::operate(self, grid, force, out);

        for (_, port) in &self.ports {
            if port.bang {
                continue;
            }
            let cell = self.cell(port);
            grid.lock(cell.x(), cell.y());
        }

        let Some(output) = self.port(OUTPUT) else {
            return;
        };
        if output.bang {
            self.bang(grid, payload.is_truthy(), &output);
        } else if let Payload::Glyph(glyph) = payload {
            self.output(grid, glyph, &output);
        }
    }

    fn replace(&self, grid: &mut Grid, glyph: char) {
        let _ = grid.write(self.position.x(), self.position.y(), glyph);
    }

    /// Relocates the operator, or turns its cell into a bang when the
    /// destination is outside the grid or occupied.
    pub(crate) fn move_by(&mut self, grid: &mut Grid, dx: i32, dy: i32, out: &mut Vec<Event>) {
        let target = self.position.offset(dx, dy);
        if !grid.in_bounds(target.x(), target.y()) || grid.glyph_at(target.x(), target.y()) != EMPTY
        {
            trace!(x = self.position.x(), y = self.position.y(), "operator exploded");
            self.replace(grid, BANG);
            out.push(Event::OperatorExploded {
                position: self.position,
            });
            return;
        }

        self.replace(grid, EMPTY);
        self.position = target;
        self.replace(grid, self.glyph);
        grid.lock(target.x(), target.y());
    }

    pub(crate) fn has_neighbor(&self, grid: &Grid, glyph: char) -> bool {
        let (x, y) = (self.position.x(), self.position.y());
        [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)]
            .into_iter()
            .any(|(x, y)| grid.glyph_at(x, y) == glyph)
    }

    /// Registers a port during execution, replacing any port with the same name.
    pub(crate) fn add_port(&mut self, name: PortName, port: Port) {
        match self.ports.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = port,
            None => self.ports.push((name, port)),
        }
    }

    fn port(&self, name: PortName) -> Option<Port> {
        self.ports
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, port)| *port)
    }

    // Case of the eastward operand carries signal strength into sensitive outputs.
    fn should_upper_case(&self, grid: &Grid) -> bool {
        let reference = grid.glyph_at(self.position.x() + 1, self.position.y());
        reference.is_ascii_alphabetic() && reference.is_ascii_uppercase()
    }

    pub(crate) fn snapshot(&self) -> OperatorSnapshot {
        let ports = if self.passive {
            self.ports
                .iter()
                .map(|(name, port)| PortSnapshot {
                    position: self.cell(port),
                    role: port.role(),
                    label: format!("{}-{name}", self.glyph),
                })
                .collect()
        } else {
            Vec::new()
        };

        OperatorSnapshot {
            kind: self.kind,
            position: self.position,
            glyph: self.glyph,
            passive: self.passive,
            renderable: self.renderable,
            ports,
        }
    }
}
