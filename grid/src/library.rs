//! Closed catalogue of operator variants keyed by glyph.

use orca_core::{
    glyph::{self, BANG, EMPTY},
    Event, Message, NoteEvent,
};

use crate::{
    operator::{Operator, Payload, Port, PortName, OUTPUT},
    Grid,
};

/// Longest run of glyphs read by the message-composing operators.
const MESSAGE_SPAN: i32 = 36;

/// Every behaviour a glyph can host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    /// `a`: outputs the sum of its operands.
    Add,
    /// `b`: outputs the absolute difference of its operands.
    Subtract,
    /// `c`: outputs the frame divided by rate, modulo mod.
    Clock,
    /// `d`: bangs on a modulo of the frame.
    Delay,
    /// `e`: moves eastward.
    East,
    /// `f`: bangs when its operands are equal.
    If,
    /// `g`: writes eastward operands at an offset.
    Generator,
    /// `h`: halts the southward operand.
    Halt,
    /// `i`: increments the southward operand.
    Increment,
    /// `j`: passes the northward operand through a run of jumpers.
    Jumper,
    /// `k`: reads several variables.
    Konkat,
    /// `l`: outputs the smaller operand.
    Lesser,
    /// `m`: outputs the product of its operands.
    Multiply,
    /// `n`: moves northward.
    North,
    /// `o`: reads an operand at an offset.
    Read,
    /// `p`: writes the eastward operand into a southward slot.
    Push,
    /// `q`: reads several operands at an offset.
    Query,
    /// `r`: outputs a random value.
    Random,
    /// `s`: moves southward.
    South,
    /// `t`: reads an eastward operand selected by key.
    Track,
    /// `u`: bangs on a Euclidean rhythm.
    Uclid,
    /// `v`: reads and writes variables.
    Variable,
    /// `w`: moves westward.
    West,
    /// `x`: writes an operand at an offset.
    Write,
    /// `y`: passes the westward operand through a run of jympers.
    Jymper,
    /// `z`: moves its output toward a target.
    Lerp,
    /// `*`: one-tick trigger that erases itself.
    Bang,
    /// `#`: disables the rest of the row up to the next comment glyph.
    Comment,
    /// `$`: forwards the eastward text to the command dispatcher.
    SelfCommand,
    /// `:`: queues a polyphonic MIDI note.
    MidiNote,
    /// `!`: queues a MIDI control change.
    ControlChange,
    /// `?`: queues a MIDI pitch bend.
    PitchBend,
    /// `%`: queues a monophonic MIDI note.
    MidiMono,
    /// `=`: queues an OSC message.
    Osc,
    /// `;`: queues a UDP datagram.
    Udp,
    /// `0`-`9`: inert data cell.
    Null,
}

impl OperatorKind {
    /// Resolves the variant hosted by a glyph, ignoring letter case.
    #[must_use]
    pub fn from_glyph(glyph: char) -> Option<Self> {
        let kind = match glyph.to_ascii_lowercase() {
            'a' => Self::Add,
            'b' => Self::Subtract,
            'c' => Self::Clock,
            'd' => Self::Delay,
            'e' => Self::East,
            'f' => Self::If,
            'g' => Self::Generator,
            'h' => Self::Halt,
            'i' => Self::Increment,
            'j' => Self::Jumper,
            'k' => Self::Konkat,
            'l' => Self::Lesser,
            'm' => Self::Multiply,
            'n' => Self::North,
            'o' => Self::Read,
            'p' => Self::Push,
            'q' => Self::Query,
            'r' => Self::Random,
            's' => Self::South,
            't' => Self::Track,
            'u' => Self::Uclid,
            'v' => Self::Variable,
            'w' => Self::West,
            'x' => Self::Write,
            'y' => Self::Jymper,
            'z' => Self::Lerp,
            '*' => Self::Bang,
            '#' => Self::Comment,
            '$' => Self::SelfCommand,
            ':' => Self::MidiNote,
            '!' => Self::ControlChange,
            '?' => Self::PitchBend,
            '%' => Self::MidiMono,
            '=' => Self::Osc,
            ';' => Self::Udp,
            '0'..='9' => Self::Null,
            _ => return None,
        };
        Some(kind)
    }

    /// Short lowercase name of the variant.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Clock => "clock",
            Self::Delay => "delay",
            Self::East => "east",
            Self::If => "if",
            Self::Generator => "generator",
            Self::Halt => "halt",
            Self::Increment => "increment",
            Self::Jumper => "jumper",
            Self::Konkat => "konkat",
            Self::Lesser => "lesser",
            Self::Multiply => "multiply",
            Self::North => "north",
            Self::Read => "read",
            Self::Push => "push",
            Self::Query => "query",
            Self::Random => "random",
            Self::South => "south",
            Self::Track => "track",
            Self::Uclid => "uclid",
            Self::Variable => "variable",
            Self::West => "west",
            Self::Write => "write",
            Self::Jymper => "jymper",
            Self::Lerp => "lerp",
            Self::Bang => "bang",
            Self::Comment => "comment",
            Self::SelfCommand => "self",
            Self::MidiNote => "midi",
            Self::ControlChange => "cc",
            Self::PitchBend => "pb",
            Self::MidiMono => "mono",
            Self::Osc => "osc",
            Self::Udp => "udp",
            Self::Null => "null",
        }
    }

    /// One-line description suitable for an inspector.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Add => "Outputs sum of inputs",
            Self::Subtract => "Outputs difference of inputs",
            Self::Clock => "Outputs modulo of frame",
            Self::Delay => "Bangs on modulo of frame",
            Self::East => "Moves eastward, or bangs",
            Self::If => "Bangs if inputs are equal",
            Self::Generator => "Writes operands with offset",
            Self::Halt => "Halts southward operand",
            Self::Increment => "Increments southward operand",
            Self::Jumper => "Outputs northward operand",
            Self::Konkat => "Reads multiple variables",
            Self::Lesser => "Outputs smallest input",
            Self::Multiply => "Outputs product of inputs",
            Self::North => "Moves northward, or bangs",
            Self::Read => "Reads operand with offset",
            Self::Push => "Writes eastward operand",
            Self::Query => "Reads operands with offset",
            Self::Random => "Outputs random value",
            Self::South => "Moves southward, or bangs",
            Self::Track => "Reads eastward operand",
            Self::Uclid => "Bangs on Euclidean rhythm",
            Self::Variable => "Reads and writes variable",
            Self::West => "Moves westward, or bangs",
            Self::Write => "Writes operand with offset",
            Self::Jymper => "Outputs westward operand",
            Self::Lerp => "Transitions operand to target",
            Self::Bang => "Bangs neighboring operands",
            Self::Comment => "Halts line",
            Self::SelfCommand => "Sends orca command",
            Self::MidiNote => "Sends MIDI note",
            Self::ControlChange => "Sends MIDI control change",
            Self::PitchBend => "Sends MIDI pitch bend",
            Self::MidiMono => "Sends MIDI monophonic note",
            Self::Osc => "Sends OSC message",
            Self::Udp => "Sends UDP message",
            Self::Null => "Empty",
        }
    }

    /// Passivity that does not depend on the glyph case, if any.
    pub(crate) const fn fixed_passivity(self) -> Option<bool> {
        match self {
            Self::Bang
            | Self::Comment
            | Self::SelfCommand
            | Self::MidiNote
            | Self::ControlChange
            | Self::PitchBend
            | Self::MidiMono
            | Self::Osc
            | Self::Udp => Some(true),
            Self::Null => Some(false),
            _ => None,
        }
    }

    pub(crate) const fn is_renderable(self, passive: bool) -> bool {
        match self {
            Self::East | Self::North | Self::South | Self::West => false,
            Self::Bang | Self::Comment | Self::Null => false,
            _ => passive,
        }
    }
}

const A: Port = Port::input(-1, 0);
const B: Port = Port::input(1, 0);
const SENSITIVE_OUTPUT: Port = Port::output(0, 1).sensitive();
const PLAIN_OUTPUT: Port = Port::output(0, 1);
const BANG_OUTPUT: Port = Port::output(0, 1).banging();
const RATE: Port = Port::input(-1, 0).with_min(1);
const MOD: Port = Port::input(1, 0).with_default('8');
const LEN: Port = Port::input(-1, 0).with_min(1);
const OFFSET_X3: Port = Port::input(-3, 0);
const OFFSET_Y2: Port = Port::input(-2, 0);
const OFFSET_X2: Port = Port::input(-2, 0);
const OFFSET_Y1: Port = Port::input(-1, 0);
const KEY: Port = Port::input(-2, 0);
const VAL: Port = Port::input(1, 0);
const HALT_OUTPUT: Port = Port::output(0, 1).reading();
const STEP: Port = Port::input(-1, 0).with_default('1');
const INCREMENT_MOD: Port = Port::input(1, 0);
const READING_OUTPUT: Port = Port::output(0, 1).sensitive().reading();
const UCLID_STEP: Port = Port::input(-1, 0).with_min(0).with_default('1');
const UCLID_MAX: Port = Port::input(1, 0).with_min(1).with_default('8');
const VAR_WRITE: Port = Port::input(-1, 0);
const VAR_READ: Port = Port::input(1, 0);
const LERP_RATE: Port = Port::input(-1, 0).with_default('1');
const TARGET: Port = Port::input(1, 0);
const CHANNEL: Port = Port::input(1, 0);
const OCTAVE: Port = Port::input(2, 0).with_min(0).with_max(8);
const NOTE: Port = Port::input(3, 0);
const VELOCITY: Port = Port::input(4, 0).with_default('f').with_min(0).with_max(16);
const LENGTH: Port = Port::input(5, 0).with_default('1').with_min(0).with_max(32);
const KNOB: Port = Port::input(2, 0).with_min(0);
const CC_VALUE: Port = Port::input(3, 0).with_min(0);
const PB_CHANNEL: Port = Port::input(1, 0).with_min(0).with_max(15);
const LSB: Port = Port::input(2, 0).with_min(0);
const MSB: Port = Port::input(3, 0).with_min(0);
const PATH: Port = Port::input(1, 0);

/// Statically declared ports of a variant.
pub(crate) fn ports(kind: OperatorKind) -> Vec<(PortName, Port)> {
    use OperatorKind as K;
    use PortName::Named as N;

    match kind {
        K::Add | K::Subtract | K::Multiply | K::Lesser => {
            vec![(N("a"), A), (N("b"), B), (OUTPUT, SENSITIVE_OUTPUT)]
        }
        K::Clock => vec![(N("rate"), RATE), (N("mod"), MOD), (OUTPUT, SENSITIVE_OUTPUT)],
        K::Delay => vec![(N("rate"), RATE), (N("mod"), MOD), (OUTPUT, BANG_OUTPUT)],
        K::If => vec![(N("a"), A), (N("b"), B), (OUTPUT, BANG_OUTPUT)],
        K::Generator | K::Query => vec![(N("x"), OFFSET_X3), (N("y"), OFFSET_Y2), (N("len"), LEN)],
        K::Halt => vec![(OUTPUT, HALT_OUTPUT)],
        K::Increment => vec![
            (N("step"), STEP),
            (N("mod"), INCREMENT_MOD),
            (OUTPUT, READING_OUTPUT),
        ],
        K::Konkat => vec![(N("len"), LEN)],
        K::Read => vec![(N("x"), OFFSET_X2), (N("y"), OFFSET_Y1), (OUTPUT, PLAIN_OUTPUT)],
        K::Push => vec![(N("key"), KEY), (N("len"), LEN), (N("val"), VAL)],
        K::Random => vec![(N("min"), A), (N("max"), B), (OUTPUT, SENSITIVE_OUTPUT)],
        K::Track => vec![(N("key"), KEY), (N("len"), LEN), (OUTPUT, PLAIN_OUTPUT)],
        K::Uclid => vec![
            (N("step"), UCLID_STEP),
            (N("max"), UCLID_MAX),
            (OUTPUT, BANG_OUTPUT),
        ],
        K::Variable => vec![(N("write"), VAR_WRITE), (N("read"), VAR_READ)],
        K::Write => vec![(N("x"), OFFSET_X2), (N("y"), OFFSET_Y1), (N("val"), VAL)],
        K::Lerp => vec![
            (N("rate"), LERP_RATE),
            (N("target"), TARGET),
            (OUTPUT, READING_OUTPUT),
        ],
        K::MidiNote | K::MidiMono => vec![
            (N("channel"), CHANNEL),
            (N("octave"), OCTAVE),
            (N("note"), NOTE),
            (N("velocity"), VELOCITY),
            (N("length"), LENGTH),
        ],
        K::ControlChange => vec![(N("channel"), CHANNEL), (N("knob"), KNOB), (N("value"), CC_VALUE)],
        K::PitchBend => vec![(N("channel"), PB_CHANNEL), (N("lsb"), LSB), (N("msb"), MSB)],
        K::Osc => vec![(N("path"), PATH)],
        K::East
        | K::North
        | K::South
        | K::West
        | K::Jumper
        | K::Jymper
        | K::Bang
        | K::Comment
        | K::SelfCommand
        | K::Udp
        | K::Null => Vec::new(),
    }
}

/// Runs the variant-specific operation of an operator.
pub(crate) fn operate(
    operator: &mut Operator,
    grid: &mut Grid,
    force: bool,
    out: &mut Vec<Event>,
) -> Payload {
    use OperatorKind as K;

    match operator.kind() {
        K::Add => {
            let (a, b) = operands(operator, grid);
            Payload::Glyph(glyph::key_of(i64::from(a) + i64::from(b)))
        }
        K::Subtract => {
            let (a, b) = operands(operator, grid);
            Payload::Glyph(glyph::key_of((i64::from(b) - i64::from(a)).abs()))
        }
        K::Multiply => {
            let (a, b) = operands(operator, grid);
            Payload::Glyph(glyph::key_of(i64::from(a) * i64::from(b)))
        }
        K::Clock => clock(operator, grid),
        K::Delay => delay(operator, grid),
        K::East => travel(operator, grid, 1, 0, out),
        K::North => travel(operator, grid, 0, -1, out),
        K::South => travel(operator, grid, 0, 1, out),
        K::West => travel(operator, grid, -1, 0, out),
        K::If => Payload::Bang(operator.listen(grid, &A) == operator.listen(grid, &B)),
        K::Generator => generator(operator, grid),
        K::Halt => {
            let cell = operator.cell(&HALT_OUTPUT);
            grid.lock(cell.x(), cell.y());
            Payload::Glyph(operator.listen(grid, &HALT_OUTPUT))
        }
        K::Increment => increment(operator, grid),
        K::Jumper => jump(operator, grid, 0, 1),
        K::Jymper => jump(operator, grid, 1, 0),
        K::Konkat => konkat(operator, grid),
        K::Lesser => lesser(operator, grid),
        K::Read => read(operator, grid),
        K::Push => push(operator, grid),
        K::Query => query(operator, grid),
        K::Random => random(operator, grid),
        K::Track => track(operator, grid),
        K::Uclid => uclid(operator, grid),
        K::Variable => variable(operator, grid),
        K::Write => write(operator, grid),
        K::Lerp => lerp(operator, grid),
        K::Comment => comment(operator, grid),
        K::SelfCommand => self_command(operator, grid, force, out),
        K::MidiNote => {
            if let Some(note) = note_event(operator, grid, force) {
                queue(operator, Message::Note(note), force, out);
            }
            Payload::Nothing
        }
        K::MidiMono => {
            if let Some(note) = note_event(operator, grid, force) {
                queue(operator, Message::Mono(note), force, out);
            }
            Payload::Nothing
        }
        K::ControlChange => control_change(operator, grid, force, out),
        K::PitchBend => pitch_bend(operator, grid, force, out),
        K::Osc => osc(operator, grid, force, out),
        K::Udp => udp(operator, grid, force, out),
        K::Bang | K::Null => Payload::Nothing,
    }
}

fn operands(operator: &Operator, grid: &Grid) -> (u32, u32) {
    (operator.listen_value(grid, &A), operator.listen_value(grid, &B))
}

fn clock(operator: &Operator, grid: &Grid) -> Payload {
    let rate = u64::from(operator.listen_value(grid, &RATE));
    let modulus = u64::from(operator.listen_value(grid, &MOD));
    if modulus == 0 {
        return Payload::Nothing;
    }
    let value = (grid.frame() / rate) % modulus;
    Payload::Glyph(glyph::key_of(i64::try_from(value).unwrap_or(0)))
}

fn delay(operator: &Operator, grid: &Grid) -> Payload {
    let rate = u64::from(operator.listen_value(grid, &RATE));
    let modulus = u64::from(operator.listen_value(grid, &MOD));
    let period = modulus * rate;
    let on_period = period != 0 && grid.frame() % period == 0;
    Payload::Bang(on_period || modulus == 1)
}

fn travel(
    operator: &mut Operator,
    grid: &mut Grid,
    dx: i32,
    dy: i32,
    out: &mut Vec<Event>,
) -> Payload {
    operator.move_by(grid, dx, dy, out);
    Payload::Nothing
}

fn generator(operator: &mut Operator, grid: &mut Grid) -> Payload {
    let len = operator.listen_value(grid, &LEN);
    let x = operator.listen_value(grid, &OFFSET_X3) as i32;
    let y = operator.listen_value(grid, &OFFSET_Y2) as i32 + 1;
    for index in 0..len {
        let offset = index as i32;
        let input = Port::input(offset + 1, 0);
        let output = Port::output(x + offset, y);
        operator.add_port(PortName::In(index), input);
        operator.add_port(PortName::Out(index), output);
        let glyph = operator.listen(grid, &input);
        operator.output(grid, glyph, &output);
    }
    Payload::Nothing
}

fn increment(operator: &Operator, grid: &Grid) -> Payload {
    let step = operator.listen_value(grid, &STEP);
    let modulus = operator.listen_value(grid, &INCREMENT_MOD);
    let value = operator.listen_value(grid, &READING_OUTPUT);
    let modulus = if modulus > 0 { modulus } else { glyph::RADIX };
    Payload::Glyph(glyph::key_of(i64::from((value + step) % modulus)))
}

/// Passes the operand behind the operator across a run of identical glyphs.
fn jump(operator: &mut Operator, grid: &Grid, dx: i32, dy: i32) -> Payload {
    let input = Port::input(-dx, -dy);
    let value = operator.listen(grid, &input);
    if value == operator.glyph() {
        return Payload::Nothing;
    }

    let origin = operator.position();
    let mut distance = 0;
    while grid.in_bounds(origin.x() + dx * distance, origin.y() + dy * distance) {
        distance += 1;
        if operator.listen(grid, &Port::input(dx * distance, dy * distance)) != operator.glyph() {
            break;
        }
    }

    operator.add_port(PortName::Named("input"), input);
    operator.add_port(OUTPUT, Port::output(dx * distance, dy * distance));
    Payload::Glyph(value)
}

fn konkat(operator: &mut Operator, grid: &mut Grid) -> Payload {
    let len = operator.listen_value(grid, &LEN);
    let origin = operator.position();
    for index in 0..len {
        let offset = index as i32 + 1;
        let key = grid.glyph_at(origin.x() + offset, origin.y());
        grid.lock(origin.x() + offset, origin.y());
        if key == EMPTY {
            continue;
        }
        let output = Port::output(offset, 1);
        operator.add_port(PortName::In(index), Port::input(offset, 0));
        operator.add_port(PortName::Out(index), output);
        let value = grid.variable(key);
        operator.output(grid, value, &output);
    }
    Payload::Nothing
}

fn lesser(operator: &Operator, grid: &Grid) -> Payload {
    let a = operator.listen(grid, &A);
    let b = operator.listen(grid, &B);
    if a == EMPTY || b == EMPTY {
        return Payload::Glyph(EMPTY);
    }
    let smallest = glyph::value_of(a).min(glyph::value_of(b));
    Payload::Glyph(glyph::key_of(i64::from(smallest)))
}

fn read(operator: &mut Operator, grid: &Grid) -> Payload {
    let x = operator.listen_value(grid, &OFFSET_X2) as i32;
    let y = operator.listen_value(grid, &OFFSET_Y1) as i32;
    let port = Port::input(x + 1, y);
    operator.add_port(PortName::Named("read"), port);
    Payload::Glyph(operator.listen(grid, &port))
}

fn push(operator: &mut Operator, grid: &mut Grid) -> Payload {
    let len = operator.listen_value(grid, &LEN);
    let key = operator.listen_value(grid, &KEY);
    let origin = operator.position();
    for offset in 0..len as i32 {
        grid.lock(origin.x() + offset, origin.y() + 1);
    }
    operator.add_port(OUTPUT, Port::output((key % len) as i32, 1));
    Payload::Glyph(operator.listen(grid, &VAL))
}

fn query(operator: &mut Operator, grid: &mut Grid) -> Payload {
    let len = operator.listen_value(grid, &LEN);
    let x = operator.listen_value(grid, &OFFSET_X3) as i32;
    let y = operator.listen_value(grid, &OFFSET_Y2) as i32;
    let width = len as i32;
    for index in 0..len {
        let offset = index as i32;
        let input = Port::input(x + offset + 1, y);
        let output = Port::output(offset - width + 1, 1);
        operator.add_port(PortName::In(index), input);
        operator.add_port(PortName::Out(index), output);
        let glyph = operator.listen(grid, &input);
        operator.output(grid, glyph, &output);
    }
    Payload::Nothing
}

fn random(operator: &Operator, grid: &mut Grid) -> Payload {
    let min = f64::from(operator.listen_value(grid, &A));
    let max = operator.listen_value(grid, &B);
    let ceiling = f64::from(if max > 0 { max } else { glyph::RADIX });
    let value = (grid.random_unit() * (ceiling - min) + min).floor();
    Payload::Glyph(glyph::key_of(value as i64))
}

fn track(operator: &mut Operator, grid: &mut Grid) -> Payload {
    let len = operator.listen_value(grid, &LEN);
    let key = operator.listen_value(grid, &KEY);
    let origin = operator.position();
    for offset in 0..len as i32 {
        grid.lock(origin.x() + offset + 1, origin.y());
    }
    let port = Port::input((key % len) as i32 + 1, 0);
    operator.add_port(PortName::Named("val"), port);
    Payload::Glyph(operator.listen(grid, &port))
}

fn uclid(operator: &Operator, grid: &Grid) -> Payload {
    let step = u128::from(operator.listen_value(grid, &UCLID_STEP));
    let max = u128::from(operator.listen_value(grid, &UCLID_MAX));
    let frame = u128::from(grid.frame());
    let bucket = (step * (frame + max - 1)) % max + step;
    Payload::Bang(bucket >= max)
}

fn variable(operator: &mut Operator, grid: &mut Grid) -> Payload {
    let write = operator.listen(grid, &VAR_WRITE);
    let read = operator.listen(grid, &VAR_READ);
    if write == EMPTY && read != EMPTY {
        operator.add_port(OUTPUT, PLAIN_OUTPUT);
    }
    if write != EMPTY {
        grid.set_variable(write, read);
        return Payload::Nothing;
    }
    Payload::Glyph(grid.variable(read))
}

fn write(operator: &mut Operator, grid: &Grid) -> Payload {
    let x = operator.listen_value(grid, &OFFSET_X2) as i32;
    let y = operator.listen_value(grid, &OFFSET_Y1) as i32 + 1;
    operator.add_port(OUTPUT, Port::output(x, y));
    Payload::Glyph(operator.listen(grid, &VAL))
}

fn lerp(operator: &Operator, grid: &Grid) -> Payload {
    let rate = i64::from(operator.listen_value(grid, &LERP_RATE));
    let target = i64::from(operator.listen_value(grid, &TARGET));
    let value = i64::from(operator.listen_value(grid, &READING_OUTPUT));
    let step = if value <= target - rate {
        rate
    } else if value >= target + rate {
        -rate
    } else {
        target - value
    };
    Payload::Glyph(glyph::key_of(value + step))
}

fn comment(operator: &Operator, grid: &mut Grid) -> Payload {
    let origin = operator.position();
    let last = i32::try_from(grid.width()).unwrap_or(i32::MAX);
    for x in origin.x() + 1..=last {
        grid.lock(x, origin.y());
        if grid.glyph_at(x, origin.y()) == operator.glyph() {
            break;
        }
    }
    grid.lock(origin.x(), origin.y());
    Payload::Nothing
}

/// Collects glyphs eastward from `start` until the first empty cell, locking
/// every visited cell.
fn read_text(operator: &Operator, grid: &mut Grid, start: i32) -> String {
    let origin = operator.position();
    let mut text = String::new();
    for offset in start..=MESSAGE_SPAN {
        let (x, y) = (origin.x() + offset, origin.y());
        let glyph = grid.glyph_at(x, y);
        grid.lock(x, y);
        if glyph == EMPTY {
            break;
        }
        text.push(glyph);
    }
    text
}

fn triggered(operator: &Operator, grid: &Grid, force: bool) -> bool {
    force || operator.has_neighbor(grid, BANG)
}

fn queue(operator: &mut Operator, message: Message, flush: bool, out: &mut Vec<Event>) {
    operator.hide();
    out.push(Event::MessageQueued { message, flush });
}

fn self_command(
    operator: &mut Operator,
    grid: &mut Grid,
    force: bool,
    out: &mut Vec<Event>,
) -> Payload {
    let message = read_text(operator, grid, 1);
    if !triggered(operator, grid, force) || message.is_empty() {
        return Payload::Nothing;
    }
    operator.hide();
    out.push(Event::CommandRequested {
        message,
        origin: Some(operator.position().offset(0, 1)),
    });
    Payload::Nothing
}

fn note_event(operator: &Operator, grid: &Grid, force: bool) -> Option<NoteEvent> {
    if !triggered(operator, grid, force) {
        return None;
    }
    let note = operator.listen(grid, &NOTE);
    if operator.listen(grid, &CHANNEL) == EMPTY
        || operator.listen(grid, &OCTAVE) == EMPTY
        || note == EMPTY
        || note.is_ascii_digit()
    {
        return None;
    }

    let channel = operator.listen_value(grid, &CHANNEL);
    if channel > 15 {
        return None;
    }

    Some(NoteEvent {
        channel: channel as u8,
        octave: operator.listen_value(grid, &OCTAVE) as u8,
        note,
        velocity: operator.listen_value(grid, &VELOCITY) as u8,
        length: operator.listen_value(grid, &LENGTH) as u8,
    })
}

/// Scales a base-36 value into the 7-bit MIDI range, rounding up.
fn scale_to_midi(value: u32) -> u8 {
    let scaled = (127 * value).div_ceil(35);
    u8::try_from(scaled.min(127)).unwrap_or(127)
}

fn control_change(
    operator: &mut Operator,
    grid: &Grid,
    force: bool,
    out: &mut Vec<Event>,
) -> Payload {
    if !triggered(operator, grid, force)
        || operator.listen(grid, &CHANNEL) == EMPTY
        || operator.listen(grid, &KNOB) == EMPTY
    {
        return Payload::Nothing;
    }
    let channel = operator.listen_value(grid, &CHANNEL);
    if channel > 15 {
        return Payload::Nothing;
    }
    let message = Message::ControlChange {
        channel: channel as u8,
        knob: operator.listen_value(grid, &KNOB) as u8,
        value: scale_to_midi(operator.listen_value(grid, &CC_VALUE)),
    };
    queue(operator, message, force, out);
    Payload::Nothing
}

fn pitch_bend(
    operator: &mut Operator,
    grid: &Grid,
    force: bool,
    out: &mut Vec<Event>,
) -> Payload {
    if !triggered(operator, grid, force)
        || operator.listen(grid, &PB_CHANNEL) == EMPTY
        || operator.listen(grid, &LSB) == EMPTY
    {
        return Payload::Nothing;
    }
    let message = Message::PitchBend {
        channel: operator.listen_value(grid, &PB_CHANNEL) as u8,
        lsb: scale_to_midi(operator.listen_value(grid, &LSB)),
        msb: scale_to_midi(operator.listen_value(grid, &MSB)),
    };
    queue(operator, message, force, out);
    Payload::Nothing
}

fn osc(operator: &mut Operator, grid: &mut Grid, force: bool, out: &mut Vec<Event>) -> Payload {
    let payload = read_text(operator, grid, 2);
    if !triggered(operator, grid, force) {
        return Payload::Nothing;
    }
    let path = operator.listen(grid, &PATH);
    if path == EMPTY {
        return Payload::Nothing;
    }
    let message = Message::Osc {
        path: format!("/{path}"),
        payload,
    };
    queue(operator, message, force, out);
    Payload::Nothing
}

fn udp(operator: &mut Operator, grid: &mut Grid, force: bool, out: &mut Vec<Event>) -> Payload {
    let payload = read_text(operator, grid, 1);
    if !triggered(operator, grid, force) {
        return Payload::Nothing;
    }
    queue(operator, Message::Udp { payload }, force, out);
    Payload::Nothing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_table_is_case_insensitive() {
        assert_eq!(OperatorKind::from_glyph('a'), Some(OperatorKind::Add));
        assert_eq!(OperatorKind::from_glyph('A'), Some(OperatorKind::Add));
        assert_eq!(OperatorKind::from_glyph('7'), Some(OperatorKind::Null));
        assert_eq!(OperatorKind::from_glyph('$'), Some(OperatorKind::SelfCommand));
        assert_eq!(OperatorKind::from_glyph('.'), None);
        assert_eq!(OperatorKind::from_glyph('@'), None);
    }

    #[test]
    fn every_letter_hosts_an_operator() {
        for glyph in 'a'..='z' {
            let kind = OperatorKind::from_glyph(glyph).expect("letter operator");
            assert_ne!(kind, OperatorKind::Null);
            assert_eq!(kind.fixed_passivity(), None);
        }
    }

    #[test]
    fn specials_are_always_passive() {
        assert_eq!(OperatorKind::Comment.fixed_passivity(), Some(true));
        assert_eq!(OperatorKind::Null.fixed_passivity(), Some(false));
        assert_eq!(OperatorKind::Add.fixed_passivity(), None);
    }

    #[test]
    fn midi_scaling_rounds_up() {
        assert_eq!(scale_to_midi(0), 0);
        assert_eq!(scale_to_midi(1), 4);
        assert_eq!(scale_to_midi(35), 127);
    }
}
