#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative playfield state for the orca engine.
//!
//! The [`Grid`] owns the glyph buffer, the frame counter and the tick-scoped
//! lock array and variable table. Operators are rebuilt from the buffer on
//! every tick and executed in raster order; they only ever touch the grid
//! through its bounds-checked methods.

use std::{collections::BTreeMap, fmt};

use orca_core::{
    glyph::{self, BANG, EMPTY},
    Command, Event, Position, MAX_FRAME,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

mod library;
mod operator;

pub use library::OperatorKind;

use operator::Operator;

/// Seed used by [`Grid::new`] for the random operator.
pub const DEFAULT_SEED: u64 = 0x6f72_6361_5eed_0001;

/// Row-major glyph buffer plus the state scoped to the current tick.
#[derive(Debug)]
pub struct Grid {
    width: u32,
    height: u32,
    frame: u64,
    cells: Vec<char>,
    locks: Vec<bool>,
    variables: BTreeMap<char, char>,
    rng: ChaCha8Rng,
    runtime: Vec<OperatorSnapshot>,
}

impl Grid {
    /// Creates a blank grid seeded with [`DEFAULT_SEED`].
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_seed(width, height, DEFAULT_SEED)
    }

    /// Creates a blank grid whose random operator draws from the given seed.
    #[must_use]
    pub fn with_seed(width: u32, height: u32, seed: u64) -> Self {
        let mut grid = Self {
            width: 0,
            height: 0,
            frame: 0,
            cells: Vec::new(),
            locks: Vec::new(),
            variables: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            runtime: Vec::new(),
        };
        grid.reset(width, height);
        grid
    }

    /// Replaces the buffer with `width * height` empty glyphs and rewinds the frame.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.frame = 0;
        self.resize(width, height);
        self.cells.fill(EMPTY);
    }

    /// Installs a program, sanitising every glyph and padding or truncating it
    /// to the grid area. The frame counter is left untouched.
    pub fn load(&mut self, width: u32, height: u32, source: &str) {
        self.resize(width, height);
        let area = self.cells.len();
        let cleaned: String = source.chars().filter(|c| *c != '\n' && *c != '\r').collect();
        let glyphs = cleaned
            .trim()
            .chars()
            .take(area)
            .map(glyph::sanitize)
            .chain(std::iter::repeat(EMPTY));
        for (cell, glyph) in self.cells.iter_mut().zip(glyphs) {
            *cell = glyph;
        }
        debug!(width, height, "program loaded");
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let area = width as usize * height as usize;
        self.cells.resize(area, EMPTY);
        self.locks = vec![false; area];
        self.variables.clear();
        self.runtime.clear();
    }

    /// Stores a glyph, returning whether the buffer changed.
    ///
    /// Writes outside the grid and writes of the glyph already stored are
    /// rejected. A disallowed glyph is then stored as the empty glyph.
    pub fn write(&mut self, x: i32, y: i32, glyph: char) -> bool {
        let Some(index) = self.index_at(x, y) else {
            return false;
        };
        if self.cells[index] == glyph {
            return false;
        }
        self.cells[index] = glyph::sanitize(glyph);
        true
    }

    /// Stores a glyph given as text; anything other than exactly one
    /// character is rejected.
    pub fn write_str(&mut self, x: i32, y: i32, text: &str) -> bool {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(glyph), None) => self.write(x, y, glyph),
            _ => false,
        }
    }

    /// Writes a newline-delimited block with its upper-left corner at `(x, y)`.
    ///
    /// With `overlap` set, empty glyphs in the block keep the existing content.
    pub fn write_block(&mut self, x: i32, y: i32, block: &str, overlap: bool) {
        for (row, line) in block.lines().enumerate() {
            let cy = y.saturating_add(row as i32);
            for (column, glyph) in line.chars().enumerate() {
                let cx = x.saturating_add(column as i32);
                if overlap && glyph == EMPTY {
                    continue;
                }
                let _ = self.write(cx, cy, glyph);
            }
        }
    }

    /// Reads a rectangle as newline-terminated rows.
    #[must_use]
    pub fn block(&self, x: i32, y: i32, width: u32, height: u32) -> String {
        let mut lines = String::with_capacity(
            (width.min(self.width) as usize + 1) * height.min(self.height) as usize,
        );
        let rows = i32::try_from(height).unwrap_or(i32::MAX);
        let columns = i32::try_from(width).unwrap_or(i32::MAX);
        for row in 0..rows {
            for column in 0..columns {
                lines.push(self.glyph_at(x.saturating_add(column), y.saturating_add(row)));
            }
            lines.push('\n');
        }
        lines
    }

    /// Glyph stored at the cell, or the empty glyph outside the grid.
    #[must_use]
    pub fn glyph_at(&self, x: i32, y: i32) -> char {
        self.index_at(x, y).map_or(EMPTY, |index| self.cells[index])
    }

    /// Base-36 value of the glyph stored at the cell.
    #[must_use]
    pub fn value_at(&self, x: i32, y: i32) -> u32 {
        glyph::value_of(self.glyph_at(x, y))
    }

    /// Scans the buffer in raster order and describes every operator found.
    #[must_use]
    pub fn parse(&self) -> Vec<OperatorSnapshot> {
        self.operators().iter().map(Operator::snapshot).collect()
    }

    fn operators(&self) -> Vec<Operator> {
        let mut operators = Vec::new();
        for (index, glyph) in self.cells.iter().enumerate() {
            if *glyph == EMPTY {
                continue;
            }
            if let Some(kind) = OperatorKind::from_glyph(*glyph) {
                operators.push(Operator::new(kind, self.position_at(index), *glyph));
            }
        }
        operators
    }

    /// Executes one frame: release, raster-order execution, frame advance.
    pub fn tick(&mut self, out: &mut Vec<Event>) {
        let mut operators = self.operators();
        self.release();

        for operator in &mut operators {
            let position = operator.position();
            if self.lock_at(position.x(), position.y()) {
                continue;
            }
            if operator.passive() || operator.has_neighbor(self, BANG) {
                operator.run(self, false, out);
            }
        }

        self.runtime = operators.iter().map(Operator::snapshot).collect();
        self.frame = self.frame.saturating_add(1);
        trace!(frame = self.frame, operators = self.runtime.len(), "frame advanced");
        out.push(Event::FrameAdvanced { frame: self.frame });
    }

    /// Runs the operator hosted at the cell once with `force` set, returning
    /// whether an operator was found.
    pub fn trigger(&mut self, x: i32, y: i32, out: &mut Vec<Event>) -> bool {
        let glyph = self.glyph_at(x, y);
        let Some(kind) = OperatorKind::from_glyph(glyph) else {
            return false;
        };
        let mut operator = Operator::new(kind, Position::new(x, y), glyph);
        debug!(x, y, kind = kind.name(), "operator triggered");
        operator.run(self, true, out);
        true
    }

    /// Write-protects a cell for the rest of the tick.
    pub fn lock(&mut self, x: i32, y: i32) {
        if let Some(index) = self.index_at(x, y) {
            self.locks[index] = true;
        }
    }

    /// Lifts the protection of a cell.
    pub fn unlock(&mut self, x: i32, y: i32) {
        if let Some(index) = self.index_at(x, y) {
            self.locks[index] = false;
        }
    }

    /// Reports whether a cell is protected in the current tick.
    #[must_use]
    pub fn lock_at(&self, x: i32, y: i32) -> bool {
        self.index_at(x, y).is_some_and(|index| self.locks[index])
    }

    /// Clears every lock and the variable table.
    pub fn release(&mut self) {
        self.locks.fill(false);
        self.variables.clear();
    }

    /// Value stored under a variable name, or the empty glyph.
    #[must_use]
    pub fn variable(&self, key: char) -> char {
        self.variables.get(&key).copied().unwrap_or(EMPTY)
    }

    pub(crate) fn set_variable(&mut self, key: char, value: char) {
        let _ = self.variables.insert(key, value);
    }

    pub(crate) fn random_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Largest column and row holding a non-empty glyph.
    #[must_use]
    pub fn bounds(&self) -> (u32, u32) {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, glyph)| **glyph != EMPTY)
            .map(|(index, _)| self.position_at(index))
            .fold((0, 0), |(w, h), position| {
                (w.max(position.x() as u32), h.max(position.y() as u32))
            })
    }

    /// Number of alphanumeric glyphs in the buffer.
    #[must_use]
    pub fn length(&self) -> usize {
        self.strip().chars().count()
    }

    /// Buffer contents reduced to its alphanumeric glyphs.
    #[must_use]
    pub fn strip(&self) -> String {
        self.cells
            .iter()
            .filter(|glyph| glyph.is_ascii_alphanumeric())
            .collect()
    }

    /// Measures a text block as `(columns of the first row, rows)`.
    #[must_use]
    pub fn to_rect(text: &str) -> (usize, usize) {
        let trimmed = text.trim();
        let width = trimmed.lines().next().map_or(0, |line| line.chars().count());
        let height = trimmed.lines().count().max(1);
        (width, height)
    }

    /// Renders the buffer as newline-terminated rows.
    #[must_use]
    pub fn format(&self) -> String {
        let width = self.width as usize;
        let mut text = String::with_capacity(self.cells.len() + self.height as usize);
        if width == 0 {
            return text;
        }
        for row in self.cells.chunks(width) {
            text.extend(row.iter());
            text.push('\n');
        }
        text
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Frames executed since the last reset.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Moves the frame counter, clamped into `[0, MAX_FRAME]`.
    pub fn set_frame(&mut self, frame: i64) {
        self.frame = u64::try_from(frame.max(0)).unwrap_or(0).min(MAX_FRAME);
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Buffer index of an in-bounds cell.
    #[must_use]
    pub const fn index_at(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some(x as usize + self.width as usize * y as usize)
        } else {
            None
        }
    }

    /// Cell addressed by a buffer index.
    #[must_use]
    pub const fn position_at(&self, index: usize) -> Position {
        let width = if self.width == 0 { 1 } else { self.width as usize };
        Position::new((index % width) as i32, (index / width) as i32)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format().trim())
    }
}

/// How a port cell relates to its operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortRole {
    /// Operand read from the west or north.
    Haste,
    /// Operand read from the east or south.
    Input,
    /// Cell receiving the result.
    Output,
    /// Output cell whose previous content is also read.
    Reader,
}

/// Port as seen by render collaborators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSnapshot {
    /// Absolute cell referenced by the port.
    pub position: Position,
    /// Role of the port cell.
    pub role: PortRole,
    /// `<glyph>-<port name>` label.
    pub label: String,
}

/// Read-only description of an operator after it executed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorSnapshot {
    /// Variant hosted by the glyph.
    pub kind: OperatorKind,
    /// Cell the operator occupied at the end of its run.
    pub position: Position,
    /// Source glyph.
    pub glyph: char,
    /// Whether the operator runs without a bang.
    pub passive: bool,
    /// Whether render collaborators should draw the operator.
    pub renderable: bool,
    /// Declared ports, listed for passive operators only.
    pub ports: Vec<PortSnapshot>,
}

/// Applies the provided command to the grid, mutating state deterministically.
pub fn apply(grid: &mut Grid, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Reset { width, height } => grid.reset(width, height),
        Command::Load {
            width,
            height,
            source,
        } => grid.load(width, height, &source),
        Command::Write { position, glyph } => {
            let _ = grid.write(position.x(), position.y(), glyph);
        }
        Command::WriteBlock {
            origin,
            block,
            overlap,
        } => grid.write_block(origin.x(), origin.y(), &block, overlap),
        Command::Tick => grid.tick(out_events),
        Command::Trigger { position } => {
            let _ = grid.trigger(position.x(), position.y(), out_events);
        }
        Command::SetFrame { frame } => grid.set_frame(frame),
    }
}

/// Query functions that provide read-only access to the grid state.
pub mod query {
    use orca_core::Position;

    use super::{Grid, OperatorSnapshot};

    /// Operators executed during the most recent tick, in raster order.
    #[must_use]
    pub fn operators(grid: &Grid) -> &[OperatorSnapshot] {
        &grid.runtime
    }

    /// Operator that ended the most recent tick on the cell, if any.
    #[must_use]
    pub fn operator_at(grid: &Grid, position: Position) -> Option<&OperatorSnapshot> {
        grid.runtime
            .iter()
            .find(|operator| operator.position == position)
    }

    /// Variables assigned during the most recent tick, ordered by name.
    pub fn variables(grid: &Grid) -> impl Iterator<Item = (char, char)> + '_ {
        grid.variables.iter().map(|(key, value)| (*key, *value))
    }
}
