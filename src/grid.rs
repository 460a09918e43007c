//! Board data model: positions, orbs, cells, the grid itself, enhanced flags and the generator.

use rand::Rng;
use rand::rngs::StdRng;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Board height in rows. Row 0 is the top.
pub const ROWS: usize = 5;
/// Board width in columns.
pub const COLS: usize = 6;

/// Shortest run that counts as a match.
pub const MIN_RUN: usize = 3;

/// A cell coordinate. Used as a map key; never formatted into strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Player movement: any of the 8 surrounding cells.
    pub fn is_adjacent8(self, other: Self) -> bool {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        dr <= 1 && dc <= 1 && dr + dc > 0
    }

    /// Resolution geometry: up, down, left, right (inside the board only).
    pub fn neighbours4(self) -> impl Iterator<Item = Self> {
        const DIRS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        DIRS.into_iter().filter_map(move |(dr, dc)| self.offset(dr, dc))
    }

    /// Step by (dr, dc); `None` when the result leaves the board.
    pub fn offset(self, dr: isize, dc: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < ROWS && col < COLS).then_some(Self { row, col })
    }

    /// Step by (dr, dc), clamped to the board edge.
    pub fn offset_clamped(self, dr: isize, dc: isize) -> Self {
        Self {
            row: self.row.saturating_add_signed(dr).min(ROWS - 1),
            col: self.col.saturating_add_signed(dc).min(COLS - 1),
        }
    }

    /// Every board position in row-major order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..ROWS).flat_map(|row| (0..COLS).map(move |col| Self { row, col }))
    }
}

/// Orb colours. Order matters: generator, detector and renderer share them by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orb {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Heart,
}

impl Orb {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Purple,
        Self::Heart,
    ];

    /// Index into the colour set (and into `Theme::orbs`).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Blue => 'B',
            Self::Green => 'G',
            Self::Yellow => 'Y',
            Self::Purple => 'P',
            Self::Heart => 'H',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.letter() == c.to_ascii_uppercase())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
            Self::Heart => "heart",
        }
    }
}

/// Single cell: either empty or holding an orb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Orb(Orb),
}

impl Cell {
    pub fn orb(self) -> Option<Orb> {
        match self {
            Self::Empty => None,
            Self::Orb(o) => Some(o),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

/// ROWS x COLS matrix of cells. `cells[row][col]`, row 0 is top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[Cell; COLS]; ROWS],
}

impl Grid {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fill row-major so that no placed orb completes a run of three.
    ///
    /// For each cell the colour of the two preceding same-row cells is forbidden when they
    /// match, likewise the two preceding same-column cells. At most two colours are ever
    /// forbidden, so with three or more colours there is always a choice left.
    pub fn generate<R: Rng>(rng: &mut R, colors: usize) -> Self {
        let colors = colors.clamp(MIN_RUN, Orb::ALL.len());
        let mut grid = Self::empty();
        for pos in Pos::all() {
            let mut forbidden = [false; 6];
            if pos.col >= 2 {
                let a = grid.get(Pos::new(pos.row, pos.col - 1));
                if let Some(o) = a.orb().filter(|_| a == grid.get(Pos::new(pos.row, pos.col - 2))) {
                    forbidden[o.index()] = true;
                }
            }
            if pos.row >= 2 {
                let a = grid.get(Pos::new(pos.row - 1, pos.col));
                if let Some(o) = a.orb().filter(|_| a == grid.get(Pos::new(pos.row - 2, pos.col))) {
                    forbidden[o.index()] = true;
                }
            }
            let allowed: Vec<Orb> = Orb::ALL[..colors]
                .iter()
                .copied()
                .filter(|o| !forbidden[o.index()])
                .collect();
            let pick = allowed[rng.random_range(0..allowed.len())];
            grid.set(pos, Cell::Orb(pick));
        }
        grid
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Cell {
        self.cells[pos.row][pos.col]
    }

    #[inline]
    pub fn set(&mut self, pos: Pos, cell: Cell) {
        self.cells[pos.row][pos.col] = cell;
    }

    pub fn swap(&mut self, a: Pos, b: Pos) {
        let tmp = self.get(a);
        self.set(a, self.get(b));
        self.set(b, tmp);
    }

    pub fn empty_count(&self) -> usize {
        Pos::all().filter(|&p| self.get(p).is_empty()).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.cells.iter().enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            for cell in row {
                let c = cell.orb().map_or('.', Orb::letter);
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridParseError {
    #[error("wrong number of rows: {0}")]
    RowCount(usize),
    #[error("row {row}: wrong number of cells: {found}")]
    RowWidth { row: usize, found: usize },
    #[error("row {row}: unknown orb '{ch}'")]
    UnknownOrb { row: usize, ch: char },
}

/// Parse a layout of ROWS lines, COLS letters each (`R B G Y P H`, `.` for empty).
impl FromStr for Grid {
    type Err = GridParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() != ROWS {
            return Err(GridParseError::RowCount(lines.len()));
        }
        let mut grid = Self::empty();
        for (row, line) in lines.iter().enumerate() {
            let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if chars.len() != COLS {
                return Err(GridParseError::RowWidth { row, found: chars.len() });
            }
            for (col, ch) in chars.into_iter().enumerate() {
                let cell = if ch == '.' {
                    Cell::Empty
                } else {
                    Cell::Orb(Orb::from_letter(ch).ok_or(GridParseError::UnknownOrb { row, ch })?)
                };
                grid.set(Pos::new(row, col), cell);
            }
        }
        Ok(grid)
    }
}

/// Positions currently holding an enhanced orb. Membership only; colour stays in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnhancedSet {
    flags: [[bool; COLS]; ROWS],
}

impl EnhancedSet {
    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        self.flags[pos.row][pos.col]
    }

    pub fn insert(&mut self, pos: Pos) {
        self.flags[pos.row][pos.col] = true;
    }

    pub fn remove(&mut self, pos: Pos) {
        self.flags[pos.row][pos.col] = false;
    }

    pub fn swap(&mut self, a: Pos, b: Pos) {
        let tmp = self.contains(a);
        self.flags[a.row][a.col] = self.contains(b);
        self.flags[b.row][b.col] = tmp;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Pos> + '_ {
        Pos::all().filter(|&p| self.contains(p))
    }
}

/// An enhanced orb waiting to be spawned at the top of `col` by the next gravity pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEnhanced {
    pub col: usize,
    pub orb: Orb,
}

/// Everything the engine owns about the board.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub grid: Grid,
    pub enhanced: EnhancedSet,
    /// Consumed exactly once by the next enhanced-aware gravity pass.
    pub pending: Vec<PendingEnhanced>,
}

/// Where new orbs come from during refill.
pub trait OrbSource {
    fn next_orb(&mut self) -> Orb;
}

/// Uniform random orbs from the first `colors` entries of the colour set.
#[derive(Debug, Clone)]
pub struct RandomOrbs {
    pub rng: StdRng,
    pub colors: usize,
}

impl RandomOrbs {
    pub fn new(rng: StdRng, colors: usize) -> Self {
        Self {
            rng,
            colors: colors.clamp(MIN_RUN, Orb::ALL.len()),
        }
    }

    pub fn generate_grid(&mut self) -> Grid {
        Grid::generate(&mut self.rng, self.colors)
    }
}

impl OrbSource for RandomOrbs {
    fn next_orb(&mut self) -> Orb {
        Orb::ALL[self.rng.random_range(0..self.colors)]
    }
}

/// Replays a fixed sequence of orbs, cycling when exhausted.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedOrbs {
    seq: Vec<Orb>,
    next: usize,
}

#[cfg(test)]
impl ScriptedOrbs {
    pub fn new(letters: &str) -> Self {
        let seq = letters.chars().filter_map(Orb::from_letter).collect();
        Self { seq, next: 0 }
    }
}

#[cfg(test)]
impl OrbSource for ScriptedOrbs {
    fn next_orb(&mut self) -> Orb {
        let o = self.seq[self.next % self.seq.len()];
        self.next += 1;
        o
    }
}
