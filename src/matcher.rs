//! Match detection (runs of three or more) and same-colour grouping of matched cells.

use crate::grid::{Cell, Grid, MIN_RUN, Orb, Pos, COLS, ROWS};
use std::collections::VecDeque;

/// A group this size or larger is a big match and spawns an enhanced orb.
pub const BIG_MATCH: usize = 5;

/// true = part of a run of three or more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkMatrix {
    marks: [[bool; COLS]; ROWS],
}

impl MarkMatrix {
    #[inline]
    pub fn get(&self, pos: Pos) -> bool {
        self.marks[pos.row][pos.col]
    }

    fn mark(&mut self, pos: Pos) {
        self.marks[pos.row][pos.col] = true;
    }

    pub fn count(&self) -> usize {
        self.positions().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        Pos::all().filter(|&p| self.get(p))
    }
}

/// Output of one detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchReport {
    pub marks: MarkMatrix,
    /// Colour-agnostic connected regions of marked cells. A horizontal run of one colour
    /// touching a vertical run of another is a single combo here, but two groups for
    /// [`group_by_color`]. Scoring uses groups; this count only feeds bulk resolution.
    pub combos: usize,
}

/// Scan rows then columns for maximal runs of `MIN_RUN` or more equal orbs.
pub fn find_matches(grid: &Grid) -> MatchReport {
    let mut marks = MarkMatrix::default();
    for row in 0..ROWS {
        mark_runs(grid, &mut marks, (0..COLS).map(|col| Pos::new(row, col)));
    }
    for col in 0..COLS {
        mark_runs(grid, &mut marks, (0..ROWS).map(|row| Pos::new(row, col)));
    }
    let combos = count_regions(&marks);
    MatchReport { marks, combos }
}

/// Mark every maximal run of at least `MIN_RUN` along one line of positions.
fn mark_runs(grid: &Grid, marks: &mut MarkMatrix, line: impl Iterator<Item = Pos>) {
    let line: Vec<Pos> = line.collect();
    let mut start = 0;
    while start < line.len() {
        let cell = grid.get(line[start]);
        if cell.is_empty() {
            start += 1;
            continue;
        }
        let len = line[start..]
            .iter()
            .take_while(|&&p| grid.get(p) == cell)
            .count();
        if len >= MIN_RUN {
            for &p in &line[start..start + len] {
                marks.mark(p);
            }
        }
        start += len;
    }
}

/// Breadth-first flood fill over marked cells, ignoring colour.
fn count_regions(marks: &MarkMatrix) -> usize {
    let mut visited = [[false; COLS]; ROWS];
    let mut regions = 0;
    for start in marks.positions() {
        if visited[start.row][start.col] {
            continue;
        }
        regions += 1;
        visited[start.row][start.col] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            for n in p.neighbours4() {
                if marks.get(n) && !visited[n.row][n.col] {
                    visited[n.row][n.col] = true;
                    queue.push_back(n);
                }
            }
        }
    }
    regions
}

/// Same-colour, 4-connected region of matched cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub orb: Orb,
    pub cells: Vec<Pos>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_big(&self) -> bool {
        self.len() >= BIG_MATCH
    }

    /// Member with the greatest row; ties go to the leftmost column.
    pub fn lowest(&self) -> Option<Pos> {
        self.cells
            .iter()
            .copied()
            .max_by(|a, b| a.row.cmp(&b.row).then(b.col.cmp(&a.col)))
    }
}

/// Partition marked cells into same-colour connected groups, in row-major order of their
/// first cell.
pub fn group_by_color(grid: &Grid, marks: &MarkMatrix) -> Vec<Group> {
    let mut visited = [[false; COLS]; ROWS];
    let mut groups = Vec::new();
    for start in marks.positions() {
        if visited[start.row][start.col] {
            continue;
        }
        let Cell::Orb(orb) = grid.get(start) else {
            continue;
        };
        let mut cells = Vec::new();
        let mut stack = vec![start];
        visited[start.row][start.col] = true;
        while let Some(p) = stack.pop() {
            cells.push(p);
            for n in p.neighbours4() {
                if !visited[n.row][n.col] && marks.get(n) && grid.get(n) == Cell::Orb(orb) {
                    visited[n.row][n.col] = true;
                    stack.push(n);
                }
            }
        }
        groups.push(Group { orb, cells });
    }
    groups
}
