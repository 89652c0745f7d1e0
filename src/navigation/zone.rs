//! Fixed 3x3 partition of the frame into named zones.

use crate::detection::Rect;
use serde::Serialize;
use std::fmt;

const GRID_ROWS: i64 = 3;
const GRID_COLS: i64 = 3;

/// Distance band, top of the frame first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Row {
    Far,
    Mid,
    Near,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Column {
    Left,
    Center,
    Right,
}

const ROWS: [Row; 3] = [Row::Far, Row::Mid, Row::Near];
const COLUMNS: [Column; 3] = [Column::Left, Column::Center, Column::Right];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GridZone {
    pub row: Row,
    pub column: Column,
}

impl GridZone {
    pub const fn new(row: Row, column: Column) -> Self {
        Self { row, column }
    }

    pub fn is_center(&self) -> bool {
        self.column == Column::Center
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Row::Far => "Far",
            Row::Mid => "Mid",
            Row::Near => "Near",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Column::Left => "Left",
            Column::Center => "Center",
            Column::Right => "Right",
        };
        f.write_str(name)
    }
}

impl fmt::Display for GridZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.column)
    }
}

/// Zone lookup for one frame size. Cell sizes use integer division, so the
/// last pixel rows/columns of a frame whose size is not a multiple of three
/// fall outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneGrid {
    cell_width: i64,
    cell_height: i64,
}

impl ZoneGrid {
    pub fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            cell_width: i64::from(frame_width) / GRID_COLS,
            cell_height: i64::from(frame_height) / GRID_ROWS,
        }
    }

    /// Zone containing pixel `(x, y)`, or `None` when it lies off the grid.
    pub fn zone_at(&self, x: i64, y: i64) -> Option<GridZone> {
        if self.cell_width <= 0 || self.cell_height <= 0 || x < 0 || y < 0 {
            return None;
        }
        let row = ROWS.get(usize::try_from(y / self.cell_height).ok()?)?;
        let column = COLUMNS.get(usize::try_from(x / self.cell_width).ok()?)?;
        Some(GridZone::new(*row, *column))
    }

    /// Zone of a box, trying its bottom-center, then its center, then its
    /// top-center.
    pub fn zone_for(&self, rect: &Rect) -> Option<GridZone> {
        let x = (rect.x + rect.width / 2.0) as i64;
        [rect.bottom(), rect.y + rect.height / 2.0, rect.y]
            .into_iter()
            .find_map(|y| self.zone_at(x, y as i64))
    }
}
