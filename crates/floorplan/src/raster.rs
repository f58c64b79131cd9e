//! Label-grid rasterization.
//!
//! Each room polygon is scan-filled row by row onto a `u8` grid. Cells on
//! the polygon boundary count as inside. Rooms are painted in the order
//! given, so a later room overwrites an earlier one where they overlap.

use log::debug;
use ndarray::Array2;

use crate::rooms::RoomTable;
use crate::scale::GridShape;

/// Class id of cells no room has painted.
pub const BACKGROUND: u8 = 0;

/// Ordered integer vertices in label-grid coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPolygon {
    vertices: Vec<(i32, i32)>,
}

/// One x-intersection of a polygon edge with a scanline.
#[derive(Clone, Copy)]
struct Crossing {
    key: f64,
    floor: i64,
    ceil: i64,
}

impl RoomPolygon {
    pub fn new(vertices: Vec<(i32, i32)>) -> Self {
        Self { vertices }
    }

    pub fn xs(&self) -> impl Iterator<Item = i32> + '_ {
        self.vertices.iter().map(|&(x, _)| x)
    }

    pub fn ys(&self) -> impl Iterator<Item = i32> + '_ {
        self.vertices.iter().map(|&(_, y)| y)
    }

    /// A fill needs at least three distinct vertices.
    pub fn is_degenerate(&self) -> bool {
        let mut distinct: Vec<(i32, i32)> = Vec::with_capacity(3);
        for &v in &self.vertices {
            if !distinct.contains(&v) {
                distinct.push(v);
                if distinct.len() == 3 {
                    return false;
                }
            }
        }
        true
    }

    /// Edges as vertex pairs, closing the ring.
    fn edges(&self) -> impl Iterator<Item = ((i64, i64), (i64, i64))> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| {
            let (x0, y0) = self.vertices[(i + n - 1) % n];
            let (x1, y1) = self.vertices[i];
            ((x0 as i64, y0 as i64), (x1 as i64, y1 as i64))
        })
    }

    /// Visit every filled span as `(row, first_col, last_col)`, inclusive and
    /// clipped to `shape`. Negative rows and columns are skipped; rows and
    /// columns past the far edge collapse onto the last row or column.
    pub fn for_each_span(&self, shape: GridShape, mut visit: impl FnMut(usize, usize, usize)) {
        if self.is_degenerate() || shape.cells() == 0 {
            return;
        }

        let y_min = self.ys().min().unwrap_or(0).max(0) as i64;
        let y_max = self.ys().max().unwrap_or(-1) as i64;
        let max_row = shape.height as i64 - 1;
        let max_col = shape.width as i64 - 1;

        let mut crossings: Vec<Crossing> = Vec::with_capacity(self.vertices.len());
        let mut spans: Vec<(i64, i64)> = Vec::new();

        for y in y_min..=y_max {
            crossings.clear();
            spans.clear();

            for ((x0, y0), (x1, y1)) in self.edges() {
                if y0 == y && y1 == y {
                    spans.push((x0.min(x1), x0.max(x1)));
                    continue;
                }

                // Half-open in y so each vertex is counted by exactly one edge.
                if (y0 > y) == (y1 > y) {
                    continue;
                }

                let (mut num, mut den) = ((y - y0) * (x1 - x0), y1 - y0);
                if den < 0 {
                    num = -num;
                    den = -den;
                }
                crossings.push(Crossing {
                    key: x0 as f64 + num as f64 / den as f64,
                    floor: x0 + num.div_euclid(den),
                    ceil: x0 - (-num).div_euclid(den),
                });
            }

            crossings.sort_by(|a, b| a.key.total_cmp(&b.key));
            for pair in crossings.chunks_exact(2) {
                spans.push((pair[0].ceil, pair[1].floor));
            }

            for &(vx, vy) in &self.vertices {
                if vy as i64 == y {
                    spans.push((vx as i64, vx as i64));
                }
            }

            let row = y.min(max_row) as usize;
            for &(start, end) in &spans {
                let start = start.max(0);
                if start > end {
                    continue;
                }
                visit(row, start.min(max_col) as usize, end.min(max_col) as usize);
            }
        }
    }
}

/// A named room polygon ready for painting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub room_type: String,
    pub polygon: RoomPolygon,
}

/// Per-sample counters reported by `rasterize`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub rooms: usize,
    pub matched: usize,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    cells: Array2<u8>,
}

impl LabelGrid {
    pub fn new(shape: GridShape) -> Self {
        Self {
            cells: Array2::from_elem(shape.dim(), BACKGROUND),
        }
    }

    pub fn shape(&self) -> GridShape {
        let (height, width) = self.cells.dim();
        GridShape { height, width }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[[y, x]]
    }

    pub fn as_array(&self) -> &Array2<u8> {
        &self.cells
    }

    pub fn count(&self, class_id: u8) -> usize {
        self.cells.iter().filter(|&&c| c == class_id).count()
    }

    /// Overwrite every cell of `polygon` with `class_id`.
    pub fn fill_polygon(&mut self, polygon: &RoomPolygon, class_id: u8) {
        let shape = self.shape();
        let cells = &mut self.cells;
        polygon.for_each_span(shape, |row, first, last| {
            cells
                .row_mut(row)
                .slice_mut(ndarray::s![first..=last])
                .fill(class_id);
        });
    }
}

/// Paint `rooms` in order onto a fresh grid. Rooms whose type is not in
/// `table` are skipped.
pub fn rasterize<'a, I>(shape: GridShape, rooms: I, table: &RoomTable) -> (LabelGrid, RasterStats)
where
    I: IntoIterator<Item = &'a Room>,
{
    let mut grid = LabelGrid::new(shape);
    let mut stats = RasterStats::default();

    for room in rooms {
        stats.rooms += 1;

        match table.class_of(&room.room_type) {
            Some(class_id) => {
                stats.matched += 1;
                grid.fill_polygon(&room.polygon, class_id);
            }
            None => {
                debug!("unmatched room type {:?}", room.room_type);
                stats.unmatched.push(room.room_type.clone());
            }
        }
    }

    (grid, stats)
}
