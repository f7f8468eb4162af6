use crate::common::*;

/// A closed polygon in integer pixel coordinates.
///
/// The last vertex connects back to the first one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    xs: Vec<i64>,
    ys: Vec<i64>,
}

impl Polygon {
    pub fn new(xs: Vec<i64>, ys: Vec<i64>) -> Result<Self> {
        ensure!(
            xs.len() == ys.len(),
            "the polygon has {} x coordinates but {} y coordinates",
            xs.len(),
            ys.len()
        );
        Ok(Self { xs, ys })
    }

    pub fn xs(&self) -> &[i64] {
        &self.xs
    }

    pub fn ys(&self) -> &[i64] {
        &self.ys
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Iterate over `(x, y)` vertices.
    pub fn vertices(&self) -> impl Iterator<Item = (i64, i64)> + Clone + '_ {
        self.xs.iter().cloned().zip(self.ys.iter().cloned())
    }

    /// Iterate over the edges, including the closing one.
    pub fn edges(&self) -> impl Iterator<Item = ((i64, i64), (i64, i64))> + '_ {
        self.vertices().zip(self.vertices().cycle().skip(1))
    }

    /// The smallest box containing every vertex, in pixel units.
    pub fn bounds(&self) -> Option<TLBR<i64>> {
        let (l, r) = self.xs.iter().cloned().minmax().into_option()?;
        let (t, b) = self.ys.iter().cloned().minmax().into_option()?;
        TLBR::try_from_tlbr([t, l, b + 1, r + 1]).ok()
    }

    /// Set every pixel covered by the polygon to `true`.
    ///
    /// A pixel at `(row, col)` is covered when the point `(x = col, y = row)` lies inside
    /// the polygon under the even-odd rule, or lies on one of its edges. Parts of the
    /// polygon outside the plane are clipped. Polygons with fewer than three vertices
    /// cover nothing.
    pub fn rasterize_into(&self, mut plane: ArrayViewMut2<bool>) {
        let (height, width) = plane.dim();
        if self.len() < 3 || height == 0 || width == 0 {
            return;
        }
        let max_row = height as i64 - 1;
        let max_col = width as i64 - 1;

        let bounds = match self.bounds() {
            Some(bounds) => bounds,
            None => return,
        };

        // interior, scanned row by row
        let mut crossings = vec![];
        for row in bounds.t().max(0)..bounds.b().min(height as i64) {
            crossings.clear();
            crossings.extend(self.edges().filter_map(|((x0, y0), (x1, y1))| {
                let crosses = (y0 <= row && row < y1) || (y1 <= row && row < y0);
                crosses.then(|| {
                    x0 as f64 + (row - y0) as f64 * (x1 - x0) as f64 / (y1 - y0) as f64
                })
            }));
            crossings.sort_by(|lhs, rhs| lhs.total_cmp(rhs));

            for span in crossings.chunks_exact(2) {
                let first = (span[0].ceil() as i64).max(0);
                let last = (span[1].floor() as i64).min(max_col);
                for col in first..=last {
                    plane[[row as usize, col as usize]] = true;
                }
            }
        }

        // boundary, walking the lattice points of each edge
        for ((x0, y0), (x1, y1)) in self.edges() {
            let dx = x1 - x0;
            let dy = y1 - y0;
            let steps = gcd(dx.abs(), dy.abs());
            let (sx, sy) = if steps == 0 {
                (0, 0)
            } else {
                (dx / steps, dy / steps)
            };

            let range = step_range(x0, sx, max_col, steps)
                .zip(step_range(y0, sy, max_row, steps))
                .map(|((xa, xb), (ya, yb))| (xa.max(ya), xb.min(yb)));
            let (first, last) = match range {
                Some(range) => range,
                None => continue,
            };

            for k in first..=last {
                let col = x0 + k * sx;
                let row = y0 + k * sy;
                plane[[row as usize, col as usize]] = true;
            }
        }
    }
}

fn gcd(mut lhs: i64, mut rhs: i64) -> i64 {
    while rhs != 0 {
        let rem = lhs % rhs;
        lhs = rhs;
        rhs = rem;
    }
    lhs
}

/// The range of `k` in `[0, steps]` such that `start + k * step` lies in `[0, upper]`.
fn step_range(start: i64, step: i64, upper: i64, steps: i64) -> Option<(i64, i64)> {
    let (first, last) = match step {
        0 => {
            if !(0..=upper).contains(&start) {
                return None;
            }
            (0, steps)
        }
        step if step > 0 => (div_ceil(-start, step), div_floor(upper - start, step)),
        step => {
            let step = -step;
            (div_ceil(start - upper, step), div_floor(start, step))
        }
    };
    let first = first.max(0);
    let last = last.min(steps);
    (first <= last).then(|| (first, last))
}

fn div_floor(lhs: i64, rhs: i64) -> i64 {
    lhs.div_euclid(rhs)
}

fn div_ceil(lhs: i64, rhs: i64) -> i64 {
    -(-lhs).div_euclid(rhs)
}
