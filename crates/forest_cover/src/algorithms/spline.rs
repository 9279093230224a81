//! Periodic cubic interpolating spline for closed polygons.
//!
//! The curve passes exactly through every vertex. Parameters follow the cumulative chord length
//! normalised to `[0, 1]`, and the curve is C2-continuous across the closing vertex.

use crate::types::PixelPoint;

/// Closed curve through a ring of vertices
#[derive(Debug, Clone)]
pub struct PeriodicSpline {
    /// Knot parameters, `knots.len() == vertices + 1`, last is 1.0
    knots: Vec<f64>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots (one per vertex)
    mx: Vec<f64>,
    my: Vec<f64>,
}

impl PeriodicSpline {
    /// Fit through a closed ring (`first == last`). Consecutive duplicates are ignored.
    /// Returns `None` for an empty ring.
    pub fn fit(ring: &[PixelPoint]) -> Option<Self> {
        let mut vertices: Vec<(f64, f64)> = Vec::with_capacity(ring.len());
        for &[x, y] in ring {
            let point = (x as f64, y as f64);
            if vertices.last() != Some(&point) {
                vertices.push(point);
            }
        }
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.is_empty() {
            return None;
        }

        let m = vertices.len();
        let xs: Vec<f64> = vertices.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = vertices.iter().map(|p| p.1).collect();

        let mut knots = Vec::with_capacity(m + 1);
        knots.push(0.0);
        let mut total = 0.0;
        for i in 0..m {
            let j = (i + 1) % m;
            total += (xs[j] - xs[i]).hypot(ys[j] - ys[i]);
            knots.push(total);
        }
        if total > 0.0 {
            for knot in &mut knots {
                *knot /= total;
            }
        }
        // Exact end parameter regardless of rounding
        knots[m] = 1.0;

        let steps: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();
        let (mx, my) = if m >= 3 {
            (
                second_derivatives(&steps, &xs),
                second_derivatives(&steps, &ys),
            )
        } else {
            // Fewer than three vertices: piecewise linear
            (vec![0.0; m], vec![0.0; m])
        };

        Some(Self { knots, xs, ys, mx, my })
    }

    pub fn vertex_count(&self) -> usize {
        self.xs.len()
    }

    /// Evaluate at `u` in `[0, 1]`; knot parameters return their vertex exactly
    pub fn evaluate(&self, u: f64) -> (f64, f64) {
        let m = self.xs.len();
        let u = u.clamp(0.0, 1.0);

        // first knot strictly greater than u, minus one
        let segment = self.knots.partition_point(|&k| k <= u).saturating_sub(1).min(m - 1);
        let next = (segment + 1) % m;
        let (t0, t1) = (self.knots[segment], self.knots[segment + 1]);

        if u == t0 {
            return (self.xs[segment], self.ys[segment]);
        }
        if u == t1 {
            return (self.xs[next], self.ys[next]);
        }

        let h = t1 - t0;
        if h <= 0.0 {
            return (self.xs[segment], self.ys[segment]);
        }
        let a = (t1 - u) / h;
        let b = (u - t0) / h;
        let blend = |values: &[f64], second: &[f64]| {
            a * values[segment]
                + b * values[next]
                + ((a * a * a - a) * second[segment] + (b * b * b - b) * second[next]) * h * h / 6.0
        };

        (blend(&self.xs, &self.mx), blend(&self.ys, &self.my))
    }

    /// Evaluate at `count` uniformly spaced parameters in `[0, 1]` (both ends included),
    /// truncating toward zero
    pub fn resample(&self, count: usize) -> Vec<PixelPoint> {
        match count {
            0 => Vec::new(),
            1 => {
                let (x, y) = self.evaluate(0.0);
                vec![[x as i32, y as i32]]
            }
            _ => (0..count)
                .map(|i| {
                    let u = i as f64 / (count - 1) as f64;
                    let (x, y) = self.evaluate(u);
                    [x as i32, y as i32]
                })
                .collect(),
        }
    }
}

/// Fit a periodic spline through `ring` and resample it at `factor` × `ring.len()` points
pub fn smooth_closed_ring(ring: &[PixelPoint], factor: usize) -> Vec<PixelPoint> {
    match PeriodicSpline::fit(ring) {
        Some(spline) => spline.resample(ring.len() * factor),
        None => Vec::new(),
    }
}

/// Solve the cyclic tridiagonal system of the periodic cubic spline for the second derivatives.
///
/// Row `i`: `h[i-1] M[i-1] + 2 (h[i-1] + h[i]) M[i] + h[i] M[i+1] = 6 (d[i] - d[i-1])`,
/// indices modulo `m`, with `d[i] = (y[i+1] - y[i]) / h[i]`.
fn second_derivatives(steps: &[f64], values: &[f64]) -> Vec<f64> {
    let m = values.len();
    let slope = |i: usize| {
        let j = (i + 1) % m;
        if steps[i] > 0.0 {
            (values[j] - values[i]) / steps[i]
        } else {
            0.0
        }
    };

    let mut sub = vec![0.0; m];
    let mut diag = vec![0.0; m];
    let mut sup = vec![0.0; m];
    let mut rhs = vec![0.0; m];
    for i in 0..m {
        let prev = (i + m - 1) % m;
        sub[i] = steps[prev];
        diag[i] = 2.0 * (steps[prev] + steps[i]);
        sup[i] = steps[i];
        rhs[i] = 6.0 * (slope(i) - slope(prev));
    }

    // Sherman-Morrison: corners A[0][m-1] = sub[0], A[m-1][0] = sup[m-1]
    let corner_top = sub[0];
    let corner_bottom = sup[m - 1];
    let gamma = -diag[0];

    let mut modified = diag.clone();
    modified[0] -= gamma;
    modified[m - 1] -= corner_bottom * corner_top / gamma;

    let solution = solve_tridiagonal(&sub, &modified, &sup, &rhs);

    let mut correction = vec![0.0; m];
    correction[0] = gamma;
    correction[m - 1] = corner_bottom;
    let z = solve_tridiagonal(&sub, &modified, &sup, &correction);

    let factor = (solution[0] + corner_top * solution[m - 1] / gamma)
        / (1.0 + z[0] + corner_top * z[m - 1] / gamma);

    solution
        .iter()
        .zip(&z)
        .map(|(s, z)| s - factor * z)
        .collect()
}

/// Thomas algorithm; `sub[0]` and `sup[n-1]` are ignored
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    c[0] = sup[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - sub[i] * c[i - 1];
        c[i] = if i + 1 < n { sup[i] / denom } else { 0.0 };
        d[i] = (rhs[i] - sub[i] * d[i - 1]) / denom;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d[i] - c[i] * x[i + 1];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[PixelPoint]) -> Vec<PixelPoint> {
        let mut ring = points.to_vec();
        ring.push(points[0]);
        ring
    }

    #[test]
    fn test_resample_is_closed_with_five_times_points() {
        let simplified = ring(&[[10, 10], [90, 12], [85, 88], [14, 80], [5, 45]]);
        let smooth = smooth_closed_ring(&simplified, 5);

        assert_eq!(smooth.len(), simplified.len() * 5);
        assert_eq!(smooth.first(), smooth.last());
        assert_eq!(smooth[0], [10, 10]);
    }

    #[test]
    fn test_spline_interpolates_vertices() {
        let simplified = ring(&[[0, 0], [100, 0], [120, 60], [40, 90]]);
        let spline = PeriodicSpline::fit(&simplified).unwrap();
        assert_eq!(spline.vertex_count(), 4);

        for (i, &[x, y]) in simplified[..4].iter().enumerate() {
            let (sx, sy) = spline.evaluate(spline.knots[i]);
            assert_eq!((sx, sy), (x as f64, y as f64));
        }
    }

    #[test]
    fn test_curve_is_continuous_across_closure() {
        let simplified = ring(&[[0, 0], [100, 0], [100, 100], [0, 100]]);
        let spline = PeriodicSpline::fit(&simplified).unwrap();

        let (ax, ay) = spline.evaluate(1.0 - 1e-9);
        let (bx, by) = spline.evaluate(1e-9);
        assert!((ax - bx).abs() < 1e-4 && (ay - by).abs() < 1e-4);
    }

    #[test]
    fn test_square_is_symmetric() {
        let simplified = ring(&[[0, 0], [100, 0], [100, 100], [0, 100]]);
        let spline = PeriodicSpline::fit(&simplified).unwrap();

        // midpoint of the first edge bulges outward (negative y) by the same amount as the
        // midpoint of the second edge bulges past x = 100
        let (_, y_mid) = spline.evaluate(0.125);
        let (x_mid, _) = spline.evaluate(0.375);
        assert!(y_mid < 0.0);
        assert!((-y_mid - (x_mid - 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_rings() {
        assert!(PeriodicSpline::fit(&[]).is_none());

        let single = smooth_closed_ring(&[[3, 4], [3, 4]], 5);
        assert_eq!(single.len(), 10);
        assert!(single.iter().all(|&p| p == [3, 4]));

        let segment = smooth_closed_ring(&[[0, 0], [10, 0], [0, 0]], 5);
        assert_eq!(segment.len(), 15);
        assert_eq!(segment.first(), segment.last());
    }

    #[test]
    fn test_tridiagonal_solver() {
        // [2 1 0; 1 2 1; 0 1 2] x = [4 8 8] -> x = [1 2 3]
        let x = solve_tridiagonal(&[0.0, 1.0, 1.0], &[2.0, 2.0, 2.0], &[1.0, 1.0, 0.0], &[4.0, 8.0, 8.0]);
        for (got, want) in x.iter().zip([1.0, 2.0, 3.0]) {
            assert!((got - want).abs() < 1e-12);
        }
    }
}
