// THEORY:
// Minimum enclosing circle via Welzl's algorithm in its iterative, randomized
// incremental form. The outer loop grows the circle whenever a point falls outside
// it; that point must lie on the new boundary, which pins one (then two, then
// three) support points and keeps each inner loop small.
//
// Expected linear time depends on visiting points in random order. Contour points
// arrive in boundary order, which is close to the worst case, so they are shuffled
// first with a fixed seed. The shuffle only changes the work done, never the circle.

use crate::core_modules::candidate::Circle;
use imageproc::point::Point;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

const SHUFFLE_SEED: u64 = 0x0c1c1e;
const TOLERANCE: f64 = 1e-7;

fn distance(a: &Point<f64>, b: &Point<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn circle_from_two(a: &Point<f64>, b: &Point<f64>) -> Circle {
    let center = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    Circle::new(center, distance(a, b) / 2.0)
}

/// Circumcircle of three points; collinear triples fall back to the widest pair.
fn circle_from_three(a: &Point<f64>, b: &Point<f64>, c: &Point<f64>) -> Circle {
    let bx = b.x - a.x;
    let by = b.y - a.y;
    let cx = c.x - a.x;
    let cy = c.y - a.y;
    let d = 2.0 * (bx * cy - by * cx);

    if d.abs() < TOLERANCE {
        return [circle_from_two(a, b), circle_from_two(a, c), circle_from_two(b, c)]
            .into_iter()
            .fold(Circle::new(*a, 0.0), |widest, circle| {
                if circle.radius > widest.radius { circle } else { widest }
            });
    }

    let b_sq = bx * bx + by * by;
    let c_sq = cx * cx + cy * cy;
    let ux = (cy * b_sq - by * c_sq) / d;
    let uy = (bx * c_sq - cx * b_sq) / d;
    let center = Point::new(a.x + ux, a.y + uy);
    Circle::new(center, (ux * ux + uy * uy).sqrt())
}

/// Smallest circle containing every point. An empty slice yields a zero circle at the origin.
pub fn minimum_enclosing_circle(points: &[Point<f64>]) -> Circle {
    let Some(first) = points.first() else {
        return Circle::new(Point::new(0.0, 0.0), 0.0);
    };
    if points.len() == 1 {
        return Circle::new(*first, 0.0);
    }

    let mut shuffled = points.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(SHUFFLE_SEED));

    let mut circle = Circle::new(shuffled[0], 0.0);
    for i in 1..shuffled.len() {
        if circle.contains(&shuffled[i], TOLERANCE) {
            continue;
        }
        circle = Circle::new(shuffled[i], 0.0);
        for j in 0..i {
            if circle.contains(&shuffled[j], TOLERANCE) {
                continue;
            }
            circle = circle_from_two(&shuffled[i], &shuffled[j]);
            for k in 0..j {
                if !circle.contains(&shuffled[k], TOLERANCE) {
                    circle = circle_from_three(&shuffled[i], &shuffled[j], &shuffled[k]);
                }
            }
        }
    }
    circle
}
