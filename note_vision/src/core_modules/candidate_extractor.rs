// THEORY:
// The `CandidateExtractor` is the spatial grouping stage. It turns the flat binary
// mask into a list of discrete shapes, each summarised as a `Candidate`.
//
// Algorithm:
// 1.  **Border following**: Suzuki-Abe contour tracing walks every boundary between
//     foreground and background and tags each one as an outer border or a hole.
// 2.  **Outer borders only**: holes belong to a shape that is already represented by
//     its outer border. A note seen face-on is a ring, and its inner hole must not
//     turn into a second, perfectly circular candidate.
// 3.  **Geometry**: each outer boundary polygon yields area, centroid and minimum
//     enclosing circle (see `Candidate::from_boundary`).
// 4.  **Stateless utility**: no memory of earlier frames. The order of the output is
//     the tracing order, which is deterministic for a given mask.

use crate::core_modules::candidate::Candidate;
use crate::core_modules::segmenter::Mask;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

pub mod candidate_extractor {
    use super::*;

    /// Finds every outer-boundary shape in `mask`. Empty when the mask is all background.
    pub fn extract(mask: &Mask) -> Vec<Candidate> {
        find_contours::<i32>(mask)
            .into_iter()
            .filter(|contour| matches!(contour.border_type, BorderType::Outer))
            .enumerate()
            .map(|(id, contour)| {
                let boundary: Vec<Point<f64>> = contour
                    .points
                    .iter()
                    .map(|p| Point::new(p.x as f64, p.y as f64))
                    .collect();
                Candidate::from_boundary(id, &boundary)
            })
            .collect()
    }
}
