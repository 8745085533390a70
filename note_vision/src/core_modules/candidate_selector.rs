// THEORY:
// The `CandidateSelector` decides which single shape, if any, is the note. It is a
// stateless filter-then-rank pass over one frame's candidates.
//
// 1.  **Speckle floor**: anything under `min_area` is dropped before it is scored.
// 2.  **Circularity**: survivors are scored by how far their area strays from that
//     of their enclosing circle (`DeviationPolicy`). Under the absolute policy the
//     score is signed and a candidate must also stay under `max_deviation`; since
//     a boundary never outgrows its enclosing circle, that ranking leans towards
//     the larger shapes in view.
// 3.  **Deterministic ranking**: the lowest deviation wins; on an exact tie the
//     candidate seen first is kept, so identical frames always pick the same shape.
//
// Returning `None` is the ordinary "no note in view" outcome, not a failure.

use crate::config::{DeviationPolicy, PipelineConfig};
use crate::core_modules::candidate::Candidate;
use log::trace;

pub mod candidate_selector {
    use super::*;

    /// Picks the most circular candidate that clears the configured gates.
    pub fn select(candidates: Vec<Candidate>, config: &PipelineConfig) -> Option<Candidate> {
        let policy = config.deviation_policy;
        let mut best: Option<(f64, Candidate)> = None;

        for candidate in candidates {
            if candidate.area < config.min_area {
                continue;
            }

            let deviation = candidate.circularity_deviation(policy);
            if policy == DeviationPolicy::Absolute && !(deviation < config.max_deviation) {
                trace!(
                    "candidate {} rejected: deviation {:.1} over ceiling",
                    candidate.id, deviation
                );
                continue;
            }

            match &best {
                Some((best_deviation, _)) if deviation >= *best_deviation => {}
                _ => best = Some((deviation, candidate)),
            }
        }

        best.map(|(_, candidate)| candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::candidate_selector::select;
    use super::*;
    use crate::core_modules::candidate::Circle;
    use imageproc::point::Point;
    use std::f64::consts::PI;

    /// A candidate whose enclosing circle area is `area * (1 + deviation)`.
    fn shaped(id: usize, area: f64, normalized_deviation: f64, x: f64) -> Candidate {
        let circle_area = area * (1.0 + normalized_deviation);
        let radius = (circle_area / PI).sqrt();
        let center = Point::new(x, 100.0);
        Candidate::new(id, area, Some(center), Circle::new(center, radius))
    }

    fn config(policy: DeviationPolicy) -> PipelineConfig {
        PipelineConfig {
            deviation_policy: policy,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn nothing_to_select_from() {
        assert!(select(Vec::new(), &PipelineConfig::default()).is_none());
    }

    #[test]
    fn speckle_below_min_area_is_never_selected() {
        let candidates = vec![shaped(0, 120.0, 0.0, 10.0), shaped(1, 299.9, 0.0, 20.0)];
        assert!(select(candidates.clone(), &config(DeviationPolicy::Normalized)).is_none());
        assert!(select(candidates, &config(DeviationPolicy::Absolute)).is_none());
    }

    #[test]
    fn normalized_prefers_the_rounder_shape_over_the_bigger_one() {
        let small_round = shaped(0, 350.0, 0.01, 10.0);
        let large_round = shaped(1, 5000.0, 0.05, 20.0);
        let selected = select(
            vec![large_round, small_round.clone()],
            &config(DeviationPolicy::Normalized),
        )
        .expect("a candidate");
        assert_eq!(selected, small_round);
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let first = shaped(0, 1000.0, 0.1, 10.0);
        let second = shaped(1, 1000.0, 0.1, 20.0);
        let selected = select(vec![first, second], &config(DeviationPolicy::Normalized))
            .expect("a candidate");
        assert_eq!(selected.id, 0);
    }

    #[test]
    fn absolute_policy_enforces_the_ceiling() {
        // Area 200 px² above its circle: over the default ceiling of 100.
        let candidates = vec![shaped(0, 1000.0, -0.2, 10.0)];
        assert!(select(candidates.clone(), &config(DeviationPolicy::Absolute)).is_none());
        // The normalized policy has no ceiling.
        assert!(select(candidates, &config(DeviationPolicy::Normalized)).is_some());
    }

    #[test]
    fn absolute_policy_accepts_a_large_round_note() {
        // A rasterised r = 40 disc: 4908 px² of boundary polygon in a 5026 px² circle.
        let circle_area = PI * 40.0 * 40.0;
        let disc = shaped(0, 4908.0, circle_area / 4908.0 - 1.0, 10.0);
        assert!(disc.circularity_deviation(DeviationPolicy::Absolute) < -100.0);
        let selected = select(vec![disc.clone()], &config(DeviationPolicy::Absolute));
        assert_eq!(selected, Some(disc));
    }

    #[test]
    fn absolute_policy_favours_the_larger_gap() {
        // Signed gaps: -0.05 * 1500 = -75, -0.1 * 400 = -40.
        let candidates = vec![shaped(0, 400.0, 0.1, 20.0), shaped(1, 1500.0, 0.05, 10.0)];
        let selected =
            select(candidates, &config(DeviationPolicy::Absolute)).expect("a candidate");
        assert_eq!(selected.id, 1);
    }

    #[test]
    fn zero_area_survives_only_when_the_floor_allows_it() {
        let point = Point::new(5.0, 5.0);
        let degenerate = Candidate::new(0, 0.0, None, Circle::new(point, 0.0));

        assert!(select(vec![degenerate.clone()], &PipelineConfig::default()).is_none());

        let mut permissive = PipelineConfig::default();
        permissive.min_area = 0.0;
        assert_eq!(select(vec![degenerate.clone()], &permissive), Some(degenerate));
    }
}
