use crate::segmentation::BeadCandidate;

/// Minimum roundness for a region to count as a bead
pub const ROUNDNESS_CUTOFF: f64 = 0.99;

/// An accepted candidate with its report number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedBead {
    /// 1-based, never reused within a run
    pub index: u32,
    pub candidate: BeadCandidate,
}

/// Roundness is compared as given, without clamping to [0, 1]
#[inline]
pub fn is_accepted(candidate: &BeadCandidate) -> bool {
    candidate.roundness >= ROUNDNESS_CUTOFF
}

/// Filters candidates by roundness and numbers the accepted ones
#[derive(Debug, Clone)]
pub struct BeadSelector {
    next_index: u32,
}

impl Default for BeadSelector {
    fn default() -> Self {
        Self { next_index: 1 }
    }
}

impl BeadSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of beads accepted so far
    pub fn accepted(&self) -> u32 {
        self.next_index - 1
    }

    /// Accepted candidates in input order. Rejected ones are dropped without a trace
    /// beyond a debug log line and do not consume an index.
    pub fn select(&mut self, candidates: &[BeadCandidate]) -> Vec<SelectedBead> {
        let mut selected = Vec::new();
        for candidate in candidates {
            if !is_accepted(candidate) {
                log::debug!(
                    "Rejected region at ({:.1}, {:.1}): roundness {:.3}",
                    candidate.centroid_x,
                    candidate.centroid_y,
                    candidate.roundness
                );
                continue;
            }
            selected.push(SelectedBead { index: self.next_index, candidate: *candidate });
            self.next_index += 1;
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_roundness(roundness: f64) -> BeadCandidate {
        BeadCandidate {
            centroid_x: 10.0,
            centroid_y: 10.0,
            bbox_x: 5.0,
            bbox_y: 5.0,
            bbox_width: 10.0,
            bbox_height: 10.0,
            roundness,
            area: 78,
        }
    }

    #[test]
    fn test_cutoff_boundary() {
        assert!(is_accepted(&with_roundness(0.990)));
        assert!(!is_accepted(&with_roundness(0.989)));
    }

    #[test]
    fn test_out_of_range_roundness_is_not_clamped() {
        assert!(is_accepted(&with_roundness(1.7)));
        assert!(!is_accepted(&with_roundness(-0.5)));
        assert!(!is_accepted(&with_roundness(f64::NAN)));
    }

    #[test]
    fn test_indices_have_no_gaps() {
        let candidates: Vec<BeadCandidate> = [0.995, 0.5, 1.0, 0.989, 0.99, 0.2]
            .iter()
            .map(|&r| with_roundness(r))
            .collect();

        let mut selector = BeadSelector::new();
        let selected = selector.select(&candidates);

        let indices: Vec<u32> = selected.iter().map(|b| b.index).collect();
        let roundness: Vec<f64> = selected.iter().map(|b| b.candidate.roundness).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(roundness, vec![0.995, 1.0, 0.99]);
        assert_eq!(selector.accepted(), 3);
    }

    #[test]
    fn test_numbering_continues_across_calls() {
        let mut selector = BeadSelector::new();
        selector.select(&[with_roundness(1.0)]);
        let second = selector.select(&[with_roundness(0.3), with_roundness(0.999)]);
        assert_eq!(second[0].index, 2);
    }
}
