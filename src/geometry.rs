// src/geometry.rs - Line segments placed across a bead

use crate::segmentation::BeadCandidate;

/// Distance the lines extend past the bead on each side
pub const LINE_MARGIN: i64 = 5;

/// Direction of a line profile across a bead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Vertical,
    Horizontal,
    /// Bottom-left to top-right, "/"
    DiagonalForward,
    /// Top-left to bottom-right, "\"
    DiagonalBackward,
}

impl Orientation {
    /// Order in which each bead is profiled and reported
    pub const PROFILE_ORDER: [Orientation; 4] = [
        Orientation::Vertical,
        Orientation::Horizontal,
        Orientation::DiagonalBackward,
        Orientation::DiagonalForward,
    ];

    /// Short name used in CSV output and logs
    pub fn name(&self) -> &'static str {
        match self {
            Orientation::Vertical => "Vertical",
            Orientation::Horizontal => "Horizontal",
            Orientation::DiagonalForward => "Forwardslash",
            Orientation::DiagonalBackward => "Backslash",
        }
    }

    /// Label as it appears between the cell number and the peak values in the text report
    pub fn report_label(&self) -> &'static str {
        match self {
            Orientation::Vertical => " Vertical = ",
            Orientation::Horizontal => " Horizontal = ",
            Orientation::DiagonalForward => " Forwardslash = ",
            Orientation::DiagonalBackward => " Backslash = ",
        }
    }
}

/// Straight line between two points in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl LineSegment {
    pub fn new(start: (f64, f64), end: (f64, f64)) -> Self {
        Self { start_x: start.0, start_y: start.1, end_x: end.0, end_y: end.1 }
    }

    pub fn length(&self) -> f64 {
        let dx = self.end_x - self.start_x;
        let dy = self.end_y - self.start_y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Build the line for one orientation.
///
/// Axis-aligned lines pass through the centroid and overshoot the bounding box
/// by the margin. Diagonals run between the bounding box corners, inset by the
/// margin. Centroid, width and height are truncated to whole pixels first; the
/// bounding box origin is used as given.
pub fn build_segment(candidate: &BeadCandidate, orientation: Orientation) -> LineSegment {
    let cx = candidate.centroid_x as i64;
    let cy = candidate.centroid_y as i64;
    let wide = candidate.bbox_width as i64;
    let high = candidate.bbox_height as i64;
    let bx = candidate.bbox_x;
    let by = candidate.bbox_y;
    let margin = LINE_MARGIN as f64;

    match orientation {
        Orientation::Vertical => LineSegment::new(
            (cx as f64, (cy - high / 2 - LINE_MARGIN) as f64),
            (cx as f64, (cy + high / 2 + LINE_MARGIN) as f64),
        ),
        Orientation::Horizontal => LineSegment::new(
            ((cx - wide / 2 - LINE_MARGIN) as f64, cy as f64),
            ((cx + wide / 2 + LINE_MARGIN) as f64, cy as f64),
        ),
        Orientation::DiagonalBackward => LineSegment::new(
            (bx + margin, by + margin),
            (bx + wide as f64 - margin, by + high as f64 - margin),
        ),
        Orientation::DiagonalForward => LineSegment::new(
            (bx + margin, by + high as f64 - margin),
            (bx + wide as f64 - margin, by + margin),
        ),
    }
}

/// All four lines of a bead in profiling order
pub fn build_segments(candidate: &BeadCandidate) -> [(Orientation, LineSegment); 4] {
    Orientation::PROFILE_ORDER.map(|orientation| (orientation, build_segment(candidate, orientation)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(centroid: (f64, f64), bbox: (f64, f64, f64, f64)) -> BeadCandidate {
        BeadCandidate {
            centroid_x: centroid.0,
            centroid_y: centroid.1,
            bbox_x: bbox.0,
            bbox_y: bbox.1,
            bbox_width: bbox.2,
            bbox_height: bbox.3,
            roundness: 1.0,
            area: 314,
        }
    }

    #[test]
    fn test_reference_bead_segments() {
        let bead = candidate((20.0, 20.0), (10.0, 10.0, 20.0, 20.0));

        assert_eq!(build_segment(&bead, Orientation::Vertical), LineSegment::new((20.0, 5.0), (20.0, 35.0)));
        assert_eq!(build_segment(&bead, Orientation::Horizontal), LineSegment::new((5.0, 20.0), (35.0, 20.0)));
        assert_eq!(build_segment(&bead, Orientation::DiagonalBackward), LineSegment::new((15.0, 15.0), (25.0, 25.0)));
        assert_eq!(build_segment(&bead, Orientation::DiagonalForward), LineSegment::new((15.0, 25.0), (25.0, 15.0)));
    }

    #[test]
    fn test_centroid_and_size_are_truncated() {
        let bead = candidate((20.9, 31.7), (10.0, 20.0, 21.8, 23.6));

        // cx = 20, cy = 31, wide = 21, high = 23 -> half sizes 10 and 11
        assert_eq!(build_segment(&bead, Orientation::Vertical), LineSegment::new((20.0, 15.0), (20.0, 47.0)));
        assert_eq!(build_segment(&bead, Orientation::Horizontal), LineSegment::new((5.0, 31.0), (35.0, 31.0)));
        assert_eq!(build_segment(&bead, Orientation::DiagonalBackward), LineSegment::new((15.0, 25.0), (26.0, 38.0)));
    }

    #[test]
    fn test_diagonals_keep_fractional_origin() {
        let bead = candidate((20.0, 20.0), (10.5, 10.25, 20.0, 20.0));
        let segment = build_segment(&bead, Orientation::DiagonalForward);
        assert_eq!(segment, LineSegment::new((15.5, 25.25), (25.5, 15.25)));
    }

    #[test]
    fn test_profile_order() {
        let bead = candidate((20.0, 20.0), (10.0, 10.0, 20.0, 20.0));
        let names: Vec<&str> = build_segments(&bead).iter().map(|(o, _)| o.name()).collect();
        assert_eq!(names, vec!["Vertical", "Horizontal", "Backslash", "Forwardslash"]);
    }

    #[test]
    fn test_degenerate_bead_gives_zero_length_diagonal() {
        let bead = candidate((3.0, 3.0), (0.0, 0.0, 10.0, 10.0));
        assert_eq!(build_segment(&bead, Orientation::DiagonalBackward).length(), 0.0);
    }
}
