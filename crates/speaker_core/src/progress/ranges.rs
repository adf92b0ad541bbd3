//! Reserved progress ranges per phase.

use crate::models::JobPhase;

/// Inclusive progress window reserved for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRange {
    pub start: u8,
    pub end: u8,
}

impl PhaseRange {
    const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Linear position inside the range after `done` of `total` units.
    ///
    /// An empty unit count maps straight to the end of the range.
    pub fn interpolate(&self, done: usize, total: usize) -> u8 {
        if total == 0 || done >= total {
            return self.end;
        }
        let span = (self.end - self.start) as usize;
        self.start + ((span * done) / total) as u8
    }
}

/// Progress window for a phase.
///
/// `Failed` has no window: a failed job keeps whatever progress it had.
pub fn phase_range(phase: JobPhase) -> Option<PhaseRange> {
    match phase {
        JobPhase::Idle => Some(PhaseRange::new(0, 0)),
        JobPhase::ExtractingSlides => Some(PhaseRange::new(0, 5)),
        JobPhase::RenderingImages => Some(PhaseRange::new(5, 15)),
        JobPhase::GeneratingAudio => Some(PhaseRange::new(15, 40)),
        JobPhase::AnimatingFaces => Some(PhaseRange::new(40, 75)),
        JobPhase::ComposingVideo => Some(PhaseRange::new(75, 95)),
        JobPhase::Concatenating => Some(PhaseRange::new(95, 100)),
        JobPhase::Completed => Some(PhaseRange::new(100, 100)),
        JobPhase::Failed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_tile_zero_to_hundred() {
        let phases = [
            JobPhase::ExtractingSlides,
            JobPhase::RenderingImages,
            JobPhase::GeneratingAudio,
            JobPhase::AnimatingFaces,
            JobPhase::ComposingVideo,
            JobPhase::Concatenating,
        ];
        let mut expected_start = 0;
        for phase in phases {
            let range = phase_range(phase).unwrap();
            assert_eq!(range.start, expected_start, "{}", phase);
            assert!(range.end > range.start);
            expected_start = range.end;
        }
        assert_eq!(expected_start, 100);
    }

    #[test]
    fn interpolation_is_linear() {
        let audio = phase_range(JobPhase::GeneratingAudio).unwrap();
        assert_eq!(audio.interpolate(0, 5), 15);
        assert_eq!(audio.interpolate(1, 5), 20);
        assert_eq!(audio.interpolate(5, 5), 40);
        assert_eq!(audio.interpolate(0, 0), 40);
    }
}
