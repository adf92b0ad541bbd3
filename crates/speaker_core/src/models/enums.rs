//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job.
///
/// Non-terminal phases are ordered; a job only ever moves forward
/// through them. `Failed` is reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    #[default]
    Idle,
    ExtractingSlides,
    RenderingImages,
    GeneratingAudio,
    AnimatingFaces,
    ComposingVideo,
    Concatenating,
    Completed,
    Failed,
}

impl JobPhase {
    /// Position in the forward sequence (`Failed` has no position).
    fn ordinal(&self) -> Option<u8> {
        match self {
            JobPhase::Idle => Some(0),
            JobPhase::ExtractingSlides => Some(1),
            JobPhase::RenderingImages => Some(2),
            JobPhase::GeneratingAudio => Some(3),
            JobPhase::AnimatingFaces => Some(4),
            JobPhase::ComposingVideo => Some(5),
            JobPhase::Concatenating => Some(6),
            JobPhase::Completed => Some(7),
            JobPhase::Failed => None,
        }
    }

    /// Whether the job has finished (successfully or not).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }

    /// Whether a job is in flight.
    pub fn is_active(&self) -> bool {
        !self.is_terminal() && *self != JobPhase::Idle
    }

    /// Check whether moving from `self` to `next` is a legal transition.
    ///
    /// Forward moves are allowed (phases may be skipped, never revisited),
    /// and any non-terminal phase may move to `Failed`.
    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobPhase::Failed {
            return true;
        }
        match (self.ordinal(), next.ordinal()) {
            (Some(current), Some(target)) => target > current,
            _ => false,
        }
    }

    /// Get display string for status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Idle => "Idle",
            JobPhase::ExtractingSlides => "ExtractingSlides",
            JobPhase::RenderingImages => "RenderingImages",
            JobPhase::GeneratingAudio => "GeneratingAudio",
            JobPhase::AnimatingFaces => "AnimatingFaces",
            JobPhase::ComposingVideo => "ComposingVideo",
            JobPhase::Concatenating => "Concatenating",
            JobPhase::Completed => "Completed",
            JobPhase::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a slide's audio artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    /// Produced by the speech capability.
    Synthesized,
    /// Silent placeholder (empty narration or synthesis exhausted).
    Placeholder,
}

/// Where a slide's clip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipSource {
    /// Produced by the lip-sync capability.
    LipSync,
    /// Static face image held for the audio duration.
    StillFallback,
}

impl AudioSource {
    /// Label stored in completion markers.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioSource::Synthesized => "synthesized",
            AudioSource::Placeholder => "placeholder",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "synthesized" => Some(AudioSource::Synthesized),
            "placeholder" => Some(AudioSource::Placeholder),
            _ => None,
        }
    }
}

impl ClipSource {
    /// Label stored in completion markers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipSource::LipSync => "lip_sync",
            ClipSource::StillFallback => "still_fallback",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "lip_sync" => Some(ClipSource::LipSync),
            "still_fallback" => Some(ClipSource::StillFallback),
            _ => None,
        }
    }
}

/// Kind of per-slide artifact stored in a job workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    Audio,
    Clip,
    Segment,
}

impl ArtifactKind {
    /// Subdirectory name inside the job workspace.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "images",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Clip => "clips",
            ArtifactKind::Segment => "segments",
        }
    }

    /// Artifacts built from this one. They are stale once it is rebuilt.
    pub fn dependents(&self) -> &'static [ArtifactKind] {
        match self {
            ArtifactKind::Image => &[ArtifactKind::Segment],
            ArtifactKind::Audio => &[ArtifactKind::Clip, ArtifactKind::Segment],
            ArtifactKind::Clip => &[ArtifactKind::Segment],
            ArtifactKind::Segment => &[],
        }
    }

    /// File extension for this kind of artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Audio => "wav",
            ArtifactKind::Clip | ArtifactKind::Segment => "mp4",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Image => write!(f, "image"),
            ArtifactKind::Audio => write!(f, "audio"),
            ArtifactKind::Clip => write!(f, "clip"),
            ArtifactKind::Segment => write!(f, "segment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        assert!(JobPhase::Idle.can_transition_to(JobPhase::ExtractingSlides));
        assert!(JobPhase::GeneratingAudio.can_transition_to(JobPhase::AnimatingFaces));
        assert!(JobPhase::ComposingVideo.can_transition_to(JobPhase::Completed));
        assert!(!JobPhase::AnimatingFaces.can_transition_to(JobPhase::GeneratingAudio));
        assert!(!JobPhase::ComposingVideo.can_transition_to(JobPhase::ComposingVideo));
    }

    #[test]
    fn failed_reachable_from_any_non_terminal() {
        for phase in [
            JobPhase::Idle,
            JobPhase::ExtractingSlides,
            JobPhase::RenderingImages,
            JobPhase::GeneratingAudio,
            JobPhase::AnimatingFaces,
            JobPhase::ComposingVideo,
            JobPhase::Concatenating,
        ] {
            assert!(phase.can_transition_to(JobPhase::Failed), "{}", phase);
        }
        assert!(!JobPhase::Completed.can_transition_to(JobPhase::Failed));
        assert!(!JobPhase::Failed.can_transition_to(JobPhase::Completed));
    }

    #[test]
    fn rebuilt_audio_stales_clip_and_segment() {
        assert_eq!(
            ArtifactKind::Audio.dependents(),
            &[ArtifactKind::Clip, ArtifactKind::Segment]
        );
        assert_eq!(ArtifactKind::Image.dependents(), &[ArtifactKind::Segment]);
        assert!(ArtifactKind::Segment.dependents().is_empty());
    }

    #[test]
    fn source_labels_parse_back() {
        for source in [AudioSource::Synthesized, AudioSource::Placeholder] {
            assert_eq!(AudioSource::from_label(source.as_str()), Some(source));
        }
        assert_eq!(ClipSource::from_label("still_fallback"), Some(ClipSource::StillFallback));
        assert_eq!(ClipSource::from_label("bogus"), None);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&JobPhase::AnimatingFaces).unwrap();
        assert_eq!(json, "\"animating_faces\"");
    }
}
