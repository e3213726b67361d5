// Unit tests for domain models

use super::*;
use std::path::Path;

#[test]
fn test_segment_file_name_is_zero_padded() {
    assert_eq!(segment_file_name(0), "0000.mkv");
    assert_eq!(segment_file_name(42), "0042.mkv");
    assert_eq!(segment_file_pattern(), "%04d.mkv");
}

#[test]
fn test_segment_from_path() {
    let segment = Segment::from_path(Path::new("/tmp/segments/0007.mkv")).unwrap();
    assert_eq!(segment.ordinal, 7);
    assert_eq!(segment.path, Path::new("/tmp/segments/0007.mkv"));
}

#[test]
fn test_segment_from_path_rejects_foreign_files() {
    assert!(Segment::from_path(Path::new("concat.txt")).is_err());
    assert!(Segment::from_path(Path::new("12.mkv")).is_err());
    assert!(Segment::from_path(Path::new("00a1.mkv")).is_err());
    assert!(Segment::from_path(Path::new("0001.mp4")).is_err());
    assert!(EncodedSegment::from_path(Path::new("audio-0.mkv")).is_err());
}

#[test]
fn test_ordinals_past_four_digits() {
    assert_eq!(segment_file_name(10000), "10000.mkv");
    let segment = Segment::from_path(Path::new("/seg/10000.mkv")).unwrap();
    assert_eq!(segment.ordinal, 10000);
    assert_eq!(
        EncodedSegment::from_path(Path::new("123456.mkv")).unwrap().ordinal,
        123456
    );
    // ffmpeg never pads beyond the pattern width
    assert!(Segment::from_path(Path::new("00001.mkv")).is_err());
}

#[test]
fn test_audio_track_requires_channels() {
    assert!(AudioTrack::new(0, 0).is_err());
    let track = AudioTrack::new(3, 6).unwrap();
    assert_eq!(track.artifact_name(), "audio-3.mkv");
}

#[test]
fn test_file_state_walks_forward() {
    let mut state = FileState::Discovered;
    for next in [
        FileState::Probed,
        FileState::Segmented,
        FileState::Encoded,
        FileState::Concatenated,
        FileState::AudioDone,
        FileState::Remuxed,
        FileState::CleanedUp,
    ] {
        state = state.advance(next).unwrap();
    }
    assert_eq!(state, FileState::CleanedUp);
    assert!(state.is_terminal());
}

#[test]
fn test_file_state_rejects_skips_and_backwards_moves() {
    assert!(FileState::Probed.advance(FileState::Encoded).is_err());
    assert!(FileState::Encoded.advance(FileState::Segmented).is_err());
    assert!(FileState::Probed.advance(FileState::Probed).is_err());
}

#[test]
fn test_failed_is_absorbing() {
    let failed = FileState::Segmented
        .advance(FileState::Failed(Stage::Encode))
        .unwrap();
    assert_eq!(failed, FileState::Failed(Stage::Encode));
    assert!(failed.advance(FileState::Concatenated).is_err());
    assert!(failed.advance(FileState::Failed(Stage::Remux)).is_err());
    assert!(FileState::CleanedUp
        .advance(FileState::Failed(Stage::Cleanup))
        .is_err());
}

#[test]
fn test_media_metadata_counts() {
    let metadata = MediaMetadata {
        path: PathBuf::from("a.mkv"),
        video_streams: 1,
        audio_tracks: vec![AudioTrack::new(0, 2).unwrap(), AudioTrack::new(1, 6).unwrap()],
        subtitle_streams: 1,
        has_chapters: false,
        duration_secs: Some(300.0),
        container: Some("matroska,webm".to_string()),
    };
    assert!(metadata.has_video());
    assert!(metadata.has_subtitles());
    assert_eq!(metadata.audio_track_count(), 2);
}

#[test]
fn test_config_defaults_validate() {
    let config = PipelineConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.resolved_workers(), 1);
    assert_eq!(config.stage_timeout(), None);
    assert_eq!(config.remux.audio_map_policy, AudioMapPolicy::Optional);
}

#[test]
fn test_config_rejects_bad_values() {
    let mut config = PipelineConfig::default();
    config.segment_duration_secs = 0;
    assert!(config.validate().is_err());

    let mut config = PipelineConfig::default();
    config.encoder.min_vmaf = 101.0;
    assert!(config.validate().is_err());

    let mut config = PipelineConfig::default();
    config.audio.bitrates.push(BitrateRule { channels: 4, kbps: 0 });
    assert!(config.validate().is_err());

    let mut config = PipelineConfig::default();
    config.stage_timeout_secs = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_config_zero_workers_uses_cpus() {
    let mut config = PipelineConfig::default();
    config.workers = 0;
    assert!(config.resolved_workers() >= 1);
}

#[test]
fn test_accepts_extension() {
    let mut config = PipelineConfig::default();
    assert!(config.accepts_extension(Some("MKV")));
    assert!(config.accepts_extension(Some("mp4")));
    assert!(!config.accepts_extension(Some("txt")));
    assert!(!config.accepts_extension(None));

    config.supported_extensions.clear();
    assert!(config.accepts_extension(Some("txt")));
}

#[test]
fn test_audio_map_policy_parse() {
    assert_eq!(AudioMapPolicy::parse("optional").unwrap(), AudioMapPolicy::Optional);
    assert_eq!(AudioMapPolicy::parse("Strict").unwrap(), AudioMapPolicy::Required);
    assert!(AudioMapPolicy::parse("sometimes").is_err());
    assert_eq!(AudioMapPolicy::Required.to_string(), "required");
}
