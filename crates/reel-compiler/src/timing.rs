//! Scene timing allocation.
//!
//! Turns parsed scenes and the voiceover length into on-screen intervals.
//! Three policies, picked in order:
//!
//! - **Explicit**: any scene carries an authored start. Authored ranges pass
//!   through as written; gaps and overlaps are kept. Scenes without a range
//!   split the time between the surrounding authored starts evenly.
//! - **Proportional**: narration exists. Each scene gets a share of the audio
//!   proportional to its word count.
//! - **Uniform**: no narration at all. The audio is split evenly.

use serde::Serialize;
use tracing::{debug, warn};

use reel_models::{Scene, TimingInterval};

/// Allocation policy used for a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingPolicy {
    Explicit,
    Proportional,
    Uniform,
}

impl TimingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Proportional => "proportional",
            Self::Uniform => "uniform",
        }
    }
}

/// Computed intervals plus the notes produced while computing them.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTimeline {
    pub policy: TimingPolicy,
    /// Sorted by scene number
    pub intervals: Vec<TimingInterval>,
    pub warnings: Vec<String>,
}

impl SceneTimeline {
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Sum of interval durations.
    pub fn total_duration(&self) -> f64 {
        self.intervals.iter().map(|i| i.duration).sum()
    }
}

/// Compute on-screen intervals for `scenes` against a voiceover of
/// `audio_duration` seconds.
///
/// An empty scene list yields an empty timeline; deciding whether that is
/// fatal is left to the caller.
pub fn compute_timings(scenes: &[Scene], audio_duration: f64) -> SceneTimeline {
    let mut sorted: Vec<&Scene> = scenes.iter().collect();
    sorted.sort_by_key(|s| s.scene_number);

    let total_words: usize = sorted.iter().map(|s| s.word_count()).sum();

    let timeline = if sorted.iter().any(|s| s.explicit_start.is_some()) {
        explicit(&sorted, audio_duration)
    } else if total_words > 0 {
        proportional(&sorted, total_words, audio_duration)
    } else {
        uniform(&sorted, audio_duration)
    };

    debug!(
        policy = timeline.policy.as_str(),
        intervals = timeline.intervals.len(),
        audio_duration,
        "Computed scene timings"
    );
    timeline
}

fn explicit(scenes: &[&Scene], audio_duration: f64) -> SceneTimeline {
    let mut intervals = Vec::with_capacity(scenes.len());
    let mut warnings = Vec::new();

    // A group opens at the first scene and at every authored start, and
    // closes at the next authored start.
    let anchors: Vec<usize> = (0..scenes.len())
        .filter(|&idx| idx == 0 || scenes[idx].explicit_start.is_some())
        .collect();

    for (pos, &head) in anchors.iter().enumerate() {
        let tail = anchors.get(pos + 1).copied().unwrap_or(scenes.len());
        let window_end = anchors
            .get(pos + 1)
            .and_then(|&next| scenes[next].explicit_start)
            .unwrap_or(audio_duration);
        let mut cursor = scenes[head].explicit_start.unwrap_or(0.0);

        for (offset, scene) in scenes[head..tail].iter().enumerate() {
            let start = cursor;
            // Open ends share what is left of the window with the unranged
            // scenes that follow.
            let remaining = (tail - head - offset) as f64;
            let end = scene
                .explicit_end
                .unwrap_or(start + (window_end - start) / remaining);

            let interval = TimingInterval::new(scene.scene_number, start, end);
            if interval.is_well_formed() {
                intervals.push(interval);
            } else {
                let msg = if scene.explicit_end.is_some() {
                    format!(
                        "Scene {} has an empty or reversed range ({:.2}s-{:.2}s) and was skipped",
                        scene.scene_number, start, end
                    )
                } else {
                    format!(
                        "Scene {} has no room before {:.2}s and was skipped",
                        scene.scene_number, window_end
                    )
                };
                warn!("{}", msg);
                warnings.push(msg);
            }
            cursor = end.max(start);
        }
    }

    SceneTimeline {
        policy: TimingPolicy::Explicit,
        intervals,
        warnings,
    }
}

fn proportional(scenes: &[&Scene], total_words: usize, audio_duration: f64) -> SceneTimeline {
    let mut intervals = Vec::with_capacity(scenes.len());
    let mut warnings = Vec::new();

    // Last scene that gets any time; it absorbs cumulative rounding.
    let last_spoken = scenes.iter().rposition(|s| s.word_count() > 0);
    let mut cursor = 0.0;
    let mut words_so_far = 0usize;

    for (idx, scene) in scenes.iter().enumerate() {
        let words = scene.word_count();
        if words == 0 {
            let msg = format!(
                "Scene {} has no narration and gets no screen time",
                scene.scene_number
            );
            warn!("{}", msg);
            warnings.push(msg);
            continue;
        }

        words_so_far += words;
        let end = if Some(idx) == last_spoken {
            audio_duration
        } else {
            audio_duration * words_so_far as f64 / total_words as f64
        };

        intervals.push(TimingInterval::new(scene.scene_number, cursor, end));
        cursor = end;
    }

    SceneTimeline {
        policy: TimingPolicy::Proportional,
        intervals: drop_degenerate(intervals, &mut warnings),
        warnings,
    }
}

fn uniform(scenes: &[&Scene], audio_duration: f64) -> SceneTimeline {
    let count = scenes.len();
    let mut intervals = Vec::with_capacity(count);
    let mut warnings = Vec::new();
    let mut cursor = 0.0;

    for (idx, scene) in scenes.iter().enumerate() {
        let end = if idx + 1 == count {
            audio_duration
        } else {
            audio_duration * (idx + 1) as f64 / count as f64
        };
        intervals.push(TimingInterval::new(scene.scene_number, cursor, end));
        cursor = end;
    }

    SceneTimeline {
        policy: TimingPolicy::Uniform,
        intervals: drop_degenerate(intervals, &mut warnings),
        warnings,
    }
}

/// Only reachable with a non-positive audio duration.
fn drop_degenerate(intervals: Vec<TimingInterval>, warnings: &mut Vec<String>) -> Vec<TimingInterval> {
    if intervals.iter().all(TimingInterval::is_well_formed) {
        return intervals;
    }
    let msg = "Audio duration leaves no time for any scene".to_string();
    warn!("{}", msg);
    warnings.push(msg);
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn bounds(timeline: &SceneTimeline) -> Vec<(u32, f64, f64)> {
        timeline
            .intervals
            .iter()
            .map(|i| (i.scene_number, i.start_time, i.end_time))
            .collect()
    }

    fn assert_covers(timeline: &SceneTimeline, audio_duration: f64) {
        assert!((timeline.total_duration() - audio_duration).abs() < 1e-3);
        assert_eq!(timeline.intervals[0].start_time, 0.0);
        for pair in timeline.intervals.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        assert_eq!(
            timeline.intervals.last().map(|i| i.end_time),
            Some(audio_duration)
        );
    }

    #[test]
    fn test_proportional_by_word_count() {
        let scenes = vec![
            Scene::new(1, words(10)),
            Scene::new(2, words(20)),
            Scene::new(3, words(10)),
        ];

        let timeline = compute_timings(&scenes, 40.0);
        assert_eq!(timeline.policy, TimingPolicy::Proportional);
        assert_eq!(
            bounds(&timeline),
            vec![(1, 0.0, 10.0), (2, 10.0, 30.0), (3, 30.0, 40.0)]
        );
        assert!(timeline.warnings.is_empty());
    }

    #[test]
    fn test_explicit_ranges_pass_through() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), Some(10.0)),
            Scene::new(2, "b").with_explicit_range(Some(10.0), Some(25.0)),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(timeline.policy, TimingPolicy::Explicit);
        assert_eq!(bounds(&timeline), vec![(1, 0.0, 10.0), (2, 10.0, 25.0)]);
    }

    #[test]
    fn test_explicit_open_ends() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), None),
            Scene::new(2, "b").with_explicit_range(Some(12.0), None),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(bounds(&timeline), vec![(1, 0.0, 12.0), (2, 12.0, 30.0)]);
    }

    #[test]
    fn test_explicit_missing_start_follows_previous_end() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), Some(8.0)),
            Scene::new(2, "b"),
            Scene::new(3, "c").with_explicit_range(Some(20.0), None),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(
            bounds(&timeline),
            vec![(1, 0.0, 8.0), (2, 8.0, 20.0), (3, 20.0, 30.0)]
        );
    }

    #[test]
    fn test_explicit_open_end_shares_with_unranged_scene() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), None),
            Scene::new(2, "three words here"),
            Scene::new(3, "c").with_explicit_range(Some(20.0), None),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(
            bounds(&timeline),
            vec![(1, 0.0, 10.0), (2, 10.0, 20.0), (3, 20.0, 30.0)]
        );
        assert!(timeline.warnings.is_empty());
    }

    #[test]
    fn test_explicit_unranged_run_splits_evenly() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), Some(6.0)),
            Scene::new(2, "b"),
            Scene::new(3, "c"),
            Scene::new(4, "d").with_explicit_range(Some(20.0), None),
            Scene::new(5, "e"),
        ];

        let timeline = compute_timings(&scenes, 40.0);
        assert_eq!(
            bounds(&timeline),
            vec![
                (1, 0.0, 6.0),
                (2, 6.0, 13.0),
                (3, 13.0, 20.0),
                (4, 20.0, 30.0),
                (5, 30.0, 40.0)
            ]
        );
        assert_covers(&timeline, 40.0);
    }

    #[test]
    fn test_explicit_leading_unranged_scenes_start_at_zero() {
        let scenes = vec![
            Scene::new(1, "a"),
            Scene::new(2, "b"),
            Scene::new(3, "c").with_explicit_range(Some(10.0), Some(30.0)),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(
            bounds(&timeline),
            vec![(1, 0.0, 5.0), (2, 5.0, 10.0), (3, 10.0, 30.0)]
        );
    }

    #[test]
    fn test_explicit_unranged_scene_without_room_is_reported() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), Some(25.0)),
            Scene::new(2, "b"),
            Scene::new(3, "c").with_explicit_range(Some(20.0), None),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(bounds(&timeline), vec![(1, 0.0, 25.0), (3, 20.0, 30.0)]);
        assert_eq!(timeline.warnings.len(), 1);
        assert!(timeline.warnings[0].contains("Scene 2 has no room"));
    }

    #[test]
    fn test_explicit_gaps_and_overlaps_preserved() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), Some(12.0)),
            Scene::new(2, "b").with_explicit_range(Some(10.0), Some(15.0)),
            Scene::new(3, "c").with_explicit_range(Some(20.0), Some(22.0)),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(
            bounds(&timeline),
            vec![(1, 0.0, 12.0), (2, 10.0, 15.0), (3, 20.0, 22.0)]
        );
    }

    #[test]
    fn test_explicit_reversed_range_dropped() {
        let scenes = vec![
            Scene::new(1, "a").with_explicit_range(Some(0.0), Some(10.0)),
            Scene::new(2, "b").with_explicit_range(Some(15.0), Some(12.0)),
        ];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(bounds(&timeline), vec![(1, 0.0, 10.0)]);
        assert_eq!(timeline.warnings.len(), 1);
        assert!(timeline.warnings[0].contains("Scene 2"));
    }

    #[test]
    fn test_uniform_when_no_words() {
        let scenes = vec![Scene::new(1, ""), Scene::new(2, " "), Scene::new(3, "")];

        let timeline = compute_timings(&scenes, 30.0);
        assert_eq!(timeline.policy, TimingPolicy::Uniform);
        assert_eq!(
            bounds(&timeline),
            vec![(1, 0.0, 10.0), (2, 10.0, 20.0), (3, 20.0, 30.0)]
        );
    }

    #[test]
    fn test_scenes_sorted_by_number() {
        let scenes = vec![
            Scene::new(3, words(1)),
            Scene::new(1, words(1)),
            Scene::new(2, words(2)),
        ];

        let timeline = compute_timings(&scenes, 20.0);
        assert_eq!(
            bounds(&timeline),
            vec![(1, 0.0, 5.0), (2, 5.0, 15.0), (3, 15.0, 20.0)]
        );
    }

    #[test]
    fn test_silent_scene_skipped_under_proportional() {
        let scenes = vec![
            Scene::new(1, words(5)),
            Scene::new(2, ""),
            Scene::new(3, words(5)),
        ];

        let timeline = compute_timings(&scenes, 20.0);
        assert_eq!(bounds(&timeline), vec![(1, 0.0, 10.0), (3, 10.0, 20.0)]);
        assert_eq!(timeline.warnings.len(), 1);
        assert_covers(&timeline, 20.0);
    }

    #[test]
    fn test_empty_scenes_give_empty_timeline() {
        let timeline = compute_timings(&[], 30.0);
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_non_positive_audio_gives_empty_timeline() {
        let timeline = compute_timings(&[Scene::new(1, "hello")], 0.0);
        assert!(timeline.is_empty());
        assert_eq!(timeline.warnings.len(), 1);
    }

    #[test]
    fn test_coverage_holds_for_awkward_splits() {
        let counts = [7usize, 3, 11, 1, 13, 2, 5];
        let scenes: Vec<Scene> = counts
            .iter()
            .enumerate()
            .map(|(i, n)| Scene::new(i as u32 + 1, words(*n)))
            .collect();

        for audio in [1.0, 33.333, 47.29, 601.7] {
            assert_covers(&compute_timings(&scenes, audio), audio);
        }

        let silent: Vec<Scene> = (1..=7).map(|n| Scene::new(n, "")).collect();
        for audio in [1.0, 33.333, 47.29] {
            assert_covers(&compute_timings(&silent, audio), audio);
        }
    }

    #[test]
    fn test_double_words_double_duration() {
        let scenes = vec![Scene::new(1, words(24)), Scene::new(2, words(12))];
        let timeline = compute_timings(&scenes, 37.7);

        let d1 = timeline.intervals[0].duration;
        let d2 = timeline.intervals[1].duration;
        assert!((d1 - 2.0 * d2).abs() < 1e-6);
    }
}
