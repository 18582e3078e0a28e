//! Keyframe tracks flattened into one time-sorted list of transitions

use glam::{Quat, Vec3};
use mmd_pmx::Skeleton;
use mmd_vmd::{Keyframe, KeyframeTrack};

use crate::config::TransitionMode;

/// A keyframe track resolved against a skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct BoundTrack {
    pub bone: usize,
    pub keyframes: Vec<Keyframe>,
}

/// Resolve track names to bone indices. Tracks naming a bone the skeleton
/// does not have, and empty tracks, are dropped.
pub fn bind_tracks(tracks: &[KeyframeTrack], skeleton: &Skeleton) -> Vec<BoundTrack> {
    let mut bound = Vec::with_capacity(tracks.len());
    let mut unknown = 0usize;
    for track in tracks {
        if track.keyframes.is_empty() {
            continue;
        }
        match skeleton.find(&track.bone_name) {
            Some(bone) => bound.push(BoundTrack {
                bone,
                keyframes: track.keyframes.clone(),
            }),
            None => {
                log::debug!("No bone named '{}', skipping its track", track.bone_name);
                unknown += 1;
            }
        }
    }
    if unknown > 0 {
        log::warn!("Skipped {} tracks for bones missing from the model", unknown);
    }
    bound
}

/// One scheduled change of a bone's local rotation and translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub bone: usize,
    /// Milliseconds after playback start
    pub delay_ms: f64,
    /// Snap: how long the value holds. Linear: how long the slerp takes.
    pub duration_ms: f64,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Transition {
    fn from_keyframe(bone: usize, keyframe: &Keyframe, delay_ms: f64, duration_ms: f64) -> Self {
        Self {
            bone,
            delay_ms,
            duration_ms,
            rotation: keyframe.rotation,
            translation: keyframe.translation,
        }
    }
}

fn to_ms(seconds: f32) -> f64 {
    f64::from(seconds) * 1000.0
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    /// Time-0 keyframes, applied synchronously when playback starts
    pub initial: Vec<Transition>,
    /// Everything else, ascending by delay
    pub transitions: Vec<Transition>,
    /// Time of the last keyframe of any track, milliseconds
    pub duration_ms: f64,
}

impl Timeline {
    pub fn build(tracks: &[BoundTrack], mode: TransitionMode) -> Self {
        let mut initial = Vec::new();
        let mut transitions = Vec::new();
        let mut duration_ms: f64 = 0.0;

        for track in tracks {
            let keys = &track.keyframes;
            let Some(last) = keys.last() else {
                continue;
            };
            duration_ms = duration_ms.max(to_ms(last.time));

            for (i, key) in keys.iter().enumerate() {
                let time = to_ms(key.time);
                let next = keys.get(i + 1).map(|k| to_ms(k.time));
                let hold = next.map_or(0.0, |n| n - time);

                if i == 0 && key.time <= 0.0 {
                    initial.push(Transition::from_keyframe(track.bone, key, 0.0, hold));
                    continue;
                }

                let transition = match mode {
                    TransitionMode::Snap => Transition::from_keyframe(track.bone, key, time, hold),
                    TransitionMode::Linear => {
                        let previous = i.checked_sub(1).map_or(0.0, |p| to_ms(keys[p].time));
                        Transition::from_keyframe(track.bone, key, previous, time - previous)
                    }
                };
                transitions.push(transition);
            }
        }

        transitions.sort_by(|a, b| a.delay_ms.total_cmp(&b.delay_ms));

        Self {
            initial,
            transitions,
            duration_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.initial.is_empty() && self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(time: f32, angle: f32) -> Keyframe {
        Keyframe {
            time,
            rotation: Quat::from_rotation_x(angle),
            translation: Vec3::ZERO,
        }
    }

    fn track() -> BoundTrack {
        BoundTrack {
            bone: 4,
            keyframes: vec![key(0.0, 0.0), key(1.0, 0.5), key(1.5, 1.0)],
        }
    }

    #[test]
    fn test_snap_transitions() {
        let timeline = Timeline::build(&[track()], TransitionMode::Snap);
        assert_eq!(timeline.initial.len(), 1);
        assert_eq!(timeline.initial[0].duration_ms, 1000.0);

        let delays: Vec<(f64, f64)> = timeline
            .transitions
            .iter()
            .map(|t| (t.delay_ms, t.duration_ms))
            .collect();
        assert_eq!(delays, vec![(1000.0, 500.0), (1500.0, 0.0)]);
        assert_eq!(timeline.duration_ms, 1500.0);
    }

    #[test]
    fn test_linear_transitions_start_at_previous_key() {
        let timeline = Timeline::build(&[track()], TransitionMode::Linear);
        let delays: Vec<(f64, f64)> = timeline
            .transitions
            .iter()
            .map(|t| (t.delay_ms, t.duration_ms))
            .collect();
        assert_eq!(delays, vec![(0.0, 1000.0), (1000.0, 500.0)]);
    }

    #[test]
    fn test_first_key_after_zero_is_scheduled() {
        let late = BoundTrack {
            bone: 1,
            keyframes: vec![key(0.5, 0.2)],
        };
        let timeline = Timeline::build(&[late.clone(), track()], TransitionMode::Snap);
        assert_eq!(timeline.initial.len(), 1);
        assert_eq!(timeline.initial[0].bone, 4);
        // Sorted across tracks.
        assert_eq!(timeline.transitions[0].bone, 1);
        assert_eq!(timeline.transitions[0].delay_ms, 500.0);

        let linear = Timeline::build(&[late], TransitionMode::Linear);
        assert_eq!(linear.transitions[0].delay_ms, 0.0);
        assert_eq!(linear.transitions[0].duration_ms, 500.0);
    }
}
