//! Per-bone keyframe tracks
//!
//! Raw records arrive in file order, interleaved across bones. They are
//! grouped by name in order of first appearance, stably sorted by time and
//! de-duplicated: keyframes within [`MERGE_EPSILON`] seconds of the first
//! key of a run collapse into one, the later record winning.

use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::keyframe::{BoneKeyframe, MorphKeyframe};

/// Frame rate of VMD frame numbers.
pub const FRAMES_PER_SECOND: f32 = 30.0;

/// Keyframes this close, in seconds, are merged.
pub const MERGE_EPSILON: f32 = 0.001;

pub fn frame_to_seconds(frame: u32) -> f32 {
    frame as f32 / FRAMES_PER_SECOND
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// Seconds from the start of the motion.
    pub time: f32,
    pub rotation: Quat,
    pub translation: Vec3,
}

/// Time-ascending keyframes of one bone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeTrack {
    pub bone_name: String,
    pub keyframes: Vec<Keyframe>,
}

impl KeyframeTrack {
    /// Time of the last keyframe.
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphKey {
    pub time: f32,
    pub weight: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTrack {
    pub morph_name: String,
    pub keyframes: Vec<MorphKey>,
}

/// Unit rotation, identity when the stored quaternion is unusable.
fn sanitize_rotation(rotation: Quat) -> Quat {
    let length = rotation.length();
    if length.is_finite() && length > f32::EPSILON {
        rotation / length
    } else {
        Quat::IDENTITY
    }
}

fn group_by_name<'a, R, K>(
    records: &'a [R],
    name: impl Fn(&'a R) -> &'a str,
    key: impl Fn(&R) -> K,
) -> Vec<(String, Vec<K>)> {
    let mut order: Vec<(String, Vec<K>)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let slot = *slots.entry(name(record)).or_insert_with(|| {
            order.push((name(record).to_string(), Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(key(record));
    }
    order
}

fn sort_and_merge<K>(keys: &mut Vec<K>, time: impl Fn(&K) -> f32) {
    keys.sort_by(|a, b| time(a).total_cmp(&time(b)));
    let mut merged: Vec<K> = Vec::with_capacity(keys.len());
    // Start time of the run the last merged key stands for.
    let mut run_start = f32::NEG_INFINITY;
    for key in keys.drain(..) {
        let t = time(&key);
        match merged.last_mut() {
            Some(last) if t - run_start <= MERGE_EPSILON => *last = key,
            _ => {
                run_start = t;
                merged.push(key);
            }
        }
    }
    *keys = merged;
}

/// Build bone tracks from raw records.
pub fn build_tracks(records: &[BoneKeyframe]) -> Vec<KeyframeTrack> {
    group_by_name(
        records,
        |r| r.bone_name.as_str(),
        |r| Keyframe {
            time: frame_to_seconds(r.frame),
            rotation: sanitize_rotation(r.rotation),
            translation: if r.translation.is_finite() {
                r.translation
            } else {
                Vec3::ZERO
            },
        },
    )
    .into_iter()
    .map(|(bone_name, mut keyframes)| {
        sort_and_merge(&mut keyframes, |k| k.time);
        KeyframeTrack {
            bone_name,
            keyframes,
        }
    })
    .collect()
}

/// Build morph tracks from raw records.
pub fn build_morph_tracks(records: &[MorphKeyframe]) -> Vec<MorphTrack> {
    group_by_name(
        records,
        |r| r.morph_name.as_str(),
        |r| MorphKey {
            time: frame_to_seconds(r.frame),
            weight: r.weight,
        },
    )
    .into_iter()
    .map(|(morph_name, mut keyframes)| {
        sort_and_merge(&mut keyframes, |k| k.time);
        MorphTrack {
            morph_name,
            keyframes,
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(name: &str, frame: u32, x: f32) -> BoneKeyframe {
        BoneKeyframe::new(name, frame, Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)
    }

    #[test]
    fn test_group_sort_and_merge() {
        let records = vec![
            key("arm", 30, 1.0),
            key("leg", 0, 0.0),
            key("arm", 0, 0.0),
            key("arm", 30, 2.0),
            key("arm", 15, 3.0),
        ];
        let tracks = build_tracks(&records);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].bone_name, "arm");
        assert_eq!(tracks[1].bone_name, "leg");

        let times: Vec<f32> = tracks[0].keyframes.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        // Later duplicate wins.
        assert_eq!(tracks[0].keyframes[2].translation.x, 2.0);
        assert!((tracks[0].duration() - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_merge_window_is_inclusive_and_does_not_chain() {
        let mut keys = vec![(0.001f32, 'b'), (0.0, 'a')];
        sort_and_merge(&mut keys, |k| k.0);
        assert_eq!(keys, vec![(0.001, 'b')]);

        let mut keys = vec![(0.0016f32, 'c'), (0.0, 'a'), (0.0008, 'b'), (0.003, 'd'), (0.0035, 'e')];
        sort_and_merge(&mut keys, |k| k.0);
        assert_eq!(keys, vec![(0.0008, 'b'), (0.0016, 'c'), (0.0035, 'e')]);
    }

    #[test]
    fn test_bad_rotation_becomes_identity() {
        let records = vec![BoneKeyframe::new(
            "b",
            0,
            Vec3::ZERO,
            Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        )];
        let tracks = build_tracks(&records);
        assert_eq!(tracks[0].keyframes[0].rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_rotation_normalised() {
        let records = vec![BoneKeyframe::new(
            "b",
            0,
            Vec3::ZERO,
            Quat::from_xyzw(0.0, 0.0, 0.0, 2.0),
        )];
        let tracks = build_tracks(&records);
        assert!((tracks[0].keyframes[0].rotation.length() - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_morph_tracks() {
        let records = vec![
            MorphKeyframe::new("blink", 10, 1.0),
            MorphKeyframe::new("blink", 0, 0.0),
        ];
        let tracks = build_morph_tracks(&records);
        assert_eq!(tracks[0].keyframes.len(), 2);
        assert_eq!(tracks[0].keyframes[1].weight, 1.0);
    }
}
