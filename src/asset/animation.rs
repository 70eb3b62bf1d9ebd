use std::fmt::Debug;

use glam::{Quat, Vec3, Vec4};

use super::index::AssetIndex;

#[derive(Debug, Clone)]
pub struct AnimationKeyFrame<T: Debug + Clone> {
    pub time: f32,
    pub value: T,
}

#[derive(Debug, Clone)]
pub enum AnimationKeyFrames<T: Debug + Clone> {
    Linear(Vec<AnimationKeyFrame<T>>),
    Step(Vec<AnimationKeyFrame<T>>),
    // in, val, out
    CubicSpline(Vec<AnimationKeyFrame<(T, T, T)>>),
    CatmullRom(Vec<AnimationKeyFrame<T>>),
}

#[derive(Debug, Clone)]
pub enum AnimationSampler {
    Rotation(AnimationKeyFrames<Quat>),
    Translation(AnimationKeyFrames<Vec3>),
    Scale(AnimationKeyFrames<Vec3>),
}

impl AnimationSampler {
    pub fn length(&self) -> f32 {
        match self {
            AnimationSampler::Rotation(keyframes) => keyframes.length(),
            AnimationSampler::Translation(keyframes) => keyframes.length(),
            AnimationSampler::Scale(keyframes) => keyframes.length(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationChannelAsset {
    pub sampler: AnimationSampler,
    pub length: f32,
    pub target_id: AssetIndex,
}

#[derive(Debug, Clone)]
pub struct AnimationAsset {
    pub name: Option<String>,
    pub channels: Vec<AnimationChannelAsset>,
}

impl AnimationAsset {
    pub fn length(&self) -> f32 {
        self.channels
            .iter()
            .map(|channel| channel.length)
            .fold(0.0, f32::max)
    }
}

pub trait Interpolate: Sized {
    fn linear(a: Self, b: Self, t: f32) -> Self;
    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self;
    fn catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self;
}

fn hermite_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    ]
}

impl Interpolate for Vec3 {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        let [h00, h10, h01, h11] = hermite_weights(t);
        vk * h00 + bk * td * h10 + vk_1 * h01 + ak_1 * td * h11
    }

    fn catmull_rom(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        let v0 = (p2 - p0) * 0.5;
        let v1 = (p3 - p1) * 0.5;
        let t2 = t * t;
        let t3 = t2 * t;
        (2.0 * (p1 - p2) + v0 + v1) * t3 + (-3.0 * (p1 - p2) - 2.0 * v0 - v1) * t2 + v0 * t + p1
    }
}

impl Interpolate for Quat {
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        let [h00, h10, h01, h11] = hermite_weights(t);
        let value = Vec4::from(vk) * h00
            + Vec4::from(bk) * td * h10
            + Vec4::from(vk_1) * h01
            + Vec4::from(ak_1) * td * h11;
        Quat::from_vec4(value).normalize()
    }

    fn catmull_rom(_p0: Self, p1: Self, p2: Self, _p3: Self, t: f32) -> Self {
        p1.slerp(p2, t)
    }
}

/// Locates the keyframe pair around `time`. Returns the index of the earlier
/// frame and the progress towards the next one, or `None` when `time` lies
/// outside the track (the caller clamps to the first or last value).
fn find_segment(times: impl ExactSizeIterator<Item = f32>, time: f32) -> Option<(usize, f32)> {
    let len = times.len();
    if len < 2 {
        return None;
    }
    let mut previous: Option<(usize, f32)> = None;
    for (index, key_time) in times.enumerate() {
        if let Some((prev_index, prev_time)) = previous {
            if time < key_time {
                let span = key_time - prev_time;
                let progress = if span > 0.0 {
                    (time - prev_time) / span
                } else {
                    0.0
                };
                return Some((prev_index, progress.clamp(0.0, 1.0)));
            }
        }
        previous = Some((index, key_time));
    }
    None
}

impl<T: Debug + Clone + Copy + Interpolate> AnimationKeyFrames<T> {
    pub fn len(&self) -> usize {
        match self {
            AnimationKeyFrames::Linear(vec)
            | AnimationKeyFrames::Step(vec)
            | AnimationKeyFrames::CatmullRom(vec) => vec.len(),
            AnimationKeyFrames::CubicSpline(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the last keyframe.
    pub fn length(&self) -> f32 {
        match self {
            AnimationKeyFrames::Linear(vec)
            | AnimationKeyFrames::Step(vec)
            | AnimationKeyFrames::CatmullRom(vec) => vec.last().map(|frame| frame.time),
            AnimationKeyFrames::CubicSpline(vec) => vec.last().map(|frame| frame.time),
        }
        .unwrap_or(0.0)
    }

    /// Value of the track at `time`, clamped to the first and last keyframe.
    pub fn sample(&self, time: f32) -> Option<T> {
        fn clamp_to_ends<T: Debug + Clone>(
            time: f32,
            frames: &[AnimationKeyFrame<T>],
        ) -> Option<Result<T, (usize, f32)>> {
            let first = frames.first()?;
            let last = frames.last()?;
            if time <= first.time {
                return Some(Ok(first.value.clone()));
            }
            if time >= last.time {
                return Some(Ok(last.value.clone()));
            }
            let times = frames.iter().map(|frame| frame.time);
            Some(match find_segment(times, time) {
                Some(segment) => Err(segment),
                None => Ok(last.value.clone()),
            })
        }

        match self {
            AnimationKeyFrames::Step(vec) => match clamp_to_ends(time, vec)? {
                Ok(value) => Some(value),
                Err((index, _)) => Some(vec[index].value),
            },
            AnimationKeyFrames::Linear(vec) => match clamp_to_ends(time, vec)? {
                Ok(value) => Some(value),
                Err((index, progress)) => {
                    Some(T::linear(vec[index].value, vec[index + 1].value, progress))
                }
            },
            AnimationKeyFrames::CatmullRom(vec) => match clamp_to_ends(time, vec)? {
                Ok(value) => Some(value),
                Err((index, progress)) => {
                    let last = vec.len() - 1;
                    let p0 = vec[index.saturating_sub(1)].value;
                    let p1 = vec[index].value;
                    let p2 = vec[index + 1].value;
                    let p3 = vec[(index + 2).min(last)].value;
                    Some(T::catmull_rom(p0, p1, p2, p3, progress))
                }
            },
            AnimationKeyFrames::CubicSpline(vec) => match clamp_to_ends(time, vec)? {
                Ok((_, value, _)) => Some(value),
                Err((index, progress)) => {
                    let current = &vec[index];
                    let next = &vec[index + 1];
                    let td = next.time - current.time;
                    Some(T::cubic_spline(
                        current.value.1,
                        current.value.2,
                        next.value.1,
                        next.value.0,
                        progress,
                        td,
                    ))
                }
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn frames<T: Debug + Clone>(items: &[(f32, T)]) -> Vec<AnimationKeyFrame<T>> {
        items
            .iter()
            .map(|(time, value)| AnimationKeyFrame {
                time: *time,
                value: value.clone(),
            })
            .collect()
    }

    #[test]
    fn segment_progress_between_keys() {
        let times = [0.0, 1.0, 1.0, 3.0];
        assert_eq!(find_segment(times.into_iter(), 0.25), Some((0, 0.25)));
        assert_eq!(find_segment(times.into_iter(), 2.0), Some((2, 0.5)));
        assert_eq!(find_segment(times.into_iter(), 3.0), None);
        assert_eq!(find_segment([0.0].into_iter(), 0.0), None);
    }

    #[test]
    fn empty_track_yields_nothing() {
        let track: AnimationKeyFrames<Vec3> = AnimationKeyFrames::Linear(Vec::new());
        assert!(track.sample(0.5).is_none());
        assert_eq!(track.length(), 0.0);
    }

    #[test]
    fn sample_clamps_to_first_and_last() {
        let track = AnimationKeyFrames::Linear(frames(&[(1.0, Vec3::X), (2.0, Vec3::Y)]));
        assert_eq!(track.sample(0.0), Some(Vec3::X));
        assert_eq!(track.sample(5.0), Some(Vec3::Y));
    }

    #[test]
    fn single_key_track_is_constant() {
        let track = AnimationKeyFrames::CatmullRom(frames(&[(0.5, Vec3::Z)]));
        assert_eq!(track.sample(0.0), Some(Vec3::Z));
        assert_eq!(track.sample(3.0), Some(Vec3::Z));
    }

    #[test]
    fn step_holds_previous_value() {
        let track = AnimationKeyFrames::Step(frames(&[
            (0.0, Vec3::ZERO),
            (1.0, Vec3::ONE),
            (2.0, Vec3::X),
        ]));
        assert_eq!(track.sample(0.99), Some(Vec3::ZERO));
        assert_eq!(track.sample(1.5), Some(Vec3::ONE));
    }

    #[test]
    fn linear_interpolates_vectors() {
        let track =
            AnimationKeyFrames::Linear(frames(&[(0.0, Vec3::ZERO), (2.0, Vec3::splat(4.0))]));
        let value = track.sample(0.5).unwrap();
        assert!((value - Vec3::ONE).length() < 1e-6);
    }

    #[test]
    fn linear_slerps_rotations() {
        let track = AnimationKeyFrames::Linear(frames(&[
            (0.0, Quat::IDENTITY),
            (1.0, Quat::from_rotation_y(FRAC_PI_2)),
        ]));
        let value = track.sample(0.5).unwrap();
        let expected = Quat::from_rotation_y(FRAC_PI_2 / 2.0);
        assert!(value.angle_between(expected) < 1e-4);
        assert!((value.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn catmull_rom_passes_through_keys_and_is_smooth() {
        let track = AnimationKeyFrames::CatmullRom(frames(&[
            (0.0, Vec3::ZERO),
            (1.0, Vec3::X),
            (2.0, Vec3::new(2.0, 0.0, 0.0)),
            (3.0, Vec3::new(3.0, 0.0, 0.0)),
        ]));
        let at_key = track.sample(1.0).unwrap();
        assert!((at_key - Vec3::X).length() < 1e-6);
        // Evenly spaced collinear keys give a straight line.
        let mid = track.sample(1.5).unwrap();
        assert!((mid - Vec3::new(1.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn cubic_spline_hits_keyframe_values() {
        let track = AnimationKeyFrames::CubicSpline(frames(&[
            (0.0, (Vec3::ZERO, Vec3::ZERO, Vec3::ONE)),
            (1.0, (Vec3::ONE, Vec3::splat(2.0), Vec3::ZERO)),
        ]));
        let start = track.sample(1e-7).unwrap();
        assert!(start.length() < 1e-4);
        let end = track.sample(0.999_999).unwrap();
        assert!((end - Vec3::splat(2.0)).length() < 1e-4);
    }

    #[test]
    fn cubic_spline_with_zero_tangents_matches_smoothstep() {
        let track = AnimationKeyFrames::CubicSpline(frames(&[
            (0.0, (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO)),
            (2.0, (Vec3::ZERO, Vec3::ONE, Vec3::ZERO)),
        ]));
        let value = track.sample(0.5).unwrap();
        // t = 0.25, smoothstep = 3t^2 - 2t^3
        let expected = 3.0 * 0.0625 - 2.0 * 0.015625;
        assert!((value.x - expected).abs() < 1e-6);
    }

    #[test]
    fn animation_length_is_longest_channel() {
        let channel = |length| AnimationChannelAsset {
            sampler: AnimationSampler::Scale(AnimationKeyFrames::Linear(Vec::new())),
            length,
            target_id: AssetIndex::from_index("a", 0),
        };
        let animation = AnimationAsset {
            name: None,
            channels: vec![channel(1.0), channel(3.5), channel(2.0)],
        };
        assert_eq!(animation.length(), 3.5);
    }
}
