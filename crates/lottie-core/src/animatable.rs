use glam::{Vec2, Vec3};
use lottie_data::model::{BezierTangent, Keyframe, Property, Value};

pub trait Interpolatable: Sized + Clone + Default {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        _tan_in: Option<&[f32]>,
        _tan_out: Option<&[f32]>,
    ) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }

    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        tan_in: Option<&[f32]>,
        tan_out: Option<&[f32]>,
    ) -> Self {
        let t_out = spatial_tangent(tan_out);
        let t_in = spatial_tangent(tan_in);

        // Without tangents the path is a straight line; keep the blend linear.
        if t_out == Vec3::ZERO && t_in == Vec3::ZERO {
            return self.lerp(other, t);
        }

        let p0 = *self;
        let p3 = *other;
        let p1 = p0 + t_out;
        let p2 = p3 + t_in;

        let one_minus_t = 1.0 - t;
        let one_minus_t_sq = one_minus_t * one_minus_t;
        let one_minus_t_cub = one_minus_t_sq * one_minus_t;

        let t_sq = t * t;
        let t_cub = t_sq * t;

        p0 * one_minus_t_cub
            + p1 * 3.0 * one_minus_t_sq * t
            + p2 * 3.0 * one_minus_t * t_sq
            + p3 * t_cub
    }
}

fn spatial_tangent(raw: Option<&[f32]>) -> Vec3 {
    match raw {
        Some([x, y, z, ..]) => Vec3::new(*x, *y, *z),
        Some([x, y]) => Vec3::new(*x, *y, 0.0),
        _ => Vec3::ZERO,
    }
}

// Cubic Bezier Easing
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Newton-Raphson
    let mut t = x;
    for _ in 0..8 {
        let one_minus_t = 1.0 - t;
        let x_est = 3.0 * one_minus_t * one_minus_t * t * p1.x
            + 3.0 * one_minus_t * t * t * p2.x
            + t * t * t;

        let err = x_est - x;
        if err.abs() < 1e-4 {
            break;
        }

        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);

        if dx_dt.abs() < 1e-6 {
            break;
        }
        t -= err / dx_dt;
    }

    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
}

/// One resolved keyframe of a [`KeyframeTrack`]: source values already
/// converted to the track's value type.
///
/// Everything except `time` and `value` describes the segment that starts
/// at this keyframe: both easing handles and both spatial tangents live on
/// the start key, as they do in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackKeyframe<T> {
    pub time: f32,
    pub value: T,
    /// Explicit segment end value (legacy exporters write it on the start key).
    pub end_value: Option<T>,
    pub ease_out: Vec2,
    pub ease_in: Vec2,
    pub hold: bool,
    pub spatial_out: Option<Vec<f32>>,
    pub spatial_in: Option<Vec<f32>>,
}

impl<T> TrackKeyframe<T> {
    pub fn linear(time: f32, value: T) -> Self {
        TrackKeyframe {
            time,
            value,
            end_value: None,
            ease_out: Vec2::ZERO,
            ease_in: Vec2::ONE,
            hold: false,
            spatial_out: None,
            spatial_in: None,
        }
    }

    pub fn hold(time: f32, value: T) -> Self {
        TrackKeyframe {
            hold: true,
            ..TrackKeyframe::linear(time, value)
        }
    }

    pub fn eased(mut self, ease_out: Vec2, ease_in: Vec2) -> Self {
        self.ease_out = ease_out;
        self.ease_in = ease_in;
        self
    }
}

/// Ordered, immutable keyframes for one property.
///
/// A track with no keyframes evaluates to its fallback, a track with one
/// keyframe is constant. Frames outside the keyed range clamp to the first
/// or last value.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T> {
    keyframes: Vec<TrackKeyframe<T>>,
    fallback: T,
}

impl<T: Interpolatable> Default for KeyframeTrack<T> {
    fn default() -> Self {
        KeyframeTrack {
            keyframes: Vec::new(),
            fallback: T::default(),
        }
    }
}

impl<T: Interpolatable> KeyframeTrack<T> {
    pub fn constant(value: T) -> Self {
        KeyframeTrack {
            keyframes: vec![TrackKeyframe::linear(0.0, value.clone())],
            fallback: value,
        }
    }

    pub fn from_keyframes(keyframes: Vec<TrackKeyframe<T>>) -> Self {
        debug_assert!(
            keyframes.windows(2).all(|w| w[0].time <= w[1].time),
            "keyframe times must be non-decreasing"
        );
        KeyframeTrack {
            keyframes,
            fallback: T::default(),
        }
    }

    /// Builds a track from a parsed property, converting each raw value.
    /// `Value::Default` and empty keyframe lists resolve to `default`.
    pub fn from_property<S>(prop: &Property<S>, converter: impl Fn(&S) -> T, default: T) -> Self {
        match &prop.k {
            Value::Default => KeyframeTrack {
                keyframes: Vec::new(),
                fallback: default,
            },
            Value::Static(v) => Self::constant(converter(v)),
            Value::Animated(keyframes) => {
                let mut resolved: Vec<TrackKeyframe<T>> = Vec::with_capacity(keyframes.len());
                for kf in keyframes {
                    let next = Self::resolve_keyframe(kf, resolved.last(), &converter, &default);
                    resolved.push(next);
                }
                KeyframeTrack {
                    keyframes: resolved,
                    fallback: default,
                }
            }
        }
    }

    fn resolve_keyframe<S>(
        kf: &Keyframe<S>,
        previous: Option<&TrackKeyframe<T>>,
        converter: &impl Fn(&S) -> T,
        default: &T,
    ) -> TrackKeyframe<T> {
        // Trailing keys from older exporters carry only a time; they start
        // where the previous segment ended.
        let value = kf
            .s
            .as_ref()
            .map(converter)
            .or_else(|| previous.and_then(|p| p.end_value.clone()))
            .unwrap_or_else(|| default.clone());

        TrackKeyframe {
            time: kf.t,
            value,
            end_value: kf.e.as_ref().map(converter),
            ease_out: tangent_point(kf.o.as_ref(), Vec2::ZERO),
            ease_in: tangent_point(kf.i.as_ref(), Vec2::ONE),
            hold: kf.is_hold(),
            spatial_out: kf.to.clone(),
            spatial_in: kf.ti.clone(),
        }
    }

    pub fn keyframes(&self) -> &[TrackKeyframe<T>] {
        &self.keyframes
    }

    pub fn is_animated(&self) -> bool {
        self.keyframes.len() > 1
    }

    pub fn value_at(&self, frame: f32) -> T {
        let keyframes = &self.keyframes;
        match keyframes.len() {
            0 => return self.fallback.clone(),
            1 => return keyframes[0].value.clone(),
            _ => {}
        }

        // Find the first keyframe where kf.time > frame; the active segment
        // is [idx-1, idx].
        let idx = keyframes.partition_point(|kf| kf.time <= frame);

        if idx == 0 {
            return keyframes[0].value.clone();
        }

        let len = keyframes.len();
        if idx >= len {
            let last = &keyframes[len - 1];
            return last.end_value.clone().unwrap_or_else(|| last.value.clone());
        }

        let kf_start = &keyframes[idx - 1];
        let kf_end = &keyframes[idx];

        let start_val = kf_start.value.clone();
        if kf_start.hold {
            return start_val;
        }

        let duration = kf_end.time - kf_start.time;
        if duration <= 0.0 {
            return start_val;
        }

        let end_val = kf_start
            .end_value
            .clone()
            .unwrap_or_else(|| kf_end.value.clone());

        let local_t = (frame - kf_start.time) / duration;
        let eased = solve_cubic_bezier(kf_start.ease_out, kf_start.ease_in, local_t);

        start_val.lerp_spatial(
            &end_val,
            eased,
            kf_start.spatial_in.as_deref(),
            kf_start.spatial_out.as_deref(),
        )
    }

    /// Whether the value may differ between `from` and `to`, answered from
    /// the keyframe layout alone.
    pub fn has_update(&self, from: f32, to: f32) -> bool {
        if from == to || !self.is_animated() {
            return false;
        }

        let first = self.keyframes[0].time;
        let last = self.keyframes[self.keyframes.len() - 1].time;
        if from <= first && to <= first {
            return false;
        }
        if from >= last && to >= last {
            return false;
        }

        let from_idx = self.keyframes.partition_point(|kf| kf.time <= from);
        let to_idx = self.keyframes.partition_point(|kf| kf.time <= to);
        if from_idx == to_idx && from_idx > 0 && self.keyframes[from_idx - 1].hold {
            return false;
        }

        true
    }
}

fn tangent_point(tangent: Option<&BezierTangent>, default: Vec2) -> Vec2 {
    match tangent {
        Some(t) => Vec2::new(
            t.x.first().copied().unwrap_or(default.x),
            t.y.first().copied().unwrap_or(default.y),
        ),
        None => default,
    }
}
