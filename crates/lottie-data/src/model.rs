use serde::{de::DeserializeOwned, de::SeqAccess, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Composition header plus the layer list. Only the fields the transform
/// evaluator needs are modelled; everything else in the document is ignored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LottieJson {
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    pub ip: f32,
    pub op: f32,
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Layer {
    #[serde(default)]
    pub ty: u8,
    #[serde(default)]
    pub ind: Option<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub ks: Transform,
    #[serde(default)]
    pub hd: Option<bool>, // Hidden - if true, layer should not be rendered
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<Vec3DefaultZero>, // Anchor: Vec3, default z=0
    #[serde(default)]
    pub p: Option<PositionProperty>, // Position: absent means no position channel
    #[serde(default)]
    pub s: Property<Vec3Scale>, // Scale: Vec3, default z=100
    #[serde(default, alias = "r")]
    pub rz: Property<f32>, // Rotation Z
    #[serde(default)]
    pub rx: Option<Property<f32>>, // Rotation X
    #[serde(default)]
    pub ry: Option<Property<f32>>, // Rotation Y
    #[serde(default)]
    pub or: Option<Property<Vec3DefaultZero>>, // Orientation
    #[serde(default)]
    pub o: Property<f32>, // Opacity
}

/// Position is either one vector channel or separated per-axis channels
/// (`"s": true` in the source document).
///
/// `Split` is listed first: every field of [`Property`] has a default, so
/// the unified form would otherwise swallow split objects.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
        #[serde(default)]
        z: Option<Property<f32>>,
    },
    Unified(Property<Vec3DefaultZero>),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
    #[serde(default)]
    pub x: Option<String>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
            x: None,
        }
    }
}

impl<T> Property<T> {
    pub fn fixed(value: T) -> Self {
        Property {
            k: Value::Static(value),
            ..Default::default()
        }
    }

    pub fn animated(keyframes: Vec<Keyframe<T>>) -> Self {
        Property {
            a: 1,
            k: Value::Animated(keyframes),
            ..Default::default()
        }
    }

    /// True when the property carries data rather than falling back to the
    /// channel default.
    pub fn is_specified(&self) -> bool {
        !matches!(self.k, Value::Default)
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        if let Ok(keyframes) = serde_json::from_value::<Vec<Keyframe<T>>>(v.clone()) {
            return Ok(Value::Animated(keyframes));
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<BezierTangent>,
    #[serde(default)]
    pub o: Option<BezierTangent>,
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    /// A keyframe with linear easing into the next one.
    pub fn linear(t: f32, value: T) -> Self {
        Keyframe {
            t,
            s: Some(value),
            e: None,
            i: None,
            o: None,
            to: None,
            ti: None,
            h: None,
        }
    }

    /// A keyframe whose value is held until the next keyframe.
    pub fn hold(t: f32, value: T) -> Self {
        Keyframe {
            h: Some(1),
            ..Keyframe::linear(t, value)
        }
    }

    pub fn is_hold(&self) -> bool {
        self.h == Some(1)
    }
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

pub type Vec3 = [f32; 3];

/// Bezier tangent control points for keyframe easing
/// Matches the JSON format: {"x": [0.48], "y": [1]}
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BezierTangent {
    #[serde(deserialize_with = "deserialize_scalar_or_seq")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "deserialize_scalar_or_seq")]
    pub y: Vec<f32>,
}

impl BezierTangent {
    pub fn new(x: f32, y: f32) -> Self {
        BezierTangent {
            x: vec![x],
            y: vec![y],
        }
    }
}

// Older exporters write single-dimension tangents as bare numbers.
fn deserialize_scalar_or_seq<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScalarOrSeq {
        Scalar(f32),
        Seq(Vec<f32>),
    }

    Ok(match ScalarOrSeq::deserialize(deserializer)? {
        ScalarOrSeq::Scalar(v) => vec![v],
        ScalarOrSeq::Seq(v) => v,
    })
}

// Wrapper for Vec3 with Z defaulting to 0.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3DefaultZero(pub Vec3);

impl Default for Vec3DefaultZero {
    fn default() -> Self {
        Vec3DefaultZero([0.0, 0.0, 0.0])
    }
}

impl<'de> Deserialize<'de> for Vec3DefaultZero {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3Visitor;
        impl<'de> serde::de::Visitor<'de> for Vec3Visitor {
            type Value = Vec3DefaultZero;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(0.0);
                let y = seq.next_element()?.unwrap_or(0.0);
                let z = seq.next_element()?.unwrap_or(0.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3DefaultZero([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3Visitor)
    }
}

// Wrapper for Vec3 with Z defaulting to 100.0 (for Scale)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3Scale(pub Vec3);

impl Default for Vec3Scale {
    fn default() -> Self {
        Vec3Scale([100.0, 100.0, 100.0])
    }
}

impl<'de> Deserialize<'de> for Vec3Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3ScaleVisitor;
        impl<'de> serde::de::Visitor<'de> for Vec3ScaleVisitor {
            type Value = Vec3Scale;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(0.0);
                let y = seq.next_element()?.unwrap_or(0.0);
                let z = seq.next_element()?.unwrap_or(100.0); // Default to 100%
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3Scale([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3ScaleVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_position_is_not_swallowed_by_unified() {
        let ks: Transform = serde_json::from_value(json!({
            "p": { "s": true, "x": { "a": 0, "k": 10 }, "y": { "a": 0, "k": 20 } }
        }))
        .unwrap();

        assert!(matches!(ks.p, Some(PositionProperty::Split { .. })));
    }

    #[test]
    fn unified_position_and_missing_position() {
        let ks: Transform = serde_json::from_value(json!({
            "p": { "a": 0, "k": [250, 250] }
        }))
        .unwrap();
        match ks.p {
            Some(PositionProperty::Unified(p)) => match p.k {
                Value::Static(v) => assert_eq!(v.0, [250.0, 250.0, 0.0]),
                other => panic!("expected static position, got {other:?}"),
            },
            other => panic!("expected unified position, got {other:?}"),
        }

        let ks: Transform = serde_json::from_value(json!({})).unwrap();
        assert!(ks.p.is_none());
    }

    #[test]
    fn rotation_alias_and_scale_default_z() {
        let ks: Transform = serde_json::from_value(json!({
            "r": { "a": 0, "k": 45 },
            "s": { "a": 0, "k": [50, 75] }
        }))
        .unwrap();

        match (ks.rz.k, ks.s.k) {
            (Value::Static(rz), Value::Static(scale)) => {
                assert_eq!(rz, 45.0);
                assert_eq!(scale, Vec3Scale([50.0, 75.0, 100.0]));
            }
            other => panic!("expected static rotation and scale, got {other:?}"),
        }
    }

    #[test]
    fn animated_scalar_keyframes_unwrap_single_element_arrays() {
        let prop: Property<f32> = serde_json::from_value(json!({
            "a": 1,
            "k": [
                { "t": 0, "s": [0], "o": { "x": [0.33], "y": [0] }, "i": { "x": [0.67], "y": [1] } },
                { "t": 10, "s": [90], "h": 1 }
            ]
        }))
        .unwrap();

        let Value::Animated(keyframes) = prop.k else {
            panic!("expected keyframes");
        };
        assert_eq!(keyframes.len(), 2);
        assert_eq!(keyframes[0].s, Some(0.0));
        assert_eq!(keyframes[1].s, Some(90.0));
        assert!(keyframes[1].is_hold());
        assert_eq!(keyframes[0].o, Some(BezierTangent::new(0.33, 0.0)));
    }

    #[test]
    fn bare_number_tangents_are_accepted() {
        let tangent: BezierTangent = serde_json::from_value(json!({ "x": 0.5, "y": 1 })).unwrap();
        assert_eq!(tangent, BezierTangent::new(0.5, 1.0));
    }
}
