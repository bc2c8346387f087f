//! Layer transform channels.
//!
//! [`TransformDescriptor`] is the typed input handed over by the parser;
//! [`LayerTransformProperties`] wraps each channel in a [`NodeProperty`] and
//! exposes the keypath map used by override tooling.

use glam::Vec3;
use lottie_data::model::{self as data, PositionProperty};

use crate::animatable::KeyframeTrack;
use crate::error::{AnimatorError, Result};
use crate::property::{AnyNodeProperty, NodeProperty, PropertyValue};

pub const KEYPATH_NAME: &str = "Transform";

pub const ANCHOR_POINT: &str = "Anchor Point";
pub const SCALE: &str = "Scale";
pub const ROTATION: &str = "Rotation";
pub const ROTATION_X: &str = "Rotation X";
pub const ROTATION_Y: &str = "Rotation Y";
pub const ROTATION_Z: &str = "Rotation Z";
pub const OPACITY: &str = "Opacity";
pub const ORIENTATION: &str = "Orientation";
pub const POSITION: &str = "Position";
pub const X_POSITION: &str = "X Position";
pub const Y_POSITION: &str = "Y Position";

/// Keyframe tracks for every transform channel of one layer.
///
/// Scale and opacity are percentages; rotations and orientation are degrees.
#[derive(Debug, Clone)]
pub struct TransformDescriptor {
    pub anchor: KeyframeTrack<Vec3>,
    pub scale: KeyframeTrack<Vec3>,
    pub rotation_x: KeyframeTrack<f32>,
    pub rotation_y: KeyframeTrack<f32>,
    pub rotation_z: KeyframeTrack<f32>,
    pub opacity: KeyframeTrack<f32>,
    pub orientation: KeyframeTrack<Vec3>,
    pub position: Option<KeyframeTrack<Vec3>>,
    pub position_x: Option<KeyframeTrack<f32>>,
    pub position_y: Option<KeyframeTrack<f32>>,
}

impl Default for TransformDescriptor {
    fn default() -> Self {
        Self {
            anchor: KeyframeTrack::constant(Vec3::ZERO),
            scale: KeyframeTrack::constant(Vec3::splat(100.0)),
            rotation_x: KeyframeTrack::constant(0.0),
            rotation_y: KeyframeTrack::constant(0.0),
            rotation_z: KeyframeTrack::constant(0.0),
            opacity: KeyframeTrack::constant(100.0),
            orientation: KeyframeTrack::constant(Vec3::ZERO),
            position: None,
            position_x: None,
            position_y: None,
        }
    }
}

impl From<&data::Transform> for TransformDescriptor {
    fn from(ks: &data::Transform) -> Self {
        let scalar = |prop: &data::Property<f32>, default: f32| {
            KeyframeTrack::from_property(prop, |v| *v, default)
        };
        let optional_scalar = |prop: &Option<data::Property<f32>>| match prop {
            Some(p) => scalar(p, 0.0),
            None => KeyframeTrack::constant(0.0),
        };

        let (position, position_x, position_y) = match &ks.p {
            // Separated dimensions only carry x and y; z stays at zero.
            Some(PositionProperty::Split { x, y, .. }) => {
                (None, Some(scalar(x, 0.0)), Some(scalar(y, 0.0)))
            }
            Some(PositionProperty::Unified(p)) if p.is_specified() => (
                Some(KeyframeTrack::from_property(p, |v| Vec3::from(v.0), Vec3::ZERO)),
                None,
                None,
            ),
            _ => (None, None, None),
        };

        Self {
            anchor: KeyframeTrack::from_property(&ks.a, |v| Vec3::from(v.0), Vec3::ZERO),
            scale: KeyframeTrack::from_property(&ks.s, |v| Vec3::from(v.0), Vec3::splat(100.0)),
            rotation_x: optional_scalar(&ks.rx),
            rotation_y: optional_scalar(&ks.ry),
            rotation_z: scalar(&ks.rz, 0.0),
            opacity: scalar(&ks.o, 100.0),
            orientation: match &ks.or {
                Some(p) => KeyframeTrack::from_property(p, |v| Vec3::from(v.0), Vec3::ZERO),
                None => KeyframeTrack::constant(Vec3::ZERO),
            },
            position,
            position_x,
            position_y,
        }
    }
}

/// Which position channels a [`LayerTransformProperties`] was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionShape {
    Combined,
    Split,
    Absent,
}

/// Cached properties for one layer's transform. The position shape is fixed
/// at construction.
#[derive(Debug)]
pub struct LayerTransformProperties {
    pub(crate) anchor: NodeProperty<Vec3>,
    pub(crate) scale: NodeProperty<Vec3>,
    pub(crate) rotation_x: NodeProperty<f32>,
    pub(crate) rotation_y: NodeProperty<f32>,
    pub(crate) rotation_z: NodeProperty<f32>,
    pub(crate) position: Option<NodeProperty<Vec3>>,
    pub(crate) orientation: NodeProperty<Vec3>,
    pub(crate) position_x: Option<NodeProperty<f32>>,
    pub(crate) position_y: Option<NodeProperty<f32>>,
    pub(crate) opacity: NodeProperty<f32>,
}

impl LayerTransformProperties {
    pub fn new(transform: &TransformDescriptor) -> Self {
        let (position, position_x, position_y) =
            match (&transform.position_x, &transform.position_y, &transform.position) {
                (Some(x), Some(y), _) => (
                    None,
                    Some(NodeProperty::new(x.clone())),
                    Some(NodeProperty::new(y.clone())),
                ),
                (_, _, Some(p)) => (Some(NodeProperty::new(p.clone())), None, None),
                _ => (None, None, None),
            };

        let properties = Self {
            anchor: NodeProperty::new(transform.anchor.clone()),
            scale: NodeProperty::new(transform.scale.clone()),
            rotation_x: NodeProperty::new(transform.rotation_x.clone()),
            rotation_y: NodeProperty::new(transform.rotation_y.clone()),
            rotation_z: NodeProperty::new(transform.rotation_z.clone()),
            position,
            orientation: NodeProperty::new(transform.orientation.clone()),
            position_x,
            position_y,
            opacity: NodeProperty::new(transform.opacity.clone()),
        };

        debug_assert!(
            !(properties.position.is_some()
                && (properties.position_x.is_some() || properties.position_y.is_some())),
            "combined and split position channels are mutually exclusive"
        );
        debug_assert_eq!(
            properties.position_x.is_some(),
            properties.position_y.is_some(),
            "split position needs both axes"
        );

        properties
    }

    pub fn keypath_name(&self) -> &'static str {
        KEYPATH_NAME
    }

    /// Transform channels are leaves of the keypath tree.
    pub fn child_keypaths(&self) -> &[&'static str] {
        &[]
    }

    pub fn position_shape(&self) -> PositionShape {
        match (&self.position, &self.position_x) {
            (Some(_), _) => PositionShape::Combined,
            (None, Some(_)) => PositionShape::Split,
            (None, None) => PositionShape::Absent,
        }
    }

    pub fn anchor(&self) -> &NodeProperty<Vec3> {
        &self.anchor
    }

    pub fn scale(&self) -> &NodeProperty<Vec3> {
        &self.scale
    }

    pub fn rotation_x(&self) -> &NodeProperty<f32> {
        &self.rotation_x
    }

    pub fn rotation_y(&self) -> &NodeProperty<f32> {
        &self.rotation_y
    }

    pub fn rotation_z(&self) -> &NodeProperty<f32> {
        &self.rotation_z
    }

    pub fn orientation(&self) -> &NodeProperty<Vec3> {
        &self.orientation
    }

    pub fn opacity(&self) -> &NodeProperty<f32> {
        &self.opacity
    }

    pub fn position(&self) -> Option<&NodeProperty<Vec3>> {
        self.position.as_ref()
    }

    pub fn position_x(&self) -> Option<&NodeProperty<f32>> {
        self.position_x.as_ref()
    }

    pub fn position_y(&self) -> Option<&NodeProperty<f32>> {
        self.position_y.as_ref()
    }

    /// Every key this property set answers to, `"Rotation"` included as an
    /// alias of `"Rotation Z"`.
    pub fn keypaths(&self) -> Vec<&'static str> {
        let mut keys = vec![
            ANCHOR_POINT,
            SCALE,
            ROTATION_Z,
            ROTATION_X,
            ROTATION_Y,
            ROTATION,
            OPACITY,
            ORIENTATION,
        ];
        match self.position_shape() {
            PositionShape::Combined => keys.push(POSITION),
            PositionShape::Split => keys.extend([X_POSITION, Y_POSITION]),
            PositionShape::Absent => {}
        }
        keys
    }

    pub fn property(&self, keypath: &str) -> Option<&dyn AnyNodeProperty> {
        let prop: &dyn AnyNodeProperty = match keypath {
            ANCHOR_POINT => &self.anchor,
            SCALE => &self.scale,
            ROTATION | ROTATION_Z => &self.rotation_z,
            ROTATION_X => &self.rotation_x,
            ROTATION_Y => &self.rotation_y,
            OPACITY => &self.opacity,
            ORIENTATION => &self.orientation,
            POSITION => self.position.as_ref()?,
            X_POSITION => self.position_x.as_ref()?,
            Y_POSITION => self.position_y.as_ref()?,
            _ => return None,
        };
        Some(prop)
    }

    pub fn property_mut(&mut self, keypath: &str) -> Option<&mut dyn AnyNodeProperty> {
        let prop: &mut dyn AnyNodeProperty = match keypath {
            ANCHOR_POINT => &mut self.anchor,
            SCALE => &mut self.scale,
            ROTATION | ROTATION_Z => &mut self.rotation_z,
            ROTATION_X => &mut self.rotation_x,
            ROTATION_Y => &mut self.rotation_y,
            OPACITY => &mut self.opacity,
            ORIENTATION => &mut self.orientation,
            POSITION => self.position.as_mut()?,
            X_POSITION => self.position_x.as_mut()?,
            Y_POSITION => self.position_y.as_mut()?,
            _ => return None,
        };
        Some(prop)
    }

    /// All distinct channels, one entry each.
    pub fn properties(&self) -> Vec<&dyn AnyNodeProperty> {
        let mut props: Vec<&dyn AnyNodeProperty> = vec![
            &self.anchor,
            &self.scale,
            &self.rotation_z,
            &self.rotation_x,
            &self.rotation_y,
            &self.opacity,
            &self.orientation,
        ];
        if let Some(p) = &self.position {
            props.push(p);
        }
        if let Some(p) = &self.position_x {
            props.push(p);
        }
        if let Some(p) = &self.position_y {
            props.push(p);
        }
        props
    }

    pub fn set_value(&mut self, keypath: &str, value: PropertyValue) -> Result<()> {
        let prop = self
            .property_mut(keypath)
            .ok_or_else(|| AnimatorError::UnknownKeypath(keypath.to_string()))?;
        prop.set_value(value)
            .map_err(|expected| AnimatorError::ValueKindMismatch {
                keypath: keypath.to_string(),
                expected,
            })
    }

    pub fn needs_local_update(&self, frame: f32) -> bool {
        self.properties().iter().any(|p| p.needs_update(frame))
    }
}
