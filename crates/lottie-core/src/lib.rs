//! Per-frame evaluation of Lottie layer transforms.
//!
//! Keyframe tracks feed cached node properties; each layer's
//! [`LayerTransformNode`] turns its properties into a local and a global
//! matrix, and [`TransformTree`] drives a whole hierarchy root to leaf.

pub mod animatable;
pub mod compose;
pub mod error;
pub mod graph;
pub mod node;
pub mod property;
pub mod transform;

pub use animatable::{Interpolatable, KeyframeTrack, TrackKeyframe};
pub use compose::{combine, make_transform, to_affine};
pub use error::{AnimatorError, Result};
pub use graph::{NodeId, NodeOutput, TransformTree, UpdateReport};
pub use node::{AnimatorNode, LayerTransformNode};
pub use property::{
    AnyNodeProperty, KeyframeInterpolator, NodeProperty, PropertyValue, SingleValueProvider,
    ValueKind, ValueProvider,
};
pub use transform::{LayerTransformProperties, PositionShape, TransformDescriptor};
