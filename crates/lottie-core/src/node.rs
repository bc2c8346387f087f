use glam::{Mat4, Vec3};
use kurbo::Affine;

use crate::compose::{combine, make_transform, to_affine};
use crate::graph::NodeId;
use crate::transform::{LayerTransformProperties, TransformDescriptor};

/// Transform state for one layer.
///
/// Two independent flags say whether the cached outputs are stale:
/// `has_local_updates` (this node's own channels changed) and
/// `has_upstream_updates` (an ancestor's global transform changed). The
/// driver sets and clears them; [`rebuild_outputs`](Self::rebuild_outputs)
/// leaves them untouched.
#[derive(Debug)]
pub struct LayerTransformNode {
    properties: LayerTransformProperties,
    parent: Option<NodeId>,
    has_local_updates: bool,
    has_upstream_updates: bool,
    last_update_frame: Option<f32>,
    is_enabled: bool,
    opacity: f32,
    local_transform: Mat4,
    global_transform: Mat4,
}

impl LayerTransformNode {
    pub fn new(transform: &TransformDescriptor, parent: Option<NodeId>) -> Self {
        Self {
            properties: LayerTransformProperties::new(transform),
            parent,
            has_local_updates: false,
            has_upstream_updates: false,
            last_update_frame: None,
            is_enabled: true,
            opacity: 1.0,
            local_transform: Mat4::IDENTITY,
            global_transform: Mat4::IDENTITY,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn properties(&self) -> &LayerTransformProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut LayerTransformProperties {
        &mut self.properties
    }

    pub fn has_local_updates(&self) -> bool {
        self.has_local_updates
    }

    pub fn has_upstream_updates(&self) -> bool {
        self.has_upstream_updates
    }

    pub fn last_update_frame(&self) -> Option<f32> {
        self.last_update_frame
    }

    pub fn mark_local_updates(&mut self) {
        self.has_local_updates = true;
    }

    pub fn mark_upstream_updates(&mut self) {
        self.has_upstream_updates = true;
    }

    pub fn clear_updates(&mut self) {
        self.has_local_updates = false;
        self.has_upstream_updates = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    /// A disabled node stops evaluating its channels and passes its parent's
    /// space through unchanged.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.is_enabled != enabled {
            self.is_enabled = enabled;
            self.has_local_updates = true;
        }
    }

    /// Applied opacity in `0.0..=1.0` terms (the channel is a percentage).
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn local_transform(&self) -> Mat4 {
        self.local_transform
    }

    pub fn global_transform(&self) -> Mat4 {
        self.global_transform
    }

    pub fn global_affine(&self) -> Affine {
        to_affine(&self.global_transform)
    }

    /// Folds the channels' change state for `frame` into the local flag.
    ///
    /// Repeated calls for the frame already seen only report the current
    /// flags unless `force` is set. Returns whether outputs must be rebuilt.
    pub fn update_contents(&mut self, frame: f32, force: bool) -> bool {
        if !force && self.last_update_frame == Some(frame) {
            return self.should_rebuild_outputs(frame);
        }

        if force || (self.is_enabled && self.properties.needs_local_update(frame)) {
            self.has_local_updates = true;
        }
        self.last_update_frame = Some(frame);
        self.should_rebuild_outputs(frame)
    }

    pub fn should_rebuild_outputs(&self, _frame: f32) -> bool {
        self.has_local_updates || self.has_upstream_updates
    }

    /// Recomputes opacity and both transforms for `frame`.
    ///
    /// `parent_global` must already be resolved for the same frame.
    pub fn rebuild_outputs(&mut self, frame: f32, parent_global: Option<Mat4>) {
        if !self.is_enabled {
            self.opacity = 1.0;
            self.local_transform = Mat4::IDENTITY;
            self.global_transform = parent_global.unwrap_or(Mat4::IDENTITY);
            return;
        }

        let props = &mut self.properties;
        self.opacity = props.opacity.value(frame) * 0.01;

        let position = if let Some(point) = props.position.as_mut() {
            point.value(frame)
        } else if let (Some(x), Some(y)) = (props.position_x.as_mut(), props.position_y.as_mut()) {
            Vec3::new(x.value(frame), y.value(frame), 0.0)
        } else {
            Vec3::ZERO
        };

        self.local_transform = make_transform(
            props.anchor.value(frame),
            position,
            props.scale.value(frame).truncate(),
            props.rotation_x.value(frame),
            props.rotation_y.value(frame),
            props.rotation_z.value(frame),
            props.orientation.value(frame),
        );

        self.global_transform = match parent_global {
            Some(parent) => combine(self.local_transform, parent),
            None => self.local_transform,
        };
    }
}

/// Node kinds the tree driver knows how to evaluate.
#[derive(Debug)]
pub enum AnimatorNode {
    Transform(LayerTransformNode),
}

impl AnimatorNode {
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            AnimatorNode::Transform(node) => node.parent(),
        }
    }

    pub fn update_contents(&mut self, frame: f32, force: bool) -> bool {
        match self {
            AnimatorNode::Transform(node) => node.update_contents(frame, force),
        }
    }

    pub fn rebuild_outputs(&mut self, frame: f32, parent_global: Option<Mat4>) {
        match self {
            AnimatorNode::Transform(node) => node.rebuild_outputs(frame, parent_global),
        }
    }

    pub fn mark_local_updates(&mut self) {
        match self {
            AnimatorNode::Transform(node) => node.mark_local_updates(),
        }
    }

    pub fn mark_upstream_updates(&mut self) {
        match self {
            AnimatorNode::Transform(node) => node.mark_upstream_updates(),
        }
    }

    pub fn clear_updates(&mut self) {
        match self {
            AnimatorNode::Transform(node) => node.clear_updates(),
        }
    }

    pub fn global_transform(&self) -> Mat4 {
        match self {
            AnimatorNode::Transform(node) => node.global_transform(),
        }
    }

    pub fn as_transform(&self) -> Option<&LayerTransformNode> {
        match self {
            AnimatorNode::Transform(node) => Some(node),
        }
    }

    pub fn as_transform_mut(&mut self) -> Option<&mut LayerTransformNode> {
        match self {
            AnimatorNode::Transform(node) => Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animatable::{KeyframeTrack, TrackKeyframe};

    const EPS: f32 = 1e-4;

    fn rotating_descriptor() -> TransformDescriptor {
        TransformDescriptor {
            rotation_z: KeyframeTrack::from_keyframes(vec![
                TrackKeyframe::linear(0.0, 0.0),
                TrackKeyframe::linear(10.0, 90.0),
            ]),
            position: Some(KeyframeTrack::constant(Vec3::new(100.0, 0.0, 0.0))),
            ..Default::default()
        }
    }

    #[test]
    fn first_update_always_rebuilds() {
        let mut node = LayerTransformNode::new(&TransformDescriptor::default(), None);
        assert!(node.last_update_frame().is_none());
        assert!(!node.should_rebuild_outputs(0.0));

        assert!(node.update_contents(0.0, false));
        assert!(node.has_local_updates());
        assert_eq!(node.last_update_frame(), Some(0.0));
    }

    #[test]
    fn rebuild_leaves_flags_to_the_driver() {
        let mut node = LayerTransformNode::new(&rotating_descriptor(), None);
        node.update_contents(5.0, false);
        node.rebuild_outputs(5.0, None);
        assert!(node.has_local_updates());

        node.clear_updates();
        assert!(!node.should_rebuild_outputs(5.0));
        // Same frame again: nothing new.
        assert!(!node.update_contents(5.0, false));
        // Inside the animated span: the rotation moves.
        assert!(node.update_contents(6.0, false));
    }

    #[test]
    fn upstream_flag_alone_requests_rebuild() {
        let mut node = LayerTransformNode::new(&TransformDescriptor::default(), None);
        node.update_contents(0.0, false);
        node.rebuild_outputs(0.0, None);
        node.clear_updates();

        node.mark_upstream_updates();
        assert!(node.update_contents(1.0, false));
        assert!(!node.has_local_updates());
        assert!(node.has_upstream_updates());
    }

    #[test]
    fn root_global_equals_local() {
        let mut node = LayerTransformNode::new(&rotating_descriptor(), None);
        node.rebuild_outputs(5.0, None);
        assert_eq!(node.global_transform(), node.local_transform());
    }

    #[test]
    fn rotation_scenario_at_midpoint() {
        let mut node = LayerTransformNode::new(&rotating_descriptor(), None);
        node.rebuild_outputs(5.0, None);

        assert!((node.properties().rotation_z().cached_value().copied().unwrap() - 45.0).abs() < EPS);
        let expected = Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0))
            * Mat4::from_rotation_z(45f32.to_radians());
        assert!(node.local_transform().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn opacity_is_a_percentage() {
        for (channel, applied) in [(100.0, 1.0), (0.0, 0.0), (50.0, 0.5)] {
            let mut node = LayerTransformNode::new(
                &TransformDescriptor {
                    opacity: KeyframeTrack::constant(channel),
                    ..Default::default()
                },
                None,
            );
            node.rebuild_outputs(0.0, None);
            assert!((node.opacity() - applied).abs() < EPS);
        }
    }

    #[test]
    fn split_position_resolves_with_zero_depth() {
        let mut node = LayerTransformNode::new(
            &TransformDescriptor {
                position_x: Some(KeyframeTrack::constant(12.0)),
                position_y: Some(KeyframeTrack::constant(-4.0)),
                ..Default::default()
            },
            None,
        );
        node.rebuild_outputs(0.0, None);
        assert!(node
            .global_transform()
            .abs_diff_eq(Mat4::from_translation(Vec3::new(12.0, -4.0, 0.0)), EPS));
    }

    #[test]
    fn missing_position_resolves_to_origin() {
        let mut node = LayerTransformNode::new(&TransformDescriptor::default(), None);
        node.rebuild_outputs(0.0, None);
        assert!(node.local_transform().abs_diff_eq(Mat4::IDENTITY, EPS));
    }

    #[test]
    fn child_composes_with_parent_global() {
        let parent_global = Mat4::from_rotation_z(90f32.to_radians());
        let mut child = LayerTransformNode::new(
            &TransformDescriptor {
                position: Some(KeyframeTrack::constant(Vec3::new(10.0, 0.0, 0.0))),
                ..Default::default()
            },
            None,
        );
        child.rebuild_outputs(0.0, Some(parent_global));

        assert!(child
            .global_transform()
            .abs_diff_eq(combine(child.local_transform(), parent_global), EPS));
        assert!(child
            .global_transform()
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 10.0, 0.0), EPS));
    }

    #[test]
    fn disabled_node_passes_parent_through() {
        let parent_global = Mat4::from_translation(Vec3::new(3.0, 4.0, 0.0));
        let mut node = LayerTransformNode::new(&rotating_descriptor(), None);
        node.set_enabled(false);
        assert!(node.has_local_updates());

        node.rebuild_outputs(5.0, Some(parent_global));
        assert_eq!(node.local_transform(), Mat4::IDENTITY);
        assert_eq!(node.global_transform(), parent_global);
        assert_eq!(node.opacity(), 1.0);
        assert!(node.properties().rotation_z().cached_value().is_none());
    }

    #[test]
    fn global_affine_matches_translation() {
        let mut node = LayerTransformNode::new(&rotating_descriptor(), None);
        node.rebuild_outputs(0.0, None);
        let coeffs = node.global_affine().as_coeffs();
        assert_eq!([coeffs[4], coeffs[5]], [100.0, 0.0]);
    }
}
