use glam::{Mat4, Vec2, Vec3};
use kurbo::Affine;

/// Builds a layer's local matrix.
///
/// Points are moved by `-anchor`, scaled by `scale` (percent, x and y only),
/// rotated about Z, Y then X, oriented, and finally translated to
/// `position`. Angles are in degrees.
pub fn make_transform(
    anchor: Vec3,
    position: Vec3,
    scale: Vec2,
    rotation_x: f32,
    rotation_y: f32,
    rotation_z: f32,
    orientation: Vec3,
) -> Mat4 {
    let mat_t = Mat4::from_translation(position);

    let mat_or = Mat4::from_euler(
        glam::EulerRot::YXZ,
        orientation.y.to_radians(),
        orientation.x.to_radians(),
        orientation.z.to_radians(),
    );

    let mat_rx = Mat4::from_rotation_x(rotation_x.to_radians());
    let mat_ry = Mat4::from_rotation_y(rotation_y.to_radians());
    let mat_rz = Mat4::from_rotation_z(rotation_z.to_radians());

    let mat_s = Mat4::from_scale((scale / 100.0).extend(1.0));
    let mat_a = Mat4::from_translation(-anchor);

    mat_t * mat_or * mat_rx * mat_ry * mat_rz * mat_s * mat_a
}

/// Places `local` inside its parent's space: the local transform applies
/// first, then the parent's global transform.
pub fn combine(local: Mat4, parent_global: Mat4) -> Mat4 {
    parent_global * local
}

/// Drops the z row and column, keeping the 2D part a flat renderer needs.
pub fn to_affine(m: &Mat4) -> Affine {
    Affine::new([
        m.x_axis.x as f64,
        m.x_axis.y as f64,
        m.y_axis.x as f64,
        m.y_axis.y as f64,
        m.w_axis.x as f64,
        m.w_axis.y as f64,
    ])
}
