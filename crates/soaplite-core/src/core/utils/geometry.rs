use nalgebra::{Point3, Vector3};

/// Projects `v` onto the normal of the plane spanned by `u` and `w`.
///
/// Returns `None` when `u` and `w` are (anti)parallel, since the plane is then undefined.
pub fn perpendicular_component(
    v: &Vector3<f64>,
    u: &Vector3<f64>,
    w: &Vector3<f64>,
) -> Option<Vector3<f64>> {
    let normal = u.cross(w);
    let normal_sq = normal.norm_squared();
    if normal_sq <= f64::EPSILON * u.norm_squared() * w.norm_squared() {
        return None;
    }
    Some(normal * (v.dot(&normal) / normal_sq))
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

pub fn flatten_points(points: &[Point3<f64>]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}
