use nalgebra::Vector3;

/// Resample a polyline into the points of alternating dash/gap runs of
/// fixed arclengths, starting in a dash.
///
/// The walk advances through each input segment in stretches of
/// `min(remaining-in-state, remaining-in-segment)` and emits a point at the
/// start of every stretch taken in the dash state. That makes the first
/// input point the first emission, puts a point wherever a dash crosses an
/// input vertex, and starts each dash exactly where the preceding gap ended.
/// Lossy by design: the output is for drawing, not for re-dashing.
pub fn dash_path(
    points: &[Vector3<f32>],
    dash_length: f32,
    gap_length: f32,
) -> Vec<Vector3<f32>> {
    if points.len() < 2 || dash_length <= super::EPSILON || gap_length <= super::EPSILON {
        return points.to_vec();
    }
    let mut dashed = Vec::with_capacity(points.len() * 2);
    let mut in_dash = true;
    let mut progress = 0.;
    for pair in points.windows(2) {
        let segment = pair[1] - pair[0];
        let segment_length = segment.norm();
        if segment_length <= super::EPSILON {
            continue;
        }
        let direction = segment / segment_length;
        let mut travelled = 0.;
        while segment_length - travelled > super::EPSILON {
            let active = if in_dash { dash_length } else { gap_length };
            let stretch = (active - progress).min(segment_length - travelled);
            if in_dash {
                dashed.push(pair[0] + direction * travelled);
            }
            travelled += stretch;
            progress += stretch;
            if active - progress <= super::EPSILON {
                in_dash = !in_dash;
                progress = 0.;
            }
        }
    }
    dashed
}
