//! Coordinate normalization between the capture's physical pixel space and
//! the logical pointer space the input backend expects.

/// Converts physical capture-pixel coordinates to logical pointer
/// coordinates. Integer-truncated division per axis; `scale` is guaranteed
/// positive by the display capability's contract, so there is no error path.
pub fn to_logical(physical_x: f64, physical_y: f64, scale: f64) -> (i32, i32) {
    ((physical_x / scale) as i32, (physical_y / scale) as i32)
}

/// Center of a detection quad: average of the first and third corner.
pub fn quad_center(quad: &[(f32, f32); 4]) -> (f64, f64) {
    (
        (quad[0].0 as f64 + quad[2].0 as f64) / 2.0,
        (quad[0].1 as f64 + quad[2].1 as f64) / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_logical_halves_on_retina() {
        assert_eq!(to_logical(200.0, 200.0, 2.0), (100, 100));
    }

    #[test]
    fn to_logical_is_identity_at_scale_one() {
        assert_eq!(to_logical(640.0, 480.0, 1.0), (640, 480));
    }

    #[test]
    fn to_logical_truncates() {
        // 333 / 2 = 166.5 → 166
        assert_eq!(to_logical(333.0, 335.0, 2.0), (166, 167));
    }

    #[test]
    fn quad_center_averages_opposite_corners() {
        let quad = [(10.0, 20.0), (110.0, 20.0), (110.0, 60.0), (10.0, 60.0)];
        assert_eq!(quad_center(&quad), (60.0, 40.0));
    }
}
