use tabletop_core::PointCloud;

/// Keeps the points whose per-point scalar lies in `[min, max]`.
///
/// `values[i]` belongs to point `i` (a signed height, a distance, a single
/// coordinate...). Non-finite values never pass. Normals follow their points.
///
/// # Panics
///
/// Panics if `values.len() != cloud.len()`.
pub fn band_filter(cloud: &PointCloud, values: &[f32], min: f32, max: f32) -> PointCloud {
    assert_eq!(
        values.len(),
        cloud.len(),
        "band_filter needs exactly one value per point"
    );
    if cloud.is_empty() {
        return PointCloud::new();
    }

    let keep: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite() && **v >= min && **v <= max)
        .map(|(i, _)| i)
        .collect();

    cloud.select(&keep)
}

#[cfg(test)]
mod tests {
    use super::band_filter;
    use proptest::prelude::*;
    use tabletop_core::PointCloud;

    fn sample_cloud() -> PointCloud {
        PointCloud::from_points_normals(
            &[
                [1.0, 10.0, 100.0],
                [2.0, 20.0, 200.0],
                [3.0, 30.0, 300.0],
                [4.0, 40.0, 400.0],
                [5.0, 50.0, 500.0],
            ],
            &[[0.0, 0.0, -1.0]; 5],
        )
    }

    #[test]
    fn band_on_a_coordinate() {
        let cloud = sample_cloud();
        let result = band_filter(&cloud, &cloud.y, 20.0, 40.0);
        assert_eq!(result.y, vec![20.0, 30.0, 40.0]);
        assert_eq!(result.normals.as_ref().map(|n| n.len()), Some(3));
    }

    #[test]
    fn bounds_are_inclusive() {
        let cloud = sample_cloud();
        let result = band_filter(&cloud, &[0.005, 0.0049, 0.05, 0.0501, 0.02], 0.005, 0.05);
        assert_eq!(result.x, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let cloud = sample_cloud();
        let values = [f32::NAN, 1.0, f32::INFINITY, f32::NEG_INFINITY, 1.0];
        let result = band_filter(&cloud, &values, f32::MIN, f32::MAX);
        assert_eq!(result.x, vec![2.0, 5.0]);
    }

    #[test]
    fn empty_cloud() {
        let result = band_filter(&PointCloud::new(), &[], 0.0, 1.0);
        assert!(result.is_empty());
    }

    #[test]
    fn empty_band_keeps_nothing() {
        let cloud = sample_cloud();
        assert!(band_filter(&cloud, &cloud.x, 10.0, 20.0).is_empty());
    }

    #[test]
    #[should_panic]
    fn mismatched_values_panic() {
        let _ = band_filter(&sample_cloud(), &[1.0], 0.0, 1.0);
    }

    proptest! {
        #[test]
        fn survivors_lie_in_band(
            values in prop::collection::vec(-100.0f32..100.0f32, 1..500),
            min_val in -50.0f32..0.0f32,
            max_val in 0.0f32..50.0f32,
        ) {
            let cloud = PointCloud::from_xyz(values.clone(), vec![0.0; values.len()], vec![0.0; values.len()]);
            let result = band_filter(&cloud, &values, min_val, max_val);
            prop_assert!(result.len() <= cloud.len());
            for &x in &result.x {
                prop_assert!(x >= min_val && x <= max_val, "x={} outside [{}, {}]", x, min_val, max_val);
            }
        }
    }
}
