use glam::{Mat4, Quat, Vec3};
use splat_host::math::{union_all, AABB};

#[cfg(test)]
mod aabb_tests {
    use super::*;

    fn boxes() -> Vec<AABB> {
        vec![
            AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0)),
            AABB::new(Vec3::new(-5.0, 2.0, 1.0), Vec3::new(-1.0, 3.0, 4.0)),
            AABB::new(Vec3::new(3.0, -8.0, 6.0), Vec3::new(4.0, -7.0, 20.0)),
            AABB::new(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5)),
        ]
    }

    #[test]
    fn test_aabb_union_creates_bounding_box() {
        let aabb1 = AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 10.0, 10.0));
        let aabb2 = AABB::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(15.0, 15.0, 15.0));

        let union = aabb1.union(&aabb2);

        assert_eq!(union.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(union.max, Vec3::new(15.0, 15.0, 15.0));
    }

    #[test]
    fn test_aabb_union_with_contained_box() {
        let aabb1 = AABB::new(Vec3::ZERO, Vec3::splat(10.0));
        let aabb2 = AABB::new(Vec3::splat(2.0), Vec3::splat(8.0));

        let union = aabb1.union(&aabb2);

        assert_eq!(union, aabb1, "Union should equal larger box");
    }

    #[test]
    fn test_add_grows_in_place() {
        let mut aabb = AABB::new(Vec3::ZERO, Vec3::ONE);
        aabb.add(&AABB::new(Vec3::splat(-2.0), Vec3::splat(-1.0)));
        assert_eq!(aabb, AABB::new(Vec3::splat(-2.0), Vec3::ONE));
    }

    #[test]
    fn test_union_all_is_order_independent() {
        let forward = union_all(&boxes()).unwrap();

        let mut reversed = boxes();
        reversed.reverse();
        assert_eq!(union_all(&reversed).unwrap(), forward);

        let mut rotated = boxes();
        rotated.rotate_left(2);
        assert_eq!(union_all(&rotated).unwrap(), forward);

        // grouping does not matter either
        let b = boxes();
        let left = b[0].union(&b[1]).union(&b[2].union(&b[3]));
        assert_eq!(left, forward);

        assert_eq!(forward.min, Vec3::new(-5.0, -8.0, -0.5));
        assert_eq!(forward.max, Vec3::new(10.0, 10.0, 20.0));
    }

    #[test]
    fn test_union_all_of_nothing_is_none() {
        assert!(union_all(&[]).is_none());
    }

    #[test]
    fn test_aabb_center_with_negative_coords() {
        let aabb = AABB::new(Vec3::new(-10.0, -20.0, -30.0), Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.half_extents(), Vec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_transformed_by_translation_and_scale() {
        let aabb = AABB::new(Vec3::splat(-1.0), Vec3::ONE);
        let m = Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::new(5.0, 0.0, 0.0));
        let world = aabb.transformed(&m);
        assert!((world.min - Vec3::new(3.0, -2.0, -2.0)).length() < 1e-5);
        assert!((world.max - Vec3::new(7.0, 2.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_transformed_encloses_rotated_corners() {
        let aabb = AABB::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(2.0, 1.0, 0.5));
        let m = Mat4::from_rotation_translation(
            Quat::from_euler(glam::EulerRot::XYZ, 0.3, 1.1, -0.7),
            Vec3::new(1.0, -4.0, 2.0),
        );
        let world = aabb.transformed(&m);
        for corner in aabb.corners() {
            let p = m.transform_point3(corner);
            assert!(world.min.cmple(p + Vec3::splat(1e-4)).all(), "{p} below {}", world.min);
            assert!(world.max.cmpge(p - Vec3::splat(1e-4)).all(), "{p} above {}", world.max);
        }
    }

    #[test]
    fn test_from_points() {
        let points = [Vec3::new(1.0, -1.0, 0.0), Vec3::new(-3.0, 2.0, 5.0), Vec3::ZERO];
        let aabb = AABB::from_points(points).unwrap();
        assert_eq!(aabb.min, Vec3::new(-3.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 5.0));
        assert!(points.iter().all(|&p| aabb.contains_point(p)));
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }
}
