use approx::assert_relative_eq;

use panoview_core::coords::{ImagePoint, RawPoint, Size};
use panoview_core::loader::{resolve_orientation, MetadataError};
use panoview_core::orientation::Orientation;

// ---------------------------------------------------------------------------
// EXIF codes
// ---------------------------------------------------------------------------

#[test]
fn test_exif_codes_round_trip() {
    for (i, o) in Orientation::ALL.iter().enumerate() {
        let code = i as u32 + 1;
        assert_eq!(o.exif_code(), code);
        assert_eq!(Orientation::from_exif(code), Some(*o));
    }
}

#[test]
fn test_exif_out_of_range() {
    assert_eq!(Orientation::from_exif(0), None);
    assert_eq!(Orientation::from_exif(9), None);
    assert_eq!(resolve_orientation(None), Ok(Orientation::Identity));
    assert_eq!(resolve_orientation(Some(9)), Err(MetadataError::InvalidOrientation(9)));
}

#[test]
fn test_orientation_display() {
    let s = Orientation::Rotate90Cw.to_string();
    assert_eq!(s, "Rotate 90° CW (6)", "got: {s}");
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[test]
fn test_swaps_axes_only_for_transposing_codes() {
    for o in Orientation::ALL {
        assert_eq!(o.swaps_axes(), o.exif_code() >= 5, "{o}");
        let expected = if o.swaps_axes() { (2000, 1000) } else { (1000, 2000) };
        assert_eq!(o.oriented_size(1000, 2000), expected, "{o}");
    }
}

#[test]
fn test_matrices_are_orthogonal() {
    for o in Orientation::ALL {
        let m = o.matrix();
        let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
        assert_eq!(det.abs(), 1, "{o}");
    }
}

#[test]
fn test_rotate_cw_maps_raw_to_oriented() {
    let raw = Size::new(1000.0, 2000.0);
    let p = Orientation::Rotate90Cw.oriented_for_raw(RawPoint::new(500.0, 1000.0), raw);
    assert_relative_eq!(p.x, 1000.0);
    assert_relative_eq!(p.y, 500.0);

    // Raw upper-left corner ends up upper-right after rotating clockwise.
    let corner = Orientation::Rotate90Cw.oriented_for_raw(RawPoint::new(0.0, 0.0), raw);
    assert_relative_eq!(corner.x, 2000.0);
    assert_relative_eq!(corner.y, 0.0);
}

#[test]
fn test_flip_horizontal_mirrors_x() {
    let raw = Size::new(300.0, 200.0);
    let p = Orientation::FlipHorizontal.oriented_for_raw(RawPoint::new(10.0, 20.0), raw);
    assert_relative_eq!(p.x, 290.0);
    assert_relative_eq!(p.y, 20.0);
}

#[test]
fn test_raw_for_oriented_inverts_every_orientation() {
    let raw = Size::new(640.0, 480.0);
    let p = RawPoint::new(123.25, 77.5);
    for o in Orientation::ALL {
        let oriented = o.oriented_for_raw(p, raw);
        let back = o.raw_for_oriented(oriented, raw);
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
    }
}

#[test]
fn test_oriented_corners_stay_in_bounds() {
    let raw = Size::new(640.0, 480.0);
    for o in Orientation::ALL {
        let (w, h) = o.oriented_size(640, 480);
        for (x, y) in [(0.0, 0.0), (640.0, 0.0), (0.0, 480.0), (640.0, 480.0)] {
            let p: ImagePoint = o.oriented_for_raw(RawPoint::new(x, y), raw);
            assert!(p.x >= 0.0 && p.x <= f64::from(w), "{o}: {p:?}");
            assert!(p.y >= 0.0 && p.y <= f64::from(h), "{o}: {p:?}");
        }
    }
}

#[test]
fn test_inverse_composes_to_identity_matrix() {
    for o in Orientation::ALL {
        let a = o.matrix();
        let b = o.inverse().matrix();
        let product = [
            [a[0][0] * b[0][0] + a[0][1] * b[1][0], a[0][0] * b[0][1] + a[0][1] * b[1][1]],
            [a[1][0] * b[0][0] + a[1][1] * b[1][0], a[1][0] * b[0][1] + a[1][1] * b[1][1]],
        ];
        assert_eq!(product, [[1, 0], [0, 1]], "{o}");
    }
}

#[test]
fn test_orientation_serde_kebab_case() {
    let json = serde_json::to_string(&Orientation::Rotate90Ccw).unwrap();
    assert_eq!(json, "\"rotate90-ccw\"");
    let back: Orientation = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Orientation::Rotate90Ccw);
}
