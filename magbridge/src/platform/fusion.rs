//! Tilt-compensated compass math.
//!
//! Derives the device azimuth from a raw magnetic field vector and a
//! gravity vector, both in the device frame (x right, y top, z out of the
//! screen). This is the standard rotation-matrix construction used by
//! mobile sensor stacks: build an east axis from `field x gravity`, a
//! north axis from `gravity x east`, and read the azimuth off the matrix.

/// Minimum norm of `field x gravity` for a solvable orientation.
///
/// Below this the device is in free fall or the field is parallel to
/// gravity (magnetic pole, heavy interference) and no azimuth exists.
const CROSS_NORM_MIN: f64 = 0.1;

/// Azimuth of the device's top edge, in degrees clockwise from magnetic
/// north, normalized to `[0, 360)`.
///
/// `mag` is in microteslas, `gravity` in m/s²; only their directions
/// matter. Returns `None` when the orientation is unsolvable.
///
/// # Example
///
/// ```
/// use magbridge::platform::fusion::tilt_compensated_azimuth;
///
/// // Device flat on its back, top edge pointing at magnetic north.
/// let azimuth = tilt_compensated_azimuth([0.0, 30.0, -40.0], [0.0, 0.0, 9.81]);
/// assert!(azimuth.unwrap().abs() < 1e-6);
/// ```
pub fn tilt_compensated_azimuth(mag: [f64; 3], gravity: [f64; 3]) -> Option<f64> {
    // East axis: perpendicular to both the field and gravity.
    let east = cross(mag, gravity);
    let east_norm = length(east);
    if east_norm < CROSS_NORM_MIN {
        return None;
    }
    let east = scale(east, 1.0 / east_norm);

    let gravity_norm = length(gravity);
    let up = scale(gravity, 1.0 / gravity_norm);

    // North axis: horizontal component of the field direction.
    let north = cross(up, east);

    // Azimuth of the device y axis within the east/north ground plane.
    let azimuth = east[1].atan2(north[1]).to_degrees();
    Some(normalize_degrees(azimuth))
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Smallest absolute angular difference between two headings in degrees,
/// accounting for the wrap at 360. Always in `[0, 180]`.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = (normalize_degrees(a) - normalize_degrees(b)).abs();
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn length(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn scale(v: [f64; 3], factor: f64) -> [f64; 3] {
    [v[0] * factor, v[1] * factor, v[2] * factor]
}
