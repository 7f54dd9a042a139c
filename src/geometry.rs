//! End-effector pose primitives.
//!
//! Euler angles are `(roll, pitch, yaw)` in radians, composed as intrinsic Z-Y-X
//! (yaw, then pitch, then roll). Quaternions are laid out `(x, y, z, w)`.
//! [`euler_to_quaternion`] and [`quaternion_to_euler`] are exact inverses under
//! that convention, away from the ±90° pitch singularity.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};

/// Smallest quaternion norm accepted by [`quaternion_to_euler`].
const MIN_QUATERNION_NORM: f32 = 1e-6;

/// A 3D positional delta.
///
/// Internally uses [`nalgebra::Vector3<f32>`] for downstream math convenience.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3D(pub Vector3<f32>);

impl Vector3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }

    pub fn z(&self) -> f32 {
        self.0.z
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.0.x, self.0.y, self.0.z]
    }
}

impl From<[f32; 3]> for Vector3D {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Converts `(roll, pitch, yaw)` to a unit quaternion `(x, y, z, w)`.
///
/// Fails on non-finite angles.
pub fn euler_to_quaternion(euler: [f32; 3]) -> Result<[f32; 4]> {
    if euler.iter().any(|a| !a.is_finite()) {
        return Err(PreprocessError::helper(
            "euler_to_quaternion",
            format!("non-finite Euler angles {euler:?}"),
        ));
    }

    let [roll, pitch, yaw] = euler;
    let q = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
    let c = q.quaternion().coords;
    Ok([c.x, c.y, c.z, c.w])
}

/// Converts a quaternion `(x, y, z, w)` to `(roll, pitch, yaw)`.
///
/// The input is normalized first, so any non-zero scaling of a rotation maps
/// to the same angles. Zero-norm and non-finite input is rejected.
pub fn quaternion_to_euler(quaternion: [f32; 4]) -> Result<[f32; 3]> {
    if quaternion.iter().any(|c| !c.is_finite()) {
        return Err(PreprocessError::helper(
            "quaternion_to_euler",
            format!("non-finite quaternion {quaternion:?}"),
        ));
    }

    let [x, y, z, w] = quaternion;
    let raw = Quaternion::new(w, x, y, z);
    if raw.norm() < MIN_QUATERNION_NORM {
        return Err(PreprocessError::helper(
            "quaternion_to_euler",
            format!("degenerate quaternion {quaternion:?}"),
        ));
    }

    let (roll, pitch, yaw) = UnitQuaternion::from_quaternion(raw).euler_angles();
    Ok([roll, pitch, yaw])
}
