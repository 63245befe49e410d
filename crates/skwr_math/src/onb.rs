use crate::Vec3;

/// Orthonormal basis built around a single axis `w`.
#[derive(Debug, Clone, Copy)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    /// Build a basis whose third axis is the normalized `n`.
    pub fn from_w(n: Vec3) -> Self {
        let w = n.normalize();
        let a = if w.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let v = w.cross(a).normalize();
        let u = w.cross(v);
        Self { u, v, w }
    }

    /// Transform local coordinates into world space.
    #[inline]
    pub fn local(&self, a: Vec3) -> Vec3 {
        a.x * self.u + a.y * self.v + a.z * self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onb_is_orthonormal() {
        for n in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 2.0, -3.0), -Vec3::X] {
            let b = Onb::from_w(n);
            assert!((b.u.length() - 1.0).abs() < 1e-5);
            assert!((b.v.length() - 1.0).abs() < 1e-5);
            assert!((b.w.length() - 1.0).abs() < 1e-5);
            assert!(b.u.dot(b.v).abs() < 1e-5);
            assert!(b.u.dot(b.w).abs() < 1e-5);
            assert!(b.v.dot(b.w).abs() < 1e-5);
        }
    }

    #[test]
    fn test_onb_local_z_maps_to_w() {
        let b = Onb::from_w(Vec3::new(0.0, 3.0, 0.0));
        assert!((b.local(Vec3::Z) - Vec3::Y).length() < 1e-5);
    }
}
