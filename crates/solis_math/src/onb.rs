use crate::Vec3;

/// Orthonormal basis `(u, v, w)` used to turn local hemisphere samples into
/// world-space directions. `w` is the axis the hemisphere is centered on.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    /// Build a right-handed basis around `w`, which must be unit length.
    pub fn from_w(w: Vec3) -> Self {
        let helper = if w.x.abs() > 0.1 { Vec3::Y } else { Vec3::X };
        let u = helper.cross(w).normalize();
        let v = w.cross(u);
        Self { u, v, w }
    }

    /// Map local coordinates `(a, b, c)` to `a*u + b*v + c*w`.
    #[inline]
    pub fn local(&self, a: f32, b: f32, c: f32) -> Vec3 {
        a * self.u + b * self.v + c * self.w
    }
}
