use serde::{Deserialize, Serialize};

/// # Ice refractive index profile
///
/// The refractive index varies with depth $z\le 0$ as
/// $$n(z) = n_{ice} - \Delta_n e^{z/z_0},$$
/// from $n_{ice}-\Delta_n$ at the surface to $n_{ice}$ in deep ice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediumProfile {
    /// Deep ice refractive index $n_{ice}$
    pub n_ice: f64,
    /// Index drop at the surface $\Delta_n$
    pub delta_n: f64,
    /// Scale depth of the firn $z_0$ [m]
    pub z_0: f64,
}
impl MediumProfile {
    /// Creates a new `MediumProfile`
    pub fn new(n_ice: f64, delta_n: f64, z_0: f64) -> Self {
        Self {
            n_ice,
            delta_n,
            z_0,
        }
    }
    /// South Pole, simple exponential fit:
    ///  - $n_{ice}=1.78$
    ///  - $\Delta_n=0.426$
    ///  - $z_0=71$m
    pub fn south_pole_simple() -> Self {
        Self::new(1.78, 0.426, 71.)
    }
    /// South Pole, 2015 fit:
    ///  - $n_{ice}=1.78$
    ///  - $\Delta_n=0.423$
    ///  - $z_0=77$m
    pub fn south_pole_2015() -> Self {
        Self::new(1.78, 0.423, 77.)
    }
    /// South Pole profile of the ARA simulation:
    ///  - $n_{ice}=1.78$
    ///  - $\Delta_n=0.43$
    ///  - $z_0=75.75757575$m
    pub fn ara_sim_south_pole() -> Self {
        Self::new(1.78, 0.43, 75.75757575)
    }
    /// Moore's Bay (Ross ice shelf):
    ///  - $n_{ice}=1.78$
    ///  - $\Delta_n=0.46$
    ///  - $z_0=34.5$m
    pub fn moores_bay_simple() -> Self {
        Self::new(1.78, 0.46, 34.5)
    }
    /// Summit station, Greenland:
    ///  - $n_{ice}=1.78$
    ///  - $\Delta_n=0.51$
    ///  - $z_0=37.25$m
    pub fn greenland_simple() -> Self {
        Self::new(1.78, 0.51, 37.25)
    }
    /// Refractive index at depth $z$
    pub fn n(&self, z: f64) -> f64 {
        self.n_ice - self.gamma(z)
    }
    /// $$\gamma(z) = \Delta_n e^{z/z_0}$$
    pub fn gamma(&self, z: f64) -> f64 {
        self.delta_n * (z / self.z_0).exp()
    }
    /// Refractive index at the surface
    pub fn n_surface(&self) -> f64 {
        self.n(0f64)
    }
}
