//! Radio attenuation length of ice
//!
//! The attenuation length depends on the ice temperature, itself a function of depth,
//! and on frequency. It is modeled as two log-log linear segments joining three
//! frequency breakpoints, $0.1$MHz, $1$GHz and $3.16$GHz, whose ordinates are quadratic in
//! the temperature.

use crate::units::{GHZ, MHZ};

/// Low frequency breakpoint
const F0: f64 = 0.1 * MHZ;
/// Band edge between the two log-log segments
const F1: f64 = 1. * GHZ;
/// High frequency breakpoint
const F2: f64 = 3.16 * GHZ;

/// Ice temperature [°C] at depth $z$
///
/// $$T(z) = -51.5 + z(-4.5319\times 10^{-3} + 5.822\times 10^{-6}z)$$
pub fn temperature(z: f64) -> f64 {
    -51.5 + z * (-4.5319e-3 + 5.822e-6 * z)
}

/// Log-log segment $(a,b)$ such as $-\ln L = a + b\ln(f/\mathrm{GHz})$
#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
}
/// Both segments at a given depth, computed once for any number of frequencies
#[derive(Debug, Clone, Copy)]
struct Segments {
    low: Segment,
    high: Segment,
}
impl Segments {
    fn at(z: f64) -> Self {
        let t = temperature(z);
        let (w0, w1, w2) = ((F0 / GHZ).ln(), (F1 / GHZ).ln(), (F2 / GHZ).ln());
        let b0 = -6.74890 + t * (0.026709 - t * 0.000884);
        let b1 = -6.22121 - t * (0.070927 + t * 0.001773);
        let b2 = -4.09468 - t * (0.002213 + t * 0.000332);
        Self {
            low: Segment {
                a: (b1 * w0 - b0 * w1) / (w0 - w1),
                b: (b1 - b0) / (w1 - w0),
            },
            high: Segment {
                a: (b2 * w1 - b1 * w2) / (w1 - w2),
                b: (b2 - b1) / (w2 - w1),
            },
        }
    }
    fn length(&self, frequency: f64) -> f64 {
        if frequency <= 0f64 {
            return std::f64::INFINITY;
        }
        let Segment { a, b } = if frequency < F1 {
            self.low
        } else {
            self.high
        };
        1f64 / (a + b * (frequency / GHZ).ln()).exp()
    }
}

/// Attenuation length [m] at depth $z$ and `frequency`
///
/// A non-positive frequency has an infinite attenuation length.
pub fn attenuation_length(z: f64, frequency: f64) -> f64 {
    Segments::at(z).length(frequency)
}
/// Attenuation lengths [m] at depth $z$ for each of the `frequencies`
pub fn attenuation_length_batch(z: f64, frequencies: &[f64]) -> Vec<f64> {
    let segments = Segments::at(z);
    frequencies.iter().map(|&f| segments.length(f)).collect()
}
