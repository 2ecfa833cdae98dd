//! Antialiasing kernel table.
//!
//! A windowed-sinc lowpass kernel sampled at [`KERNEL_UNIT`] points per sample
//! over [`KERNEL_SUPPORT`] samples, with its first and second running integrals.
//! Convolving the kernel with a linear segment reduces by parts to four lookups
//! into `k1` and `k2`, so the renderer never sums the kernel at runtime.

use crate::invariant::{contract_violation, KERNEL_INDEX_IN_DOMAIN};
use lazy_static::lazy_static;
use std::f64::consts::PI;

/// Table points per audio sample.
pub const KERNEL_UNIT: usize = 256;
/// Kernel half-width in samples.
pub const KERNEL_SUPPORT: usize = 32;
/// Entries per table.
pub const KERNEL_LEN: usize = KERNEL_UNIT * KERNEL_SUPPORT + 1;

/// Fraction of Nyquist kept by the lowpass.
const CUTOFF: f64 = 0.83;
/// Width of the Gaussian window, in radians of sinc argument.
const WINDOW_WIDTH: f64 = 40.0;

lazy_static! {
    static ref SHARED: KernelTable = KernelTable::build();
}

/// The three lookup tables. Immutable once built.
#[derive(Debug, Clone)]
pub struct KernelTable {
    k0: Vec<f64>,
    k1: Vec<f64>,
    k2: Vec<f64>,
}

impl KernelTable {
    /// The process-wide table, built on first use.
    pub fn shared() -> &'static KernelTable {
        &SHARED
    }

    /// Build the tables from scratch.
    pub fn build() -> Self {
        let k0: Vec<f64> = (0..KERNEL_LEN)
            .map(|a| {
                let theta = a as f64 / KERNEL_UNIT as f64 * PI * CUTOFF;
                if theta == 0.0 {
                    1.0
                } else {
                    let w = theta / WINDOW_WIDTH;
                    theta.sin() / theta * (-(w * w)).exp()
                }
            })
            .collect();
        let k1 = integrate(&k0);
        let k2 = integrate(&k1);
        Self { k0, k1, k2 }
    }

    pub fn k0(&self) -> &[f64] {
        &self.k0
    }

    pub fn k1(&self) -> &[f64] {
        &self.k1
    }

    pub fn k2(&self) -> &[f64] {
        &self.k2
    }

    /// First integral, extended as an odd function.
    #[inline]
    pub fn gk1(&self, x: i64) -> f64 {
        if x > 0 {
            self.k1[checked(x)]
        } else {
            -self.k1[checked(-x)]
        }
    }

    /// Second integral, extended as an even function.
    #[inline]
    pub fn gk2(&self, x: i64) -> f64 {
        if x > 0 {
            self.k2[checked(x)]
        } else {
            self.k2[checked(-x)]
        }
    }
}

#[inline]
fn checked(x: i64) -> usize {
    if x < 0 || x >= KERNEL_LEN as i64 {
        contract_violation(
            KERNEL_INDEX_IN_DOMAIN,
            &format!("kernel index {} outside 0..{}", x, KERNEL_LEN),
        );
    }
    x as usize
}

/// Cumulative trapezoidal integral, in units of samples.
fn integrate(src: &[f64]) -> Vec<f64> {
    let mut dst = Vec::with_capacity(src.len());
    dst.push(0.0);
    for a in 1..src.len() {
        let step = (src[a] + src[a - 1]) / 2.0 / KERNEL_UNIT as f64;
        dst.push(dst[a - 1] + step);
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_peaks_at_origin() {
        let table = KernelTable::shared();
        assert_eq!(table.k0()[0], 1.0);
        assert_eq!(table.k1()[0], 0.0);
        assert_eq!(table.k2()[0], 0.0);
        assert!(table.k0().iter().all(|&v| v <= 1.0));
    }

    #[test]
    fn first_integral_plateaus_at_half_dc_gain() {
        let table = KernelTable::shared();
        let plateau = table.k1()[KERNEL_LEN - 1];
        assert!((plateau - 0.5 / CUTOFF).abs() < 0.01, "plateau {}", plateau);
    }

    #[test]
    fn shared_table_is_built_once() {
        let a = KernelTable::shared() as *const KernelTable;
        let b = KernelTable::shared() as *const KernelTable;
        assert_eq!(a, b);
    }

    #[test]
    fn edge_lookups_are_in_domain() {
        let table = KernelTable::shared();
        let edge = (KERNEL_LEN - 1) as i64;
        assert_eq!(table.gk1(edge), -table.gk1(-edge));
        assert_eq!(table.gk2(edge), table.gk2(-edge));
    }

    #[test]
    #[should_panic(expected = "Invariant 1 failed")]
    fn out_of_domain_lookup_is_fatal() {
        KernelTable::shared().gk1(KERNEL_LEN as i64);
    }
}
