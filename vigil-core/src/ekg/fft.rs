//! Fixed-size radix-2 FFT

use core::ops::{Add, Mul, Sub};

// Inherent f32 methods shadow these under std
#[allow(unused_imports)]
use micromath::F32Ext;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    pub re: f32,
    pub im: f32,
}

impl Complex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    pub const fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    pub fn norm_sqr(self) -> f32 {
        self.re * self.re + self.im * self.im
    }
}

impl Add for Complex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// In-place FFT of size `N` with a precomputed twiddle table
#[derive(Debug, Clone)]
pub struct Fft<const N: usize> {
    /// `exp(-2πik/N)`; only the first half is used
    twiddles: [Complex; N],
    bits: u32,
}

impl<const N: usize> Default for Fft<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Fft<N> {
    const POWER_OF_TWO: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "FFT size must be a power of two"
    );

    /// Build the twiddle table
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::POWER_OF_TWO;
        let mut twiddles = [Complex::ZERO; N];
        for (k, w) in twiddles.iter_mut().enumerate() {
            let angle = -2.0 * core::f32::consts::PI * k as f32 / N as f32;
            *w = Complex::new(angle.cos(), angle.sin());
        }
        Self {
            twiddles,
            bits: N.trailing_zeros(),
        }
    }

    pub fn transform(&self, x: &mut [Complex; N]) {
        for i in 0..N {
            let j = i.reverse_bits() >> (usize::BITS - self.bits);
            if i < j {
                x.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= N {
            let half = len / 2;
            let stride = N / len;
            for start in (0..N).step_by(len) {
                for k in 0..half {
                    let w = self.twiddles[k * stride];
                    let a = x[start + k];
                    let b = x[start + k + half] * w;
                    x[start + k] = a + b;
                    x[start + k + half] = a - b;
                }
            }
            len <<= 1;
        }
    }
}
