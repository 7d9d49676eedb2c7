use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5f3c_a2d1_9e47_b806;

/// Stable 128-bit content fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// High 64 bits of the digest.
    pub hi: u64,
    /// Low 64 bits of the digest.
    pub lo: u64,
}

pub(crate) struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    pub(crate) fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    pub(crate) fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

/// IEEE 754 remainder: `x - y * n` where `n` is `x / y` rounded to the nearest integer, ties to
/// even. The result lies in `[-y/2, y/2]`.
pub(crate) fn ieee_remainder(x: f64, y: f64) -> f64 {
    x - y * (x / y).round_ties_even()
}

pub(crate) fn unorm8_to_f32(v: u8) -> f32 {
    f32::from(v) / 255.0
}

pub(crate) fn f32_to_unorm8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// One-sided gaussian weights `w[k] = exp(-k² / 2σ²)` for `k in 0..=radius`. Not normalized.
pub(crate) fn gaussian_weights(radius: u32, sigma: f32) -> Vec<f32> {
    let denom = 2.0 * sigma * sigma;
    (0..=radius)
        .map(|k| {
            let x = k as f32;
            (-x * x / denom).exp()
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
