use super::*;

#[test]
fn seeded_hash_is_stable_across_chunking() {
    let mut a = StableHasher::new();
    a.write_bytes(b"parallax");
    let mut b = StableHasher::new();
    b.write_bytes(b"para");
    b.write_bytes(b"llax");
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn remainder_is_centered_on_zero() {
    assert!((ieee_remainder(5.0, 4.0) - 1.0).abs() < 1e-12);
    assert!((ieee_remainder(7.0, 4.0) + 1.0).abs() < 1e-12);
    assert!((ieee_remainder(-1.0, 4.0) + 1.0).abs() < 1e-12);
    // Halfway cases round the quotient to even.
    assert!((ieee_remainder(2.0, 4.0) - 2.0).abs() < 1e-12);
    assert!((ieee_remainder(6.0, 4.0) + 2.0).abs() < 1e-12);
}

#[test]
fn unorm8_conversions_round_trip_every_level() {
    for v in 0..=255u8 {
        assert_eq!(f32_to_unorm8(unorm8_to_f32(v)), v);
    }
    assert_eq!(f32_to_unorm8(-1.0), 0);
    assert_eq!(f32_to_unorm8(2.0), 255);
    assert_eq!(f32_to_unorm8(f32::NAN), 0);
}

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255(255, 255), 255);
    assert_eq!(mul_div255(255, 0), 0);
    assert_eq!(mul_div255(128, 255), 128);
    assert_eq!(mul_div255(100, 128), 50);
}

#[test]
fn gaussian_weights_decay_from_center() {
    let w = gaussian_weights(3, 1.5);
    assert_eq!(w.len(), 4);
    assert_eq!(w[0], 1.0);
    assert!(w.windows(2).all(|p| p[1] < p[0]));
}
