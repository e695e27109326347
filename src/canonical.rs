//! Byte-stable hashing of policies, inputs and final sets.
//!
//! `params_hash`, `input_hash` and the output fingerprint all go through
//! [`canonical_hash_hex`]. Hashed values are built from integers and strings
//! only: coordinates pass through [`quantize_point`] first and maps must be
//! `BTreeMap`, so two runs over the same layer hash the same on any platform.

use geo::Point;
use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Fixed-point scale for coordinates and policy parameters (micro-units).
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Round a ground-unit value to micro-units.
pub fn quantize(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Quantized `(x, y)` of a location.
pub fn quantize_point(point: &Point<f64>) -> (i64, i64) {
    (quantize(point.x()), quantize(point.y()))
}

/// JSON bytes of a hashed value or manifest.
///
/// Only called on crate types whose `Serialize` impls cannot fail (no maps
/// with non-string keys, no custom serializers).
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical value failed to serialize")
}

/// xxh64 (seed 0) of the canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// [`canonical_hash`] as 16 lowercase hex digits.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_layer_same_hash() {
        let layer = vec![
            ("school", quantize_point(&Point::new(12.5, -3.25))),
            ("bank", quantize_point(&Point::new(0.0, 7.0))),
        ];
        assert_eq!(canonical_hash(&layer), canonical_hash(&layer.clone()));

        let mut moved = layer.clone();
        moved[1].1 = quantize_point(&Point::new(0.0, 7.000_01));
        assert_ne!(canonical_hash(&layer), canonical_hash(&moved));
    }

    #[test]
    fn test_quantize_absorbs_float_noise() {
        assert_eq!(quantize(0.1 + 0.2), quantize(0.3));
        assert_eq!(quantize(-0.0), quantize(0.0));
        assert_ne!(quantize(1.0), quantize(1.00001));
    }

    #[test]
    fn test_quantize_point_matches_components() {
        let p = Point::new(1.5, -2.000_000_4);
        assert_eq!(quantize_point(&p), (1_500_000, -2_000_000));
    }

    #[test]
    fn test_hex_width() {
        assert_eq!(canonical_hash_hex(&42u32).len(), 16);
    }
}
