//! Barcode value generation and CODE128 encoding.
//!
//! Uses the barcoders crate for Code 128 encoding.

use barcoders::sym::code128::Code128;
use log::warn;
use rand::Rng;

/// Generate a pseudo-random numeric barcode value.
///
/// One digit per 10 units of the section's configured length, minimum one
/// digit. The result is stored on the section so re-renders are stable.
pub fn generate_value(length: u32, rng: &mut impl Rng) -> String {
    let digits = (length / 10).max(1) as usize;
    (0..digits)
        .map(|_| char::from_digit(rng.random_range(0..10u32), 10).unwrap_or('0'))
        .collect()
}

/// Encode data as Code 128 barcode bars.
/// Returns a Vec<bool> where true = bar (black), false = space (white).
///
/// An unencodable value logs and yields an empty run; the caller skips the
/// section rather than failing the render.
pub fn encode_code128(data: &str) -> Vec<bool> {
    // Code128 requires a character set prefix. Set B covers the widest range
    // of printable characters.
    let prefixed = format!("\u{0181}{}", data);

    let barcode = match Code128::new(&prefixed) {
        Ok(b) => b,
        Err(e) => {
            warn!("barcode value {:?} not encodable: {}", data, e);
            return Vec::new();
        }
    };

    let encoded = barcode.encode();

    // Scale up the bars for visibility (each module = 2 pixels)
    let scale = 2;
    let mut bars = Vec::with_capacity(encoded.len() * scale);
    for &module in &encoded {
        let is_bar = module == 1;
        for _ in 0..scale {
            bars.push(is_bar);
        }
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generate_value_length() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(generate_value(50, &mut rng).len(), 5);
        assert_eq!(generate_value(9, &mut rng).len(), 1);
        assert_eq!(generate_value(0, &mut rng).len(), 1);
        assert!(generate_value(100, &mut rng).chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_code128_encoding() {
        let bars = encode_code128("458721");
        assert!(!bars.is_empty());
        assert!(bars.iter().any(|&b| b));
    }

    #[test]
    fn test_code128_rejects_unencodable() {
        // Control characters are outside set B.
        let bars = encode_code128("\u{0007}");
        assert!(bars.is_empty());
    }
}
