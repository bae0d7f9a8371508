//! # Address Limb Encoding
//!
//! Binds an account address into circuit inputs as a field-element
//! representation: the address value serialized as 32 little-endian bytes
//! and split into four u64 limbs. Addresses are 160 bits, comfortably below
//! the field modulus, so no reduction is ever needed.

use crate::tensor::TensorError;

/// Parse an account address (`0x`-prefixed hex, or plain decimal) into its
/// four little-endian u64 limbs.
///
/// # Errors
///
/// [`TensorError::InvalidAddress`] for empty input, non-hex/non-decimal
/// characters, or values wider than 256 bits.
pub fn address_limbs(address: &str) -> Result<[u64; 4], TensorError> {
    let bytes = address_le_bytes(address)?;
    let mut limbs = [0u64; 4];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let mut chunk = [0u8; 8];
        chunk.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
        *limb = u64::from_le_bytes(chunk);
    }
    Ok(limbs)
}

/// Reassemble the 32-byte little-endian representation from four limbs.
/// Inverse of [`address_limbs`].
pub fn limbs_to_le_bytes(limbs: &[u64; 4]) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    for (i, limb) in limbs.iter().enumerate() {
        bytes[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_le_bytes());
    }
    bytes
}

/// Parse an address string into 32 little-endian bytes.
fn address_le_bytes(address: &str) -> Result<[u8; 32], TensorError> {
    let trimmed = address.trim();
    let invalid = || TensorError::InvalidAddress(address.to_string());

    let mut out = [0u8; 32];
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if hex.is_empty() || hex.len() > 64 {
            return Err(invalid());
        }
        // Left-pad to an even number of digits, decode big-endian, then
        // reverse into little-endian order.
        let padded = if hex.len() % 2 == 1 {
            format!("0{hex}")
        } else {
            hex.to_string()
        };
        let n = padded.len() / 2;
        for i in 0..n {
            let byte = u8::from_str_radix(&padded[2 * i..2 * i + 2], 16).map_err(|_| invalid())?;
            // Big-endian digit i ends up at little-endian position n-1-i.
            out[n - 1 - i] = byte;
        }
        Ok(out)
    } else {
        let value: u128 = trimmed.parse().map_err(|_| invalid())?;
        out[..16].copy_from_slice(&value.to_le_bytes());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_hex_address_fills_first_limb() {
        let limbs = address_limbs("0xABC").unwrap();
        assert_eq!(limbs, [0xABC, 0, 0, 0]);
    }

    #[test]
    fn decimal_address_parses() {
        let limbs = address_limbs("2748").unwrap();
        assert_eq!(limbs, [2748, 0, 0, 0]);
    }

    #[test]
    fn full_width_address_spans_limbs() {
        // 160-bit address: the two top bytes land in limb 2.
        let limbs = address_limbs("0xffee000000000000000000000000000000000011").unwrap();
        assert_eq!(limbs[0], 0x11);
        assert_eq!(limbs[1], 0);
        assert_eq!(limbs[2], 0xffee_0000);
        assert_eq!(limbs[3], 0);
    }

    #[test]
    fn limbs_round_trip_through_bytes() {
        let limbs = address_limbs("0xdeadBEEF0123456789").unwrap();
        let bytes = limbs_to_le_bytes(&limbs);
        let mut reassembled = [0u64; 4];
        for i in 0..4 {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            reassembled[i] = u64::from_le_bytes(chunk);
        }
        assert_eq!(limbs, reassembled);
    }

    #[test]
    fn odd_digit_hex_is_accepted() {
        assert_eq!(address_limbs("0xf").unwrap(), [0xf, 0, 0, 0]);
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "0x", "0xzz", "12ab", "-5"] {
            assert!(address_limbs(bad).is_err(), "{bad:?} should be rejected");
        }
        let too_wide = format!("0x{}", "f".repeat(65));
        assert!(address_limbs(&too_wide).is_err());
    }
}
