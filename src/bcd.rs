//! Packed-decimal (BCD) field decoding.
//!
//! Each byte holds two decimal digits, most significant nibble first.
//! Fields are addressed either by byte ([`bcd_to_int`]) or by nibble
//! ([`bcd_to_int2`]) when they do not start on a byte boundary.
//!
//! ```
//! use omron_hid::bcd::{bcd_to_int, bcd_to_int2};
//!
//! let data = [0x12, 0x34, 0x56];
//! assert_eq!(bcd_to_int(&data, 0, 4).unwrap(), 1234);
//! assert_eq!(bcd_to_int2(&data, 1, 3).unwrap(), 234);
//! ```

use crate::error::{OmronError, Result};

/// Largest digit count that fits in a `u32` without overflow.
pub const MAX_DIGITS: usize = 9;

/// Decode `num_digits` digits starting at byte `start_byte`.
pub fn bcd_to_int(data: &[u8], start_byte: usize, num_digits: usize) -> Result<u32> {
    bcd_to_int2(data, start_byte * 2, num_digits)
}

/// Decode `num_nibbles` digits starting at nibble `start_nibble`.
///
/// Nibble 0 is the high nibble of byte 0, nibble 1 its low nibble.
pub fn bcd_to_int2(data: &[u8], start_nibble: usize, num_nibbles: usize) -> Result<u32> {
    if num_nibbles > MAX_DIGITS {
        return Err(OmronError::BadData(format!(
            "BCD field of {} digits exceeds {}",
            num_nibbles, MAX_DIGITS
        )));
    }
    let end = start_nibble + num_nibbles;
    if end > data.len() * 2 {
        return Err(OmronError::BadData(format!(
            "BCD field ends at nibble {} but payload has {}",
            end,
            data.len() * 2
        )));
    }

    let mut value = 0u32;
    for pos in start_nibble..end {
        let byte = data[pos / 2];
        let digit = if pos % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if digit > 9 {
            return Err(OmronError::BadData(format!(
                "invalid BCD digit 0x{:x} at nibble {}",
                digit, pos
            )));
        }
        value = value * 10 + digit as u32;
    }
    Ok(value)
}

/// Encode `value` as `num_digits` packed digits, most significant first.
///
/// An odd digit count leaves the low nibble of the last byte zero.
/// Fails with `BadArgument` when `value` does not fit.
pub fn encode_bcd(value: u32, num_digits: usize) -> Result<Vec<u8>> {
    if num_digits > MAX_DIGITS || u64::from(value) >= 10u64.pow(num_digits as u32) {
        return Err(OmronError::BadArgument(format!(
            "{} does not fit in {} BCD digits",
            value, num_digits
        )));
    }

    let mut out = vec![0u8; (num_digits + 1) / 2];
    let mut rest = value;
    for pos in (0..num_digits).rev() {
        let digit = (rest % 10) as u8;
        rest /= 10;
        if pos % 2 == 0 {
            out[pos / 2] |= digit << 4;
        } else {
            out[pos / 2] |= digit;
        }
    }
    Ok(out)
}
