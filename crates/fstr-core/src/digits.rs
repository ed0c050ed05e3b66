#![forbid(unsafe_code)]

//! Allocation-free integer to text conversion.
//!
//! Digits are written right-to-left into a fixed stack buffer and the used
//! tail is handed back as a `&str`, so callers can copy straight into their
//! output without an intermediate `String`.

/// Longest decimal rendering of any 64-bit integer: `-9223372036854775808`
/// and `18446744073709551615` both take 20 bytes.
pub const MAX_DIGITS: usize = 20;

const DIGITS: &[u8; 10] = b"0123456789";

/// Stack scratch space for one formatted integer.
#[derive(Debug, Clone, Copy)]
pub struct DigitBuffer {
    bytes: [u8; MAX_DIGITS],
}

impl Default for DigitBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_DIGITS],
        }
    }

    /// Format an unsigned value, returning the written digits.
    pub fn format_u64(&mut self, mut value: u64) -> &str {
        let mut pos = MAX_DIGITS;
        loop {
            pos -= 1;
            self.bytes[pos] = DIGITS[(value % 10) as usize];
            value /= 10;
            if value == 0 {
                break;
            }
        }
        self.tail(pos)
    }

    /// Format a signed value, including a leading `-` for negatives.
    ///
    /// `i64::MIN` is handled through `unsigned_abs`, so no overflow occurs.
    pub fn format_i64(&mut self, value: i64) -> &str {
        if value >= 0 {
            return self.format_u64(value as u64);
        }
        let digits = self.format_u64(value.unsigned_abs()).len();
        let pos = MAX_DIGITS - digits - 1;
        self.bytes[pos] = b'-';
        self.tail(pos)
    }

    fn tail(&self, pos: usize) -> &str {
        // Only ASCII digits and '-' are ever written.
        std::str::from_utf8(&self.bytes[pos..]).unwrap_or_default()
    }
}

/// Number of decimal digits needed for `value`.
#[must_use]
pub fn decimal_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 10 {
        value /= 10;
        len += 1;
    }
    len
}

/// Returns the value as an `i64` when it is integral and exactly
/// representable, which lets float rendering reuse the integer path.
#[must_use]
pub fn integral_value(value: f64) -> Option<i64> {
    // 2^63 as f64; anything at or beyond it cannot round-trip through i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.is_finite() && value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value) {
        Some(value as i64)
    } else {
        None
    }
}

/// Value of one ASCII hex digit.
#[must_use]
pub fn hex_value(ch: char) -> Option<u32> {
    ch.to_digit(16)
}
