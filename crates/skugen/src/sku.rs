//! Fixed-width display codes.
//!
//! A code is four symbols drawn from a 32-symbol alphabet made of the digits
//! and the uppercase letters, minus the glyphs that are easily confused when
//! handwritten or read aloud (B/8, I/1, O/0, S/5).

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordered code alphabet. Index is the digit value.
pub const ALPHABET: &[u8; 32] = b"0123456789ACDEFGHJKLMNPQRTUVWXYZ";

/// Number of symbols in [`ALPHABET`].
pub const BASE: i64 = ALPHABET.len() as i64;

/// Number of symbols in every code.
pub const WIDTH: usize = 4;

/// Size of the code space: values `0..MAX_COUNT` are encodable.
pub const MAX_COUNT: i64 = BASE.pow(WIDTH as u32);

/// Seed for a fresh cursor: the first code past `9999` that has to contain a
/// letter, `"999A"`.
pub const INITIAL_CURSOR: i64 = 304_426;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("counter value {0} is out of range for the 4-character code space")]
    OutOfRange(i64),

    #[error("invalid code {0:?}: expected 4 symbols from 0-9 and A-Z without B, I, O, S")]
    InvalidCode(String),
}

/// A 4-symbol code. Always valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sku([u8; WIDTH]);

impl Sku {
    pub fn as_str(&self) -> &str {
        // Every byte comes from ALPHABET, which is ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Counter value this code was encoded from.
    pub fn value(&self) -> i64 {
        self.0
            .iter()
            .fold(0, |acc, &b| acc * BASE + symbol_index(b).unwrap_or(0))
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sku {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for Sku {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; WIDTH] = s
            .as_bytes()
            .try_into()
            .map_err(|_| CodeError::InvalidCode(s.to_string()))?;
        if bytes.iter().all(|&b| symbol_index(b).is_some()) {
            Ok(Sku(bytes))
        } else {
            Err(CodeError::InvalidCode(s.to_string()))
        }
    }
}

fn symbol_index(symbol: u8) -> Option<i64> {
    ALPHABET
        .iter()
        .position(|&s| s == symbol)
        .map(|i| i as i64)
}

/// Encode a counter value as a code.
///
/// The digit loop always runs [`WIDTH`] times, so small values are left-padded
/// with `'0'`, the zero symbol.
pub fn encode(n: i64) -> Result<Sku, CodeError> {
    if !(0..MAX_COUNT).contains(&n) {
        return Err(CodeError::OutOfRange(n));
    }
    let mut rest = n;
    let mut out = [ALPHABET[0]; WIDTH];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(rest % BASE) as usize];
        rest /= BASE;
    }
    Ok(Sku(out))
}

/// Inverse of [`encode`].
pub fn decode(code: &str) -> Result<i64, CodeError> {
    code.parse::<Sku>().map(|sku| sku.value())
}
