//! Arbitrary-precision token amounts.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;

/// A non-negative token quantity. Serialized as a decimal string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(BigUint);

impl TokenAmount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn from_atto(atto: u64) -> Self {
        Self(BigUint::from(atto))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_sub(&self, other: &TokenAmount) -> Option<TokenAmount> {
        if self.0 < other.0 {
            None
        } else {
            Some(Self(&self.0 - &other.0))
        }
    }

    pub fn saturating_sub(&self, other: &TokenAmount) -> TokenAmount {
        self.checked_sub(other).unwrap_or_default()
    }

    /// Lossy view for logging and small test balances.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    /// Big-endian magnitude bytes, used for canonical hashing.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

impl From<u64> for TokenAmount {
    fn from(v: u64) -> Self {
        Self::from_atto(v)
    }
}

impl Add for TokenAmount {
    type Output = TokenAmount;
    fn add(self, rhs: TokenAmount) -> TokenAmount {
        TokenAmount(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a TokenAmount> for &'a TokenAmount {
    type Output = TokenAmount;
    fn add(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 + &rhs.0)
    }
}

impl AddAssign<&TokenAmount> for TokenAmount {
    fn add_assign(&mut self, rhs: &TokenAmount) {
        self.0 += &rhs.0;
    }
}

impl Mul<u64> for &TokenAmount {
    type Output = TokenAmount;
    fn mul(self, rhs: u64) -> TokenAmount {
        TokenAmount(&self.0 * rhs)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        BigUint::from_str(s)
            .map(TokenAmount)
            .map_err(|e| anyhow::anyhow!("invalid token amount '{}': {}", s, e))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = TokenAmount::from(10_000_000);
        let b = TokenAmount::from(50);
        assert_eq!(a.checked_sub(&b), Some(TokenAmount::from(9_999_950)));
        assert_eq!(b.checked_sub(&a), None);
        assert_eq!(b.saturating_sub(&a), TokenAmount::zero());
        assert_eq!(&b * 3, TokenAmount::from(150));
        assert_eq!(&a + &b, TokenAmount::from(10_000_050));
    }

    #[test]
    fn test_beyond_u64() {
        let big: TokenAmount = "340282366920938463463374607431768211456".parse().unwrap();
        assert_eq!(big.to_u64(), None);
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, "\"340282366920938463463374607431768211456\"");
    }

    #[test]
    fn test_rejects_negative() {
        assert!("-5".parse::<TokenAmount>().is_err());
    }
}
