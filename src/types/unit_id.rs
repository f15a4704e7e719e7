// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;
use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error;

use crate::error::ErrorReport;
use crate::error::Fallible;

/// Identifies a study unit. It is the hash of the unit's normalized text, so
/// it is stable across sessions and unique as long as the store has no two
/// normalization-equal units.
///
/// Wraps blake3 because blake3 does not implement Ord and PartialOrd.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct UnitId {
    inner: blake3::Hash,
}

impl UnitId {
    pub fn for_normalized_text(normalized: &str) -> Self {
        Self {
            inner: blake3::hash(normalized.as_bytes()),
        }
    }

    pub fn to_hex(self) -> String {
        self.inner.to_hex().to_string()
    }

    pub fn from_hex(s: &str) -> Fallible<Self> {
        let inner = blake3::Hash::from_hex(s)
            .map_err(|_| ErrorReport::validation(format!("invalid unit id: {s}")))?;
        Ok(Self { inner })
    }

    /// The first eight hex digits, for listings.
    pub fn short(self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl PartialOrd for UnitId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UnitId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.as_bytes().cmp(other.inner.as_bytes())
    }
}

impl Display for UnitId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for UnitId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for UnitId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        UnitId::from_hex(&string).map_err(|e| D::Error::custom(e.message().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let id = UnitId::for_normalized_text("test");
        assert_eq!(
            id.to_string(),
            "4878ca0425c739fa427f7eda20fe845f6b2e46ba5fe2a14df5b1e32f50603215"
        );
        assert_eq!(id.short(), "4878ca04");
    }

    #[test]
    fn test_hex_round_trip() -> Fallible<()> {
        let id = UnitId::for_normalized_text("猫が好きです。");
        assert_eq!(UnitId::from_hex(&id.to_hex())?, id);
        Ok(())
    }

    #[test]
    fn test_ordering() -> Fallible<()> {
        let a =
            UnitId::from_hex("0000000000000000000000000000000000000000000000000000000000000000")?;
        let b =
            UnitId::from_hex("0000000000000000000000000000000000000000000000000000000000000001")?;
        let c =
            UnitId::from_hex("0000000000000000000000000000000000000000000000000000000000000002")?;
        assert!(a < b);
        assert!(b < c);
        Ok(())
    }

    #[test]
    fn test_invalid_hex() {
        assert!(UnitId::from_hex("xyz").is_err());
    }
}
