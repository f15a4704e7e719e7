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

use std::fmt::Display;
use std::fmt::Formatter;

use chrono::DateTime;
use chrono::Local;
use chrono::SecondsFormat;
use chrono::TimeDelta;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::date::Date;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A UTC instant. Serialized as RFC 3339 text so snapshots stay portable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(ts: DateTime<Utc>) -> Self {
        Self(ts)
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    pub fn local_date(self) -> Date {
        let ts = self.0.with_timezone(&Local);
        Date::new(ts.date_naive())
    }

    /// Add a possibly fractional number of days, saturating at the maximum
    /// representable instant.
    pub fn plus_days(self, days: f64) -> Self {
        let millis = (days * MILLIS_PER_DAY).round();
        let delta = if millis >= i64::MAX as f64 {
            None
        } else {
            TimeDelta::try_milliseconds(millis as i64)
        };
        match delta.and_then(|delta| self.into_inner().checked_add_signed(delta)) {
            Some(ts) => Self::new(ts),
            None => Self::new(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// The file-name-friendly form used for backup names. UTC, so names
    /// sort chronologically across offset changes.
    pub fn compact(self) -> String {
        self.0.format("%Y%m%d_%H%M%S").to_string()
    }

    pub fn to_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn parse(s: &str) -> Fallible<Self> {
        let ts = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ErrorReport::new(format!("invalid timestamp {s:?}: {e}")))?;
        Ok(Self(ts.with_timezone(&Utc)))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        Timestamp::parse(&string).map_err(|e| D::Error::custom(e.message().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_round_trip_keeps_subsecond_precision() -> Fallible<()> {
        let ts = Timestamp::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap()
                + TimeDelta::microseconds(123_456),
        );
        let json = serde_json::to_string(&ts)?;
        let back: Timestamp = serde_json::from_str(&json)?;
        assert_eq!(ts, back);
        Ok(())
    }

    #[test]
    fn test_plus_fractional_days() {
        let ts = Timestamp::new(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        let later = ts.plus_days(2.5);
        assert_eq!(
            later,
            Timestamp::new(Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_plus_days_saturates() {
        let ts = Timestamp::new(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        let later = ts.plus_days(1e300);
        assert_eq!(later.into_inner(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_compact_is_utc() {
        let ts = Timestamp::new(Utc.with_ymd_and_hms(2025, 11, 2, 1, 30, 5).unwrap());
        assert_eq!(ts.compact(), "20251102_013005");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
    }
}
