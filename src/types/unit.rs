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

use serde::Deserialize;
use serde::Serialize;

use crate::types::timestamp::Timestamp;
use crate::types::unit_id::UnitId;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    /// Never reviewed.
    New,
    /// Reviewed at least once.
    Reviewed,
}

/// A single sentence subject to spaced repetition.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyUnit {
    pub id: UnitId,
    /// The trimmed sentence, as it appeared in the source.
    pub text: String,
    pub created_at: Timestamp,
    /// Estimated difficulty in `[0, 5]`.
    pub difficulty: f64,
    pub review_count: usize,
    pub status: UnitStatus,
    /// The name of the source the unit was first seen in.
    #[serde(default)]
    pub source_name: Option<String>,
}
