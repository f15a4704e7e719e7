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

use std::fs::write;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::error::Fallible;
use crate::session::Session;
use crate::types::response::Response;
use crate::types::timestamp::Timestamp;
use crate::types::unit::UnitStatus;
use crate::types::unit_id::UnitId;

pub fn export_session(data_dir: PathBuf, config: Config, output: Option<PathBuf>) -> Fallible<()> {
    let session = Session::open(data_dir, config)?;
    let export: Export = get_export(&session, Timestamp::now());
    let json: String = serde_json::to_string_pretty(&export)?;
    match output {
        Some(path) => {
            write(&path, json)?;
            println!("Exported {} units to {}.", export.units.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    metadata: MetadataExport,
    units: Vec<UnitExport>,
    review_history: Vec<ReviewExport>,
    stats: StatsExport,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetadataExport {
    export_date: Timestamp,
    total_units: usize,
    total_reviews: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnitExport {
    id: UnitId,
    text: String,
    created: Timestamp,
    difficulty: f64,
    reviews: usize,
    status: UnitStatus,
    source: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewExport {
    unit_text: String,
    response: Response,
    timestamp: Timestamp,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsExport {
    streak: usize,
    total_study_days: usize,
    total_reviews: usize,
}

pub fn get_export(session: &Session, now: Timestamp) -> Export {
    let units: Vec<UnitExport> = session
        .store
        .units()
        .iter()
        .map(|unit| UnitExport {
            id: unit.id,
            text: unit.text.clone(),
            created: unit.created_at,
            difficulty: unit.difficulty,
            reviews: unit.review_count,
            status: unit.status,
            source: unit.source_name.clone(),
        })
        .collect();
    let review_history: Vec<ReviewExport> = session
        .scheduler
        .history()
        .iter()
        .map(|event| ReviewExport {
            unit_text: session
                .store
                .get(event.unit_id)
                .map(|unit| unit.text.clone())
                .unwrap_or_default(),
            response: event.response,
            timestamp: event.timestamp,
        })
        .collect();
    let activity = session.activity.stats(now);
    Export {
        metadata: MetadataExport {
            export_date: now,
            total_units: units.len(),
            total_reviews: review_history.len(),
        },
        units,
        review_history,
        stats: StatsExport {
            streak: activity.current_streak,
            total_study_days: activity.total_days,
            total_reviews: activity.total_reviews,
        },
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::helper::StubFetcher;
    use crate::types::source::SourceContent;

    #[test]
    fn test_export_shape() -> Fallible<()> {
        let dir = tempdir()?;
        let now = Timestamp::now();
        let mut session = Session::open(dir.path().to_path_buf(), Config::default())?;
        let content = SourceContent::Text {
            text: Some("猫が好きです。犬も好きです。".to_string()),
        };
        let id = session.add_source(content, "pets", now)?;
        session.process(id, None, &StubFetcher::failing(), now)?;
        let unit_id = session.store.units()[0].id;
        session.review(unit_id, Response::Hard, now)?;

        let value = serde_json::to_value(get_export(&session, now))?;
        assert_eq!(value["metadata"]["totalUnits"], 2);
        assert_eq!(value["metadata"]["totalReviews"], 1);
        assert_eq!(value["units"][0]["text"], "猫が好きです。");
        assert_eq!(value["units"][0]["reviews"], 1);
        assert_eq!(value["units"][0]["status"], "reviewed");
        assert_eq!(value["units"][1]["source"], "pets");
        assert_eq!(value["reviewHistory"][0]["unitText"], "猫が好きです。");
        assert_eq!(value["reviewHistory"][0]["response"], "hard");
        assert_eq!(value["stats"]["streak"], 1);
        assert_eq!(value["stats"]["totalStudyDays"], 1);
        Ok(())
    }

    #[test]
    fn test_export_to_file() -> Fallible<()> {
        let dir = tempdir()?;
        let output = dir.path().join("export.json");
        export_session(dir.path().join("data"), Config::default(), Some(output.clone()))?;
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(output)?)?;
        assert_eq!(value["metadata"]["totalUnits"], 0);
        Ok(())
    }
}
