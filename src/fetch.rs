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

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::FetchConfig;
use crate::error::ErrorReport;
use crate::error::Fallible;

/// Retrieves web pages for URL sources.
pub trait Fetcher {
    /// GET `url` and return the body as text. A non-success status is an
    /// error of kind [`Fetch`](crate::error::ErrorKind::Fetch).
    fn fetch(&self, url: &str) -> Fallible<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Fallible<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Fallible<String> {
        log::debug!("Fetching {url}");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ErrorReport::fetch(format!(
                "fetching {url} failed with status {status}."
            )));
        }
        Ok(response.text()?)
    }
}
