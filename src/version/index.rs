//! Chart repository index decoding and filtering

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::config::Chart;
use crate::version::error::FetchError;
use crate::version::semver::ChartVersion;

/// `index.yaml` as published by a Helm chart repository.
///
/// Only the fields the monitor needs are decoded; everything else in the
/// document (apiVersion, chart metadata, digests) is ignored.
#[derive(Debug, Default, Deserialize)]
struct RawIndex {
    #[serde(default)]
    entries: Option<HashMap<String, Vec<RawEntry>>>,
    #[serde(default)]
    generated: Option<String>,
}

/// Plain scalars are read as their source text, so `version: 1.10` stays
/// `"1.10"` instead of going through a float.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    version: Option<String>,
}

/// Watched charts of one fetched repository index and their parsed versions
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    /// Normalized index URL the document was fetched from
    pub repository: String,
    /// The index's `generated` timestamp, if present
    pub generated: Option<String>,
    /// Versions per watched chart, in configured order
    pub charts: IndexMap<String, Vec<ChartVersion>>,
}

impl IndexDocument {
    /// Decode a raw index and keep only the watched charts.
    ///
    /// Every watched chart gets an entry; charts absent from the index end
    /// up with no versions. Unparsable version strings are dropped.
    pub fn decode(repository: &str, body: &[u8], watched: &[Chart]) -> Result<Self, FetchError> {
        let raw: RawIndex = if body.iter().all(u8::is_ascii_whitespace) {
            RawIndex::default()
        } else {
            serde_yaml::from_slice(body)?
        };

        let mut entries = raw.entries.unwrap_or_default();
        let mut charts = IndexMap::with_capacity(watched.len());

        for chart in watched {
            if charts.contains_key(&chart.name) {
                continue;
            }

            let versions = entries
                .remove(&chart.name)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|entry| entry.version)
                .filter_map(|raw_version| match ChartVersion::parse(&raw_version) {
                    Ok(version) => Some(version),
                    Err(e) => {
                        debug!(
                            "Skipping unparsable version {:?} of {} in {}: {}",
                            raw_version, chart.name, repository, e
                        );
                        None
                    }
                })
                .collect::<Vec<_>>();

            charts.insert(chart.name.clone(), versions);
        }

        Ok(Self {
            repository: repository.to_string(),
            generated: raw.generated,
            charts,
        })
    }

    /// Versions found for a chart; empty when unwatched or absent
    pub fn versions(&self, chart: &str) -> &[ChartVersion] {
        self.charts
            .get(chart)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Highest version found for a chart
    pub fn highest(&self, chart: &str) -> Option<&ChartVersion> {
        self.versions(chart).iter().max()
    }
}
