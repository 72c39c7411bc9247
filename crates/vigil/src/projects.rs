use std::collections::BTreeMap;

use serde::Deserialize;
use toml::{Table, Value};
use tracing::debug;

/// Raw per-project configuration entry, as found in the project file.
///
/// Entries are decoded explicitly since older configuration files stored
/// arbitrary values under the project keys.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Option<Value>")]
pub enum ProjectBlob {
    /// Well-formed table with project settings.
    Nested(Table),

    /// Any value other than a table.
    Scalar(Value),

    /// Entry without a value.
    Absent,
}

impl From<Option<Value>> for ProjectBlob {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(Value::Table(table)) => Self::Nested(table),
            Some(value) => Self::Scalar(value),
            None => Self::Absent,
        }
    }
}

/// Settings of a single project to push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfiguration {
    /// Project slug, optionally in the `owner/slug` form.
    pub slug: String,

    /// Network identifiers monitored for this project.
    pub networks: Vec<String>,
}

impl ProjectConfiguration {
    /// Project configuration without any networks.
    fn empty(slug: &str) -> Self {
        Self {
            slug: slug.to_owned(),
            networks: Vec::new(),
        }
    }

    /// Networks used for a push: `cli_networks` first, followed by the configured ones.
    ///
    /// Duplicates are kept.
    pub fn effective_networks(&self, cli_networks: &[String]) -> Vec<String> {
        cli_networks
            .iter()
            .chain(&self.networks)
            .cloned()
            .collect()
    }

    /// Split the slug into the owning account and project name.
    ///
    /// Slugs without an `owner/` prefix belong to `default_account`.
    pub fn target<'a>(&'a self, default_account: &'a str) -> (&'a str, &'a str) {
        self.slug
            .split_once('/')
            .unwrap_or((default_account, self.slug.as_str()))
    }
}

/// Resolved project configurations, keyed by project slug.
pub type ProjectConfigurationMap = BTreeMap<String, ProjectConfiguration>;

/// Resolve project configurations from the persisted project entries.
///
/// Entries that aren't tables resolve to a project without networks, while
/// tables without a `networks` list are skipped. The legacy `project_slug`
/// is added as a project without networks, unless a project with the same
/// slug is resolved already.
pub fn resolve_projects(
    projects: Option<&BTreeMap<String, ProjectBlob>>,
    legacy_slug: Option<&str>,
) -> ProjectConfigurationMap {
    let Some(projects) = projects else {
        return ProjectConfigurationMap::new();
    };

    let mut resolved: ProjectConfigurationMap = projects
        .iter()
        .filter_map(|(slug, blob)| Some((slug.clone(), resolve_project(slug, blob)?)))
        .collect();

    if let Some(slug) = legacy_slug.filter(|slug| !slug.is_empty()) {
        resolved
            .entry(slug.to_owned())
            .or_insert_with(|| ProjectConfiguration::empty(slug));
    }

    resolved
}

/// Decode a single project entry.
///
/// Returns [`None`] for a table without a `networks` list.
fn resolve_project(slug: &str, blob: &ProjectBlob) -> Option<ProjectConfiguration> {
    let ProjectBlob::Nested(table) = blob else {
        debug!(project = slug, "no configuration provided for project");
        return Some(ProjectConfiguration::empty(slug));
    };

    let Some(Value::Array(networks)) = table.get("networks") else {
        debug!(project = slug, "unable to extract networks for project, skipping");
        return None;
    };

    Some(ProjectConfiguration {
        slug: slug.to_owned(),
        networks: networks.iter().filter_map(network_id).collect(),
    })
}

/// Canonical network identifier of a configured value.
fn network_id(value: &Value) -> Option<String> {
    match value {
        Value::Integer(id) => Some(id.to_string()),
        Value::String(id) => Some(id.clone()),
        _ => None,
    }
}

/// Parse a comma-separated network list, as passed on the command line.
pub fn parse_networks(networks: Option<&str>) -> Vec<String> {
    networks
        .into_iter()
        .flat_map(|networks| networks.split(','))
        .map(str::trim)
        .filter(|network| !network.is_empty())
        .map(String::from)
        .collect()
}
