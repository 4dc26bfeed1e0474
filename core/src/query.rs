//! Rendering of monitoring queries into Splunk search language.
//!
//! Rendering is pure: the same [`MonitoringQuery`] and [`QueryBuilder`] always
//! produce the same [`RenderedQuery`]. No network or shared state is touched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// Time window applied when a query does not name an earliest time.
pub const DEFAULT_EARLIEST_TIME: &str = "-10m";

/// Search used by the health probe.
pub const HEALTH_PROBE_SEARCH: &str = "search index=_audit | head 1";

/// Time window of the health probe.
pub const HEALTH_PROBE_EARLIEST_TIME: &str = "-10s";

/// Fields projected from every publish log line.
const EVENT_FIELDS: &str =
    "content_type, event, isValid, level, service_name, @time, transaction_id, uuid";

/// Trailing region suffix of a cluster name, e.g. `-delivery-eu` or `-us`.
#[allow(clippy::expect_used)] // Hardcoded pattern always compiles
static REGION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:-(?:delivery|publishing))?-(?:eu|us)$")
        .expect("region suffix pattern should always compile")
});

/// A structured request for publish events.
///
/// # Example
///
/// ```
/// use event_reader_core::query::MonitoringQuery;
///
/// let query = MonitoringQuery::new("annotations")
///     .with_earliest_time("-15m")
///     .with_uuids(["27355ee6-e280-4fb8-b825-8f14be1be9d3"]);
/// assert_eq!(query.earliest_time(), Some("-15m"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringQuery {
    content_type: String,
    earliest_time: Option<String>,
    latest_time: Option<String>,
    uuids: BTreeSet<String>,
}

impl MonitoringQuery {
    /// Create a query for the given content type (empty matches all).
    #[must_use]
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    /// Set the relative earliest time, e.g. `-15m`.
    #[must_use]
    pub fn with_earliest_time(mut self, earliest: impl Into<String>) -> Self {
        self.earliest_time = Some(earliest.into());
        self
    }

    /// Set the relative latest time, e.g. `-5m`.
    #[must_use]
    pub fn with_latest_time(mut self, latest: impl Into<String>) -> Self {
        self.latest_time = Some(latest.into());
        self
    }

    /// Restrict the search to the given content uuids.
    #[must_use]
    pub fn with_uuids<I, S>(mut self, uuids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uuids.extend(uuids.into_iter().map(Into::into));
        self
    }

    /// Content type filter.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Requested earliest time, if any.
    #[must_use]
    pub fn earliest_time(&self) -> Option<&str> {
        self.earliest_time.as_deref()
    }

    /// Requested latest time, if any.
    #[must_use]
    pub fn latest_time(&self) -> Option<&str> {
        self.latest_time.as_deref()
    }

    /// Uuid filter in rendering order.
    #[must_use]
    pub const fn uuids(&self) -> &BTreeSet<String> {
        &self.uuids
    }
}

/// A search string plus the time range it runs over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedQuery {
    /// Search in Splunk processing language
    pub search: String,
    /// Relative earliest time
    pub earliest_time: String,
    /// Relative latest time, omitted when open-ended
    pub latest_time: Option<String>,
}

impl RenderedQuery {
    /// Form fields for a search job creation request, in a stable order.
    #[must_use]
    pub fn form_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![
            ("search", self.search.as_str()),
            ("earliest_time", self.earliest_time.as_str()),
        ];
        if let Some(latest) = &self.latest_time {
            params.push(("latest_time", latest.as_str()));
        }
        params
    }
}

/// Index and source filters every publish search is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
    /// Splunk index holding the publish logs
    pub index: String,
    /// Log source
    pub source: String,
    /// Log sourcetype
    pub sourcetype: String,
}

impl Default for SearchScope {
    fn default() -> Self {
        Self {
            index: "heroku".to_string(),
            source: "http:upp".to_string(),
            sourcetype: "heroku:drain".to_string(),
        }
    }
}

/// Renders [`MonitoringQuery`] values for one cluster environment.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    environment: String,
    scope: SearchScope,
}

impl QueryBuilder {
    /// Create a builder for the given environment using the default scope.
    #[must_use]
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            scope: SearchScope::default(),
        }
    }

    /// Override the index/source scope.
    #[must_use]
    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Environment this builder renders for.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Render the search for in-flight transactions.
    #[must_use]
    pub fn transactions(&self, query: &MonitoringQuery) -> RenderedQuery {
        let mut search = self.scoped_search();

        if !query.content_type.is_empty() {
            let _ = write!(
                search,
                r#" (content_type="{}" OR content_type="")"#,
                query.content_type
            );
        }
        search.push_str(r#" transaction_id!="SYNTHETIC*" transaction_id!="*carousel*""#);

        if !query.uuids.is_empty() {
            let ids = query
                .uuids
                .iter()
                .map(|id| format!(r#""{id}""#))
                .collect::<Vec<_>>()
                .join(",");
            let _ = write!(search, " uuid IN ({ids})");
        }

        let _ = write!(search, " | fields {EVENT_FIELDS}");

        Self::with_time_range(search, query)
    }

    /// Render the search for the most recent completed publish.
    #[must_use]
    pub fn last_event(&self, query: &MonitoringQuery) -> RenderedQuery {
        let mut search = self.scoped_search();

        if !query.content_type.is_empty() {
            let _ = write!(search, r#" content_type="{}""#, query.content_type);
        }
        let _ = write!(
            search,
            r#" event="PublishEnd" | fields {EVENT_FIELDS} | head 1"#
        );

        Self::with_time_range(search, query)
    }

    /// Render the minimal search used to probe backend health.
    #[must_use]
    pub fn health_probe(&self) -> RenderedQuery {
        RenderedQuery {
            search: HEALTH_PROBE_SEARCH.to_string(),
            earliest_time: HEALTH_PROBE_EARLIEST_TIME.to_string(),
            latest_time: None,
        }
    }

    fn scoped_search(&self) -> String {
        format!(
            r#"search index="{}" source="{}" sourcetype="{}" monitoring_event=true (environment="{}" OR environment="pub-{}")"#,
            self.scope.index,
            self.scope.source,
            self.scope.sourcetype,
            self.environment,
            environment_pattern(&self.environment),
        )
    }

    fn with_time_range(search: String, query: &MonitoringQuery) -> RenderedQuery {
        RenderedQuery {
            search,
            earliest_time: query
                .earliest_time
                .clone()
                .unwrap_or_else(|| DEFAULT_EARLIEST_TIME.to_string()),
            latest_time: query.latest_time.clone(),
        }
    }
}

/// Wildcard pattern matching both primary and disaster-recovery names of a cluster.
///
/// `upp-staging-delivery-eu` becomes `upp-staging*`; names without a region
/// suffix are returned unchanged.
#[must_use]
pub fn environment_pattern(environment: &str) -> String {
    REGION_SUFFIX.replace(environment, "*").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn environment_pattern_strips_region_suffix() {
        assert_eq!(environment_pattern("upp-staging-delivery-eu"), "upp-staging*");
        assert_eq!(environment_pattern("upp-k8s-dev-delivery-us"), "upp-k8s-dev*");
        assert_eq!(environment_pattern("upp-prod-publishing-us"), "upp-prod*");
        assert_eq!(environment_pattern("xp"), "xp");
    }

    #[test]
    fn transactions_query_renders_filters() {
        let builder = QueryBuilder::new("xp");
        let rendered = builder.transactions(&MonitoringQuery::new("annotations"));

        assert!(rendered.search.starts_with(
            r#"search index="heroku" source="http:upp" sourcetype="heroku:drain" monitoring_event=true (environment="xp" OR environment="pub-xp")"#
        ));
        assert!(
            rendered
                .search
                .contains(r#"(content_type="annotations" OR content_type="")"#)
        );
        assert!(rendered.search.contains(r#"transaction_id!="SYNTHETIC*""#));
        assert!(!rendered.search.contains("uuid IN"));
        assert_eq!(rendered.earliest_time, DEFAULT_EARLIEST_TIME);
        assert_eq!(rendered.latest_time, None);
    }

    #[test]
    fn empty_content_type_matches_all() {
        let rendered = QueryBuilder::new("xp").transactions(&MonitoringQuery::new(""));
        assert!(!rendered.search.contains("content_type=\""));
    }

    #[test]
    fn uuid_clause_lists_every_id_before_projection() {
        let query = MonitoringQuery::new("annotations").with_uuids(["b", "a"]);
        let rendered = QueryBuilder::new("xp").transactions(&query);

        let clause = r#" uuid IN ("a","b") | fields "#;
        assert!(rendered.search.contains(clause), "{}", rendered.search);
    }

    #[test]
    fn time_range_is_passed_through() {
        let query = MonitoringQuery::new("annotations")
            .with_earliest_time("-15m")
            .with_latest_time("-5m");
        let rendered = QueryBuilder::new("xp").transactions(&query);

        assert_eq!(
            rendered.form_params(),
            vec![
                ("search", rendered.search.as_str()),
                ("earliest_time", "-15m"),
                ("latest_time", "-5m"),
            ]
        );
    }

    #[test]
    fn last_event_query_targets_completion_events() {
        let rendered = QueryBuilder::new("upp-staging-delivery-eu")
            .last_event(&MonitoringQuery::new("annotations").with_earliest_time("-5m"));

        assert!(rendered.search.contains(r#"environment="pub-upp-staging*""#));
        assert!(rendered.search.contains(r#"content_type="annotations" event="PublishEnd""#));
        assert!(rendered.search.ends_with("| head 1"));
        assert_eq!(rendered.earliest_time, "-5m");
    }

    #[test]
    fn health_probe_is_minimal() {
        let rendered = QueryBuilder::new("xp").health_probe();
        assert_eq!(rendered.search, HEALTH_PROBE_SEARCH);
        assert_eq!(rendered.earliest_time, "-10s");
    }

    proptest! {
        #[test]
        fn rendering_is_deterministic(
            content_type in "[a-z]{0,12}",
            env in "[a-z0-9-]{1,24}",
            uuids in proptest::collection::vec("[a-f0-9-]{8,36}", 0..5),
            earliest in proptest::option::of("-[0-9]{1,3}[msh]"),
        ) {
            let mut query = MonitoringQuery::new(content_type).with_uuids(uuids);
            if let Some(earliest) = earliest {
                query = query.with_earliest_time(earliest);
            }
            let builder = QueryBuilder::new(env);

            prop_assert_eq!(builder.transactions(&query), builder.transactions(&query.clone()));
            prop_assert_eq!(builder.last_event(&query), builder.last_event(&query.clone()));
        }
    }
}
