use crate::model::{CanonicalMetric, ComponentType, ConfidenceLevel, InstrumentType, SemconvMatch, SourceCategory};
use core::time::Duration;
use std::collections::BTreeMap;

/// Page size used when a query does not set one.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// A metric search.
///
/// `text` is matched as a case-sensitive substring of the metric name or description only. Every non-empty
/// set filter must contain the metric's value; filters are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub instrument_types: Vec<InstrumentType>,
    pub component_types: Vec<ComponentType>,
    pub component_names: Vec<String>,
    pub source_categories: Vec<SourceCategory>,
    pub source_names: Vec<String>,
    pub confidence_levels: Vec<ConfidenceLevel>,
    pub semconv_matches: Vec<SemconvMatch>,
    pub units: Vec<String>,

    /// Metrics carrying at least one of these attributes
    pub attribute_names: Vec<String>,

    /// Page size; `0` means [`DEFAULT_SEARCH_LIMIT`]
    pub limit: usize,
    pub offset: usize,
}

impl SearchQuery {
    /// A query for `text` with no filters.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn effective_limit(&self) -> usize {
        if self.limit == 0 { DEFAULT_SEARCH_LIMIT } else { self.limit }
    }

    /// Whether `metric` satisfies the text and every filter.
    #[must_use]
    pub fn matches(&self, metric: &CanonicalMetric) -> bool {
        fn admits<T: PartialEq>(filter: &[T], value: &T) -> bool {
            filter.is_empty() || filter.contains(value)
        }

        (self.text.is_empty() || metric.metric_name.contains(&self.text) || metric.description.contains(&self.text))
            && admits(&self.instrument_types, &metric.instrument_type)
            && admits(&self.component_types, &metric.component_type)
            && admits(&self.component_names, &metric.component_name)
            && admits(&self.source_categories, &metric.source_category)
            && admits(&self.source_names, &metric.source_name)
            && admits(&self.confidence_levels, &metric.source_confidence)
            && admits(&self.semconv_matches, &metric.semconv_match)
            && admits(&self.units, &metric.unit)
            && (self.attribute_names.is_empty()
                || metric.attributes.iter().any(|a| self.attribute_names.contains(&a.name)))
    }

    /// Order matches: with text, name matches first and description-only matches after; alphabetical by
    /// metric name within each group. Identity breaks remaining ties so paging is stable.
    pub fn sort(&self, metrics: &mut [CanonicalMetric]) {
        metrics.sort_by(|a, b| {
            let rank = |m: &CanonicalMetric| u8::from(!self.text.is_empty() && !m.metric_name.contains(&self.text));
            rank(a)
                .cmp(&rank(b))
                .then_with(|| a.metric_name.cmp(&b.metric_name))
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub metrics: Vec<CanonicalMetric>,

    /// Matches before paging
    pub total: usize,

    pub took: Duration,
}

/// Restricts facet counting to one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetQuery {
    pub source_name: Option<String>,
}

/// Per-field histograms over stored metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCounts {
    pub instrument_types: BTreeMap<InstrumentType, usize>,
    pub component_types: BTreeMap<ComponentType, usize>,
    pub component_names: BTreeMap<String, usize>,
    pub source_categories: BTreeMap<SourceCategory, usize>,
    pub source_names: BTreeMap<String, usize>,
    pub confidence_levels: BTreeMap<ConfidenceLevel, usize>,
    pub semconv_matches: BTreeMap<SemconvMatch, usize>,

    /// Units in use; the empty unit is not counted
    pub units: BTreeMap<String, usize>,
}

impl FacetCounts {
    /// Count `metrics`. `source_names` always covers `all`, regardless of the subset being counted.
    pub(crate) fn count<'a>(metrics: impl Iterator<Item = &'a CanonicalMetric>, all: impl Iterator<Item = &'a CanonicalMetric>) -> Self {
        let mut facets = Self::default();

        for m in metrics {
            *facets.instrument_types.entry(m.instrument_type).or_default() += 1;
            *facets.component_types.entry(m.component_type).or_default() += 1;
            *facets.component_names.entry(m.component_name.clone()).or_default() += 1;
            *facets.source_categories.entry(m.source_category).or_default() += 1;
            *facets.confidence_levels.entry(m.source_confidence).or_default() += 1;
            *facets.semconv_matches.entry(m.semconv_match).or_default() += 1;
            if !m.unit.is_empty() {
                *facets.units.entry(m.unit.clone()).or_default() += 1;
            }
        }

        for m in all {
            *facets.source_names.entry(m.source_name.clone()).or_default() += 1;
        }

        facets
    }
}
