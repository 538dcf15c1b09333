use std::collections::BTreeSet;

use crate::config::AggregatorConfig;
use crate::validate::Measurement;

/// The valid measurements of one `ingest` call plus the label bookkeeping
/// every graph family needs.
///
/// Controllers are built from every valid member sample, so a filter that
/// keeps a controller but none of its members still yields the controller.
pub(crate) struct Run<'a> {
    pub config: &'a AggregatorConfig,
    /// Measurements whose own label passes the filter. Run-level graphs see
    /// only these.
    pub measurements: Vec<Measurement<'a>>,
    /// Measurements filtered out by label that still feed an emitted controller.
    hidden: Vec<Measurement<'a>>,
    /// Request labels that pass the filter.
    requests: BTreeSet<&'a str>,
    /// Controllers that pass the filter and have at least one valid member sample.
    controllers: BTreeSet<&'a str>,
}

impl<'a> Run<'a> {
    pub(crate) fn new(
        config: &'a AggregatorConfig,
        measurements: Vec<Measurement<'a>>,
        mut hidden: Vec<Measurement<'a>>,
    ) -> Self {
        let controllers: BTreeSet<&'a str> = config
            .controllers
            .controllers
            .iter()
            .filter(|(name, members)| {
                config.filter.matches(name)
                    && measurements.iter().chain(&hidden).any(|m| members.contains(m.label))
            })
            .map(|(name, _)| name.as_str())
            .collect();
        hidden.retain(|m| {
            config.controllers.controllers_of(m.label).any(|c| controllers.contains(c))
        });
        let requests = measurements.iter().map(|m| m.label).collect();
        Self { config, measurements, hidden, requests, controllers }
    }

    /// Every label that ends up with rows: request labels and emitted controllers.
    pub(crate) fn labels(&self) -> BTreeSet<&'a str> {
        self.requests.union(&self.controllers).copied().collect()
    }

    pub(crate) fn is_controller(&self, label: &str) -> bool {
        self.controllers.contains(label)
    }

    /// Every measurement that feeds at least one label row: shown ones first,
    /// then hidden controller members. Pair with [`Run::targets`].
    pub(crate) fn all(&self) -> impl Iterator<Item = &Measurement<'a>> {
        self.measurements.iter().chain(&self.hidden)
    }

    /// Labels a measurement contributes to: its own when it passes the
    /// filter, then each emitted controller it is a member of.
    pub(crate) fn targets(&self, m: &Measurement<'a>) -> Vec<&'a str> {
        let mut targets = Vec::new();
        if self.requests.contains(m.label) {
            targets.push(m.label);
        }
        targets.extend(
            self.config.controllers.controllers_of(m.label).filter(|c| self.controllers.contains(c)),
        );
        targets
    }

    /// Start of the bucket holding `timestamp`.
    pub(crate) fn bucket(&self, timestamp: i64) -> i64 {
        bucket_of(timestamp, self.config.granularity_ms)
    }

    pub(crate) fn granularity_secs(&self) -> f64 {
        self.config.granularity_secs()
    }

    /// Classifier for label-keyed series.
    pub(crate) fn per_label(&self) -> impl Fn(&str) -> (bool, bool) + '_ {
        move |label| (self.is_controller(label), false)
    }
}

/// `floor(timestamp / granularity) * granularity`, flooring toward negative
/// infinity so pre-epoch timestamps land in the right bucket.
///
/// Widths above `i64::MAX` are clamped to it and zero is treated as one.
/// Buckets that would start before `i64::MIN` start at `i64::MIN`.
pub fn bucket_of(timestamp: i64, granularity_ms: u64) -> i64 {
    let g = i64::try_from(granularity_ms).unwrap_or(i64::MAX).max(1);
    timestamp.div_euclid(g).saturating_mul(g)
}

/// Classifier for run-level series.
pub(crate) fn overall(_: &str) -> (bool, bool) {
    (false, true)
}
