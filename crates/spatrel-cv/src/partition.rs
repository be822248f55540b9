//! Held-out partitions of the row population.
//!
//! Two independent partitions can be configured for an experiment:
//!
//! - **Generalized**: rows touching the listed identifiers are removed from
//!   the cross-validation population entirely and scored separately in every
//!   fold, as an extrapolation test.
//! - **Clean**: rows touching the listed identifiers stay in the population;
//!   inside each fold they are scored again on their own, isolated from the
//!   other rows.
//!
//! A [`PartitionScope`] selects which identifier list of the
//! [`PartitionTable`] a partition uses. A row *touches* the identifiers when
//! its triplet is listed, or when its subject or object word is listed.
//!
//! # Overlap
//!
//! A clean row that also touches a generalized identifier would never reach
//! training, so its clean scores would silently measure extrapolation.
//! [`PartitionPolicy::check_disjoint`] rejects such configurations; callers
//! that need the permissive behaviour skip the check.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use spatrel_data::Triplet;

use crate::ConfigurationError;

/// Which identifier list a partition draws from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionScope {
    #[default]
    None,
    Triplets,
    Words,
}

impl PartitionScope {
    pub const ALL: [Self; 3] = [Self::None, Self::Triplets, Self::Words];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Triplets => "triplets",
            Self::Words => "words",
        }
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for PartitionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PartitionScope {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownScope { name: s.to_owned() })
    }
}

/// The fixed identifier lists partitions are drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionTable {
    pub triplets: Vec<Triplet>,
    pub words: Vec<String>,
}

impl PartitionTable {
    /// The lists shipped with the harness.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            triplets: vec![
                Triplet::new("man", "riding", "bike"),
                Triplet::new("dog", "under", "table"),
                Triplet::new("woman", "holding", "umbrella"),
                Triplet::new("cat", "on", "car"),
            ],
            words: vec!["horse".to_owned(), "kite".to_owned()],
        }
    }
}

impl Default for PartitionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolved identifier sets of one partition.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartitionIds {
    pub triplets: BTreeSet<Triplet>,
    pub words: BTreeSet<String>,
}

impl PartitionIds {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty() && self.words.is_empty()
    }

    /// Whether a row with this triplet belongs to the partition.
    ///
    /// ```
    /// use spatrel_cv::partition::{PartitionPolicy, PartitionScope};
    /// use spatrel_data::Triplet;
    ///
    /// let ids = PartitionPolicy::default().resolve(PartitionScope::Words);
    /// assert!(ids.touches(&Triplet::new("man", "riding", "horse")));
    /// assert!(!ids.touches(&Triplet::new("man", "riding", "bike")));
    /// ```
    #[must_use]
    pub fn touches(&self, triplet: &Triplet) -> bool {
        self.triplets.contains(triplet)
            || triplet
                .participant_words()
                .any(|word| self.words.contains(word))
    }

    /// Positions of the triplets that belong to the partition.
    pub fn matching<'a, I>(&self, triplets: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'a Triplet>,
    {
        triplets
            .into_iter()
            .enumerate()
            .filter(|(_, t)| self.touches(t))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Maps partition scopes to identifier sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionPolicy {
    table: PartitionTable,
}

impl PartitionPolicy {
    #[must_use]
    pub fn new(table: PartitionTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &PartitionTable {
        &self.table
    }

    /// Identifier sets selected by `scope`; empty for [`PartitionScope::None`].
    #[must_use]
    pub fn resolve(&self, scope: PartitionScope) -> PartitionIds {
        match scope {
            PartitionScope::None => PartitionIds::default(),
            PartitionScope::Triplets => PartitionIds {
                triplets: self.table.triplets.iter().cloned().collect(),
                words: BTreeSet::new(),
            },
            PartitionScope::Words => PartitionIds {
                triplets: BTreeSet::new(),
                words: self.table.words.iter().cloned().collect(),
            },
        }
    }

    /// Parses `name` as a scope and resolves it.
    pub fn resolve_named(&self, name: &str) -> Result<PartitionIds, ConfigurationError> {
        Ok(self.resolve(name.parse()?))
    }

    /// Rejects a clean partition that shares any identifier with the
    /// generalized one.
    ///
    /// Identifiers overlap when both sets list the same triplet or word, or
    /// when a triplet of one set contains a word listed by the other.
    pub fn check_disjoint(
        generalized: &PartitionIds,
        clean: &PartitionIds,
    ) -> Result<(), ConfigurationError> {
        let overlap = |identifier: String| ConfigurationError::OverlappingPartitions { identifier };

        if let Some(t) = generalized.triplets.intersection(&clean.triplets).next() {
            return Err(overlap(t.to_string()));
        }
        if let Some(w) = generalized.words.intersection(&clean.words).next() {
            return Err(overlap(w.clone()));
        }
        for (triplets, words) in [
            (&clean.triplets, &generalized.words),
            (&generalized.triplets, &clean.words),
        ] {
            if let Some(t) = triplets
                .iter()
                .find(|t| t.participant_words().any(|w| words.contains(w)))
            {
                return Err(overlap(t.to_string()));
            }
        }
        Ok(())
    }
}
