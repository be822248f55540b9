use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DataError, EmbeddingTable};

/// The three words describing a spatial relation, e.g. `man riding horse`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub subject: String,
    pub relation: String,
    pub object: String,
}

impl Triplet {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    /// Words that identify the row's participants (subject and object).
    pub fn participant_words(&self) -> impl Iterator<Item = &str> {
        [self.subject.as_str(), self.object.as_str()].into_iter()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        [
            self.subject.as_str(),
            self.relation.as_str(),
            self.object.as_str(),
        ]
        .into_iter()
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.relation, self.object)
    }
}

/// A triplet resolved to row indices of an [`EmbeddingTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordTriple {
    pub subject: usize,
    pub relation: usize,
    pub object: usize,
}

impl WordTriple {
    pub fn resolve(triplet: &Triplet, table: &EmbeddingTable) -> Result<Self, DataError> {
        Ok(Self {
            subject: table.index_of(&triplet.subject)?,
            relation: table.index_of(&triplet.relation)?,
            object: table.index_of(&triplet.object)?,
        })
    }

    #[must_use]
    pub fn to_array(self) -> [usize; 3] {
        [self.subject, self.relation, self.object]
    }
}
