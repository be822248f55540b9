//! Word embedding tables.
//!
//! An [`EmbeddingTable`] maps each word to a fixed-dimension vector. The table
//! serialises as `{ "dim": .., "words": [..], "vectors": [..] }` with vectors
//! stored flat in word order; the word index is rebuilt (and the storage size
//! validated) on deserialisation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EmbeddingTableData", into = "EmbeddingTableData")]
pub struct EmbeddingTable {
    dim: usize,
    words: Vec<String>,
    vectors: Vec<f32>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct EmbeddingTableData {
    dim: usize,
    words: Vec<String>,
    vectors: Vec<f32>,
}

impl TryFrom<EmbeddingTableData> for EmbeddingTable {
    type Error = DataError;

    fn try_from(data: EmbeddingTableData) -> Result<Self, Self::Error> {
        Self::new(data.dim, data.words, data.vectors)
    }
}

impl From<EmbeddingTable> for EmbeddingTableData {
    fn from(table: EmbeddingTable) -> Self {
        Self {
            dim: table.dim,
            words: table.words,
            vectors: table.vectors,
        }
    }
}

impl EmbeddingTable {
    /// Builds a table from words and their flat, word-ordered vectors.
    ///
    /// ```
    /// use spatrel_data::EmbeddingTable;
    ///
    /// let table = EmbeddingTable::new(2, vec!["man".into(), "horse".into()], vec![1.0, 0.0, 0.0, 1.0])?;
    /// assert_eq!(table.vector("horse")?, &[0.0, 1.0]);
    /// assert!(table.vector("kite").is_err());
    /// # Ok::<(), spatrel_data::DataError>(())
    /// ```
    pub fn new(dim: usize, words: Vec<String>, vectors: Vec<f32>) -> Result<Self, DataError> {
        let expected = dim * words.len();
        if vectors.len() != expected {
            return Err(DataError::EmbeddingSize {
                expected,
                actual: vectors.len(),
            });
        }
        let mut index = HashMap::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            if index.insert(word.clone(), i).is_some() {
                return Err(DataError::DuplicateWord { word: word.clone() });
            }
        }
        Ok(Self {
            dim,
            words,
            vectors,
            index,
        })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn index_of(&self, word: &str) -> Result<usize, DataError> {
        self.index
            .get(word)
            .copied()
            .ok_or_else(|| DataError::UnknownWord {
                word: word.to_owned(),
            })
    }

    pub fn vector(&self, word: &str) -> Result<&[f32], DataError> {
        self.index_of(word).map(|i| self.vector_at(i))
    }

    /// Vector of the word at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn vector_at(&self, index: usize) -> &[f32] {
        &self.vectors[index * self.dim..(index + 1) * self.dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EmbeddingTable {
        EmbeddingTable::new(
            3,
            vec!["man".into(), "riding".into(), "horse".into()],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.index_of("riding").unwrap(), 1);
        assert_eq!(table.vector_at(2), &[7.0, 8.0, 9.0]);
        assert_eq!(
            table.index_of("kite"),
            Err(DataError::UnknownWord {
                word: "kite".into()
            })
        );
    }

    #[test]
    fn test_rejects_bad_storage() {
        let err = EmbeddingTable::new(2, vec!["a".into()], vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            DataError::EmbeddingSize {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = EmbeddingTable::new(1, vec!["a".into(), "a".into()], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err, DataError::DuplicateWord { word: "a".into() });
    }

    #[test]
    fn test_json_restores_index() {
        let json = serde_json::to_string(&table()).unwrap();
        let restored: EmbeddingTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table());
        assert_eq!(restored.vector("horse").unwrap(), &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_json_validates_size() {
        let json = r#"{"dim":2,"words":["a"],"vectors":[1.0]}"#;
        assert!(serde_json::from_str::<EmbeddingTable>(json).is_err());
    }
}
