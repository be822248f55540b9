//! Word-to-vector encoders of the learned methods.
//!
//! An encoder turns one row (a [`WordTriple`] plus the subject box) into the
//! flat input vector of the network: three word blocks followed by the four
//! extra features.
//!
//! | method   | word block                                                   |
//! |----------|--------------------------------------------------------------|
//! | `emb`    | pretrained vector of the word                                |
//! | `rnd`    | fixed N(0, 1) vector per vocabulary entry, same dimension    |
//! | `onehot` | indicator over the words seen in training; zeros if unseen   |
//!
//! Encoders are fitted once per fold on the training rows, so a one-hot
//! encoder never allocates a slot for a word held out of training.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use spatrel_data::{EmbeddingTable, WordTriple, synthetic};

use crate::{Method, ModelError};

/// Number of extra numeric features appended to every row.
pub const EXTRA_FEATURES: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Encoder {
    /// Pretrained vectors; not persisted since the table is an input.
    Pretrained {
        dim: usize,
        #[serde(skip)]
        vectors: Vec<f32>,
    },
    Random {
        dim: usize,
        vectors: Vec<f32>,
    },
    /// Sorted vocabulary indices; a word's slot is its position.
    OneHot {
        words: Vec<usize>,
    },
}

impl Encoder {
    /// Fits the encoder of `method` to a fold's training rows.
    ///
    /// Returns `None` for methods that take no word input.
    pub fn fit<R>(
        method: Method,
        features: &[WordTriple],
        embeddings: &EmbeddingTable,
        rng: &mut R,
    ) -> Result<Option<Self>, ModelError>
    where
        R: Rng + ?Sized,
    {
        let encoder = match method {
            Method::Embedding => Self::Pretrained {
                dim: embeddings.dim(),
                vectors: (0..embeddings.len())
                    .flat_map(|i| embeddings.vector_at(i).iter().copied())
                    .collect(),
            },
            Method::Random => Self::Random {
                dim: embeddings.dim(),
                vectors: synthetic::random_vector(rng, embeddings.len() * embeddings.dim()),
            },
            Method::OneHot => {
                let words = features
                    .iter()
                    .flat_map(|f| f.to_array())
                    .collect::<BTreeSet<_>>();
                Self::OneHot {
                    words: words.into_iter().collect(),
                }
            }
            Method::Control => return Ok(None),
        };
        if encoder.block_width() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        Ok(Some(encoder))
    }

    /// Width of one word block.
    #[must_use]
    pub fn block_width(&self) -> usize {
        match self {
            Self::Pretrained { dim, .. } | Self::Random { dim, .. } => *dim,
            Self::OneHot { words } => words.len(),
        }
    }

    /// Width of an encoded row.
    #[must_use]
    pub fn input_width(&self) -> usize {
        3 * self.block_width() + EXTRA_FEATURES
    }

    /// Encodes one row. Words without a vector encode as a zero block.
    #[must_use]
    pub fn encode(&self, row: WordTriple, extra: [f32; EXTRA_FEATURES]) -> Vec<f32> {
        let width = self.block_width();
        let mut out = vec![0.0; self.input_width()];
        for (block, word) in out.chunks_exact_mut(width).zip(row.to_array()) {
            match self {
                Self::Pretrained { vectors, .. } | Self::Random { vectors, .. } => {
                    if let Some(v) = vectors.get(word * width..(word + 1) * width) {
                        block.copy_from_slice(v);
                    }
                }
                Self::OneHot { words } => {
                    if let Ok(slot) = words.binary_search(&word) {
                        block[slot] = 1.0;
                    }
                }
            }
        }
        out[3 * width..].copy_from_slice(&extra);
        out
    }
}
