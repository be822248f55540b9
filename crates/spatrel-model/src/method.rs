use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A predictive strategy under comparison.
///
/// Parsed once from its short identifier; everything downstream dispatches on
/// the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "emb")]
    Embedding,
    #[serde(rename = "rnd")]
    Random,
    #[serde(rename = "onehot")]
    OneHot,
    #[serde(rename = "ctrl")]
    Control,
}

impl Method {
    pub const ALL: [Self; 4] = [Self::Embedding, Self::Random, Self::OneHot, Self::Control];

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Embedding => "emb",
            Self::Random => "rnd",
            Self::OneHot => "onehot",
            Self::Control => "ctrl",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown method '{name}' (expected one of: emb, rnd, onehot, ctrl)")]
pub struct ParseMethodError {
    pub name: String,
}

impl FromStr for Method {
    type Err = ParseMethodError;

    /// ```
    /// use spatrel_model::Method;
    ///
    /// assert_eq!("onehot".parse::<Method>(), Ok(Method::OneHot));
    /// assert!("init".parse::<Method>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseMethodError { name: s.to_owned() })
    }
}

/// Output representation of the learned models.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Regress the object box directly.
    #[serde(rename = "REG")]
    Regression,
    /// Predict a dense occupancy grid for the object.
    #[default]
    #[serde(rename = "PIX")]
    Grid,
}

impl ModelKind {
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Regression => "REG",
            Self::Grid => "PIX",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown model type '{name}' (expected REG or PIX)")]
pub struct ParseModelKindError {
    pub name: String,
}

impl FromStr for ModelKind {
    type Err = ParseModelKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REG" => Ok(Self::Regression),
            "PIX" => Ok(Self::Grid),
            _ => Err(ParseModelKindError { name: s.to_owned() }),
        }
    }
}
