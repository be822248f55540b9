//! Statistical utilities for the spatrel experiment harness.
//!
//! This crate provides the numeric building blocks the evaluation engine
//! scores predictions with:
//!
//! - **Descriptive statistics**: summarise per-fold scores (mean, standard deviation, range)
//! - **Correlation**: Pearson correlation and the coefficient of determination (R²)
//! - **Classification**: binary confusion counts with accuracy, precision, recall and F1
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing fold scores
//! - [`correlation`]: Linear association between predicted and true values
//! - [`classification`]: Binary classification counts and derived scores
//!
//! # Examples
//!
//! ## Summarising fold scores
//!
//! ```
//! use spatrel_stats::descriptive::DescriptiveStats;
//!
//! let scores = [0.5, 0.7, 0.6];
//! let stats = DescriptiveStats::new(scores).unwrap();
//! assert!((stats.mean - 0.6).abs() < 1e-6);
//! ```
//!
//! ## Correlating predictions with targets
//!
//! ```
//! use spatrel_stats::correlation;
//!
//! let truth = [1.0, 2.0, 3.0, 4.0];
//! let predicted = [2.0, 4.0, 6.0, 8.0];
//! assert!((correlation::pearson(&truth, &predicted) - 1.0).abs() < 1e-6);
//! ```
//!
//! ## Scoring binary decisions
//!
//! ```
//! use spatrel_stats::classification::BinaryCounts;
//!
//! let counts = BinaryCounts::from_pairs([(true, true), (false, false), (true, false)]);
//! assert_eq!(counts.true_positives, 1);
//! assert!((counts.accuracy() - 2.0 / 3.0).abs() < 1e-6);
//! ```

pub mod classification;
pub mod correlation;
pub mod descriptive;
