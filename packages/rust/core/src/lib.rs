//! Pipeline orchestration for the tab catalog.
//!
//! This crate ties together ingestion, categorization and the catalog
//! store into the end-to-end `fetch` and `categorize` workflows.

pub mod pipeline;

pub use pipeline::{
    CategorizeConfig, CategorizeResult, FetchConfig, FetchResult, ProgressReporter,
    SilentProgress, categorize_and_save, fetch_and_save,
};
