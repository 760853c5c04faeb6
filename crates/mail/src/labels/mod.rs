//! Label repository
//!
//! Local-first access to labels, folders and contact groups, refreshed from
//! the remote API on demand.

mod repository;

pub use repository::{LabelRepository, LabelsObservation, RefreshPolicy, SelectedLabels};
