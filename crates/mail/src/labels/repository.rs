//! Fetch-then-cache repository over `LabelStore` and `LabelApi`

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{LabelApi, normalize_label};
use crate::models::{Label, LabelId, LabelType, UserId};
use crate::storage::LabelStore;

/// When observing labels should also pull them from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Refresh every time observation starts
    #[default]
    Always,
    /// Refresh only when nothing is cached yet
    IfEmpty,
    /// Serve the cache only
    Never,
}

/// A live view of a user's labels
///
/// `labels` always reflects the local store. When the initial refresh
/// failed, the error is kept in `refresh_error` and the receiver keeps
/// serving whatever was cached.
pub struct LabelsObservation {
    pub labels: watch::Receiver<Vec<Label>>,
    pub refresh_error: Option<anyhow::Error>,
}

impl LabelsObservation {
    /// Current snapshot without marking it seen
    pub fn current(&self) -> Vec<Label> {
        self.labels.borrow().clone()
    }
}

/// A live view of some of a user's labels, selected by id
///
/// Follows the user's label snapshot and reports a change only when the
/// selected labels differ from the ones last seen.
pub struct SelectedLabels {
    receiver: watch::Receiver<Vec<Label>>,
    ids: Vec<LabelId>,
    seen: Vec<Label>,
}

impl SelectedLabels {
    fn new(mut receiver: watch::Receiver<Vec<Label>>, ids: Vec<LabelId>) -> Self {
        let seen = select(&receiver.borrow_and_update(), &ids);
        Self { receiver, ids, seen }
    }

    /// Selected labels as currently stored
    pub fn current(&self) -> Vec<Label> {
        select(&self.receiver.borrow(), &self.ids)
    }

    /// Selected labels as of the last reported change
    pub fn last_seen(&self) -> &[Label] {
        &self.seen
    }

    /// Wait until the selection changes and return it
    ///
    /// Fails once the store backing the observation is gone.
    pub async fn changed(&mut self) -> Result<Vec<Label>, watch::error::RecvError> {
        loop {
            self.receiver.changed().await?;
            if let Some(next) = self.take_update() {
                return Ok(next);
            }
        }
    }

    /// The new selection if it changed since last seen, without waiting
    pub fn poll_changed(&mut self) -> Option<Vec<Label>> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }
        self.take_update()
    }

    fn take_update(&mut self) -> Option<Vec<Label>> {
        let next = select(&self.receiver.borrow_and_update(), &self.ids);
        if next == self.seen {
            return None;
        }
        self.seen = next.clone();
        Some(next)
    }
}

fn select(labels: &[Label], ids: &[LabelId]) -> Vec<Label> {
    labels.iter().filter(|l| ids.contains(&l.id)).cloned().collect()
}

/// Repository for labels, folders and contact groups
pub struct LabelRepository {
    store: Arc<dyn LabelStore>,
    api: Arc<dyn LabelApi>,
}

impl LabelRepository {
    pub fn new(store: Arc<dyn LabelStore>, api: Arc<dyn LabelApi>) -> Self {
        Self { store, api }
    }

    /// Observe all labels of a user, refreshing them according to `policy`
    pub fn observe_all_labels(&self, user_id: &UserId, policy: RefreshPolicy) -> Result<LabelsObservation> {
        let labels = self.store.observe_all_labels(user_id)?;

        let should_refresh = match policy {
            RefreshPolicy::Always => true,
            RefreshPolicy::IfEmpty => labels.borrow().is_empty(),
            RefreshPolicy::Never => false,
        };

        let refresh_error = if should_refresh {
            match self.refresh_labels(user_id) {
                Ok(_) => None,
                Err(e) => {
                    warn!(
                        "Label refresh failed for user {}, serving cached labels: {:#}",
                        user_id.as_str(),
                        e
                    );
                    Some(e)
                }
            }
        } else {
            None
        };

        Ok(LabelsObservation {
            labels,
            refresh_error,
        })
    }

    /// All labels of a user; fetched from the server when nothing is cached
    pub fn find_all_labels(&self, user_id: &UserId) -> Result<Vec<Label>> {
        let cached = self.store.find_all_labels(user_id)?;
        if !cached.is_empty() {
            return Ok(cached);
        }

        debug!("No cached labels for user {}, fetching", user_id.as_str());
        self.refresh_labels(user_id)
    }

    /// Fetch labels, folders and contact groups and cache them
    ///
    /// Returns the fetched records in that order. Nothing is written when
    /// any of the three fetches fails. Rows missing from the response are
    /// left in place.
    pub fn refresh_labels(&self, user_id: &UserId) -> Result<Vec<Label>> {
        let labels = self
            .api
            .fetch_labels(user_id)
            .context("Failed to fetch labels")?;
        let folders = self
            .api
            .fetch_folders(user_id)
            .context("Failed to fetch folders")?;
        let contact_groups = self
            .api
            .fetch_contact_groups(user_id)
            .context("Failed to fetch contact groups")?;

        let fetched = labels
            .into_iter()
            .chain(folders)
            .chain(contact_groups)
            .map(|api_label| normalize_label(api_label, user_id))
            .collect::<Result<Vec<_>>>()?;

        self.store.insert_or_update(&fetched)?;

        info!(
            "Refreshed {} labels for user {}",
            fetched.len(),
            user_id.as_str()
        );
        Ok(fetched)
    }

    /// Observe the labels with the given ids, from local storage only
    pub fn observe_labels(&self, user_id: &UserId, ids: &[LabelId]) -> Result<SelectedLabels> {
        let receiver = self.store.observe_all_labels(user_id)?;
        Ok(SelectedLabels::new(receiver, ids.to_vec()))
    }

    pub fn find_labels(&self, user_id: &UserId, ids: &[LabelId]) -> Result<Vec<Label>> {
        self.store.find_labels_by_id(user_id, ids)
    }

    pub fn find_label(&self, id: &LabelId) -> Result<Option<Label>> {
        self.store.find_label_by_id(id)
    }

    pub fn find_contact_groups(&self, user_id: &UserId) -> Result<Vec<Label>> {
        self.store.find_labels_by_type(user_id, LabelType::ContactGroup)
    }

    /// A page of message labels, in display order
    pub fn find_labels_paged(&self, user_id: &UserId, limit: usize, offset: usize) -> Result<Vec<Label>> {
        self.store
            .find_labels_paged(user_id, LabelType::MessageLabel, limit, offset)
    }

    /// A page of folders, in display order
    pub fn find_folders_paged(&self, user_id: &UserId, limit: usize, offset: usize) -> Result<Vec<Label>> {
        self.store
            .find_labels_paged(user_id, LabelType::Folder, limit, offset)
    }

    pub fn save_label(&self, label: Label) -> Result<()> {
        self.store.insert_or_update(std::slice::from_ref(&label))
    }

    pub fn save_labels(&self, labels: &[Label]) -> Result<()> {
        self.store.insert_or_update(labels)
    }

    pub fn delete_label(&self, id: &LabelId) -> Result<()> {
        self.store.delete_label_by_id(id)
    }

    pub fn delete_all_labels(&self, user_id: &UserId) -> Result<()> {
        info!("Deleting all labels for user {}", user_id.as_str());
        self.store.delete_all_labels(user_id)
    }

    pub fn delete_contact_groups(&self, user_id: &UserId) -> Result<()> {
        self.store.delete_contact_groups(user_id)
    }
}
