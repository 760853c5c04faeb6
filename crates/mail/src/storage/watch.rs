//! Per-user label snapshots published to observers

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::watch;

use crate::models::{Label, UserId};

/// Watch senders for each user that has (or had) an observer
///
/// Stores call [`LabelWatchers::publish`] with the user's fresh label list
/// while still holding the lock that guarded the mutation, and subscribe
/// under that same lock. Users nobody observes are skipped.
#[derive(Default)]
pub(crate) struct LabelWatchers {
    senders: RwLock<HashMap<UserId, watch::Sender<Vec<Label>>>>,
}

impl LabelWatchers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a user's labels, seeding new channels with `current`
    pub(crate) fn subscribe(&self, user_id: &UserId, current: Vec<Label>) -> watch::Receiver<Vec<Label>> {
        let mut senders = self.senders.write().unwrap();
        match senders.get(user_id) {
            Some(sender) => {
                sender.send_replace(current);
                sender.subscribe()
            }
            None => {
                let (sender, receiver) = watch::channel(current);
                senders.insert(user_id.clone(), sender);
                receiver
            }
        }
    }

    pub(crate) fn is_observed(&self, user_id: &UserId) -> bool {
        self.senders
            .read()
            .unwrap()
            .get(user_id)
            .is_some_and(|s| s.receiver_count() > 0)
    }

    pub(crate) fn publish(&self, user_id: &UserId, labels: Vec<Label>) {
        let senders = self.senders.read().unwrap();
        if let Some(sender) = senders.get(user_id) {
            sender.send_replace(labels);
        }
    }
}
