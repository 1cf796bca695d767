//! Per-category subscriber fan-out.
//!
//! Delivery is synchronous and in registration order, under the category's
//! lock. A slow subscriber therefore delays later subscribers in the same
//! cycle; frontends that care must hand the event off to their own queue
//! inside the callback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use spawn_ledger_core::Galaxy;

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The categories subscribers can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateCategory {
    /// New bulk data landed for a galaxy.
    GalaxyData(Galaxy),
    /// A local submission to the remote database completed.
    LocalSubmission,
    /// The class taxonomy changed.
    Categories,
    /// The schematics export changed.
    Schematics,
    /// The profession-levels export changed.
    ProfessionLevels,
    /// The user flipped the cap-treatment preference.
    CapTreatment,
    /// The server list changed.
    Servers,
}

/// One update delivered to subscribers.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub category: UpdateCategory,
    /// Optional human-readable detail ("downloaded 312 resources").
    pub note: Option<String>,
}

impl UpdateEvent {
    pub fn new(category: UpdateCategory) -> Self {
        Self {
            category,
            note: None,
        }
    }

    pub fn with_note(category: UpdateCategory, note: impl Into<String>) -> Self {
        Self {
            category,
            note: Some(note.into()),
        }
    }
}

/// Receives updates for categories it subscribed to.
pub trait Subscriber: Send + Sync {
    fn on_update(&self, event: &UpdateEvent);
}

impl<F: Fn(&UpdateEvent) + Send + Sync> Subscriber for F {
    fn on_update(&self, event: &UpdateEvent) {
        self(event)
    }
}

/// Subscribers for one category, guarded by that category's own lock.
#[derive(Default)]
struct CategoryList {
    subscribers: Mutex<Vec<(String, Arc<dyn Subscriber>)>>,
}

/// The update registry. Owned by the composition root and injected into
/// collaborators — there are no process-wide statics here.
#[derive(Default)]
pub struct Notifier {
    lists: RwLock<HashMap<UpdateCategory, Arc<CategoryList>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, category: UpdateCategory) -> Arc<CategoryList> {
        if let Some(list) = self
            .lists
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&category)
        {
            return list.clone();
        }
        let mut lists = self.lists.write().unwrap_or_else(PoisonError::into_inner);
        lists.entry(category).or_default().clone()
    }

    /// Subscribe under a caller-chosen id. Idempotent: re-subscribing the
    /// same id replaces nothing and keeps the original position.
    pub fn subscribe(&self, category: UpdateCategory, id: &str, subscriber: Arc<dyn Subscriber>) {
        let list = self.list(category);
        let mut subscribers = locked(&list.subscribers);
        if !subscribers.iter().any(|(sid, _)| sid == id) {
            subscribers.push((id.to_string(), subscriber));
        }
    }

    /// Unsubscribe an id. Idempotent: unknown ids are ignored.
    pub fn unsubscribe(&self, category: UpdateCategory, id: &str) {
        let list = self.list(category);
        let mut subscribers = locked(&list.subscribers);
        subscribers.retain(|(sid, _)| sid != id);
    }

    /// Deliver an event to every subscriber of its category, synchronously,
    /// in registration order.
    pub fn notify(&self, event: &UpdateEvent) {
        let list = self.list(event.category);
        let subscribers = locked(&list.subscribers);
        for (_, subscriber) in subscribers.iter() {
            subscriber.on_update(event);
        }
    }

    pub fn subscriber_count(&self, category: UpdateCategory) -> usize {
        let list = self.list(category);
        let count = locked(&list.subscribers).len();
        count
    }
}
