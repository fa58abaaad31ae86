//! Notifications crossing the event source boundary.
//!
//! Transports deliver raw [`WatchEvent`]s. They are decoded once into the
//! tagged [`Notification`] variant, which is all the reconciler ever sees.

#[cfg(test)]
use mockall::automock;
use tracing::trace;

use crate::ScaledObject;

/// Raw add/update/delete notification as produced by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(ScaledObject),
    Modified {
        old: ScaledObject,
        new: ScaledObject,
    },
    Deleted(ScaledObject),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Upsert(ScaledObject),
    Delete(ScaledObject),
}

impl WatchEvent {
    /// Converts the raw event into a notification for the reconciler.
    ///
    /// Updates whose old and new snapshots carry the same resource version
    /// are periodic resyncs, not changes; they yield `None`.
    pub fn into_notification(self) -> Option<Notification> {
        match self {
            WatchEvent::Added(object) => Some(Notification::Upsert(object)),
            WatchEvent::Modified { old, new } => {
                if old.resource_version() == new.resource_version() {
                    trace!(
                        name = new.name(),
                        resource_version = new.resource_version(),
                        "Dropping update with unchanged resource version"
                    );
                    return None;
                }
                Some(Notification::Upsert(new))
            }
            WatchEvent::Deleted(object) => Some(Notification::Delete(object)),
        }
    }
}

impl Notification {
    pub fn object(&self) -> &ScaledObject {
        match self {
            Notification::Upsert(object) | Notification::Delete(object) => object,
        }
    }

    /// Routes the notification to the matching handler callback.
    pub fn dispatch_to(
        self,
        handler: &dyn EventHandler,
    ) {
        match self {
            Notification::Upsert(object) => handler.on_upsert(object),
            Notification::Delete(object) => handler.on_delete(object),
        }
    }
}

/// Receiver of decoded notifications.
///
/// Both callbacks must return without waiting on watch task progress.
#[cfg_attr(test, automock)]
pub trait EventHandler: Send + Sync + 'static {
    fn on_upsert(
        &self,
        object: ScaledObject,
    );

    fn on_delete(
        &self,
        object: ScaledObject,
    );
}
