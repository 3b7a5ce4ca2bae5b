use tracing::debug;

use crate::channel::{AsyncChannel, Dispatcher, SyncChannel, VetoChannel};
use crate::error::Veto;
use crate::event::{
    ClearRepositoryCacheEvent, PostReceiveEvent, PreReceiveEvent, RepositoryEvent,
};

/// Process-wide publish/subscribe bus for repository lifecycle events.
///
/// One explicit channel per event type:
///
/// | channel | event | delivery |
/// |---|---|---|
/// | [`repository`](Self::repository) | [`RepositoryEvent`] | synchronous |
/// | [`cache_clear`](Self::cache_clear) | [`ClearRepositoryCacheEvent`] | synchronous |
/// | [`pre_receive`](Self::pre_receive) | [`PreReceiveEvent`] | synchronous, vetoable |
/// | [`post_receive`](Self::post_receive) | [`PostReceiveEvent`] | asynchronous |
///
/// The bus is constructed once at startup and shared by handle; all channels
/// are safe for concurrent publication and subscription.
pub struct EventBus {
    repository: SyncChannel<RepositoryEvent>,
    cache_clear: SyncChannel<ClearRepositoryCacheEvent>,
    pre_receive: VetoChannel<PreReceiveEvent>,
    post_receive: AsyncChannel<PostReceiveEvent>,
    dispatcher: Dispatcher,
}

impl EventBus {
    pub fn new() -> Self {
        let dispatcher = Dispatcher::new();
        Self {
            repository: SyncChannel::new(),
            cache_clear: SyncChannel::new(),
            pre_receive: VetoChannel::new(),
            post_receive: AsyncChannel::new(dispatcher.clone()),
            dispatcher,
        }
    }

    /// Repository CRUD/modification notifications.
    pub fn repository(&self) -> &SyncChannel<RepositoryEvent> {
        &self.repository
    }

    /// Requests to drop a repository's cached store state.
    pub fn cache_clear(&self) -> &SyncChannel<ClearRepositoryCacheEvent> {
        &self.cache_clear
    }

    /// Vetoable hook fired before incoming changes are accepted.
    pub fn pre_receive(&self) -> &VetoChannel<PreReceiveEvent> {
        &self.pre_receive
    }

    /// Fire-and-forget hook fired after changes are durably committed.
    pub fn post_receive(&self) -> &AsyncChannel<PostReceiveEvent> {
        &self.post_receive
    }

    /// Publish a repository notification.
    pub fn publish_repository(&self, event: RepositoryEvent) {
        debug!(kind = %event.kind, repository = %event.repository.id, "repository event");
        self.repository.publish(&event);
    }

    /// Publish a cache-clear request.
    pub fn publish_cache_clear(&self, event: ClearRepositoryCacheEvent) {
        debug!(repository = %event.repository_id, "cache clear event");
        self.cache_clear.publish(&event);
    }

    /// Publish a pre-receive hook event; a veto aborts the push.
    pub fn publish_pre_receive(&self, event: &PreReceiveEvent) -> Result<(), Veto> {
        debug!(
            repository = %event.repository_id,
            changesets = event.changesets.len(),
            "pre-receive event"
        );
        self.pre_receive.publish(event)
    }

    /// Publish a post-receive hook event; returns without waiting for handlers.
    pub fn publish_post_receive(&self, event: PostReceiveEvent) {
        debug!(
            repository = %event.repository_id,
            changesets = event.changesets.len(),
            "post-receive event"
        );
        self.post_receive.publish(event);
    }

    /// Block until every asynchronous handler queued so far has run.
    ///
    /// Used at shutdown and by tests that assert on asynchronous effects.
    pub fn flush(&self) {
        self.dispatcher.flush();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{scoped, RepositoryEventKind};
    use harbor_types::{Changeset, Repository, RepositoryId};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn repo(id: &str) -> Repository {
        let mut r = Repository::new("ns", "name", "git");
        r.id = RepositoryId::new(id);
        r
    }

    #[test]
    fn repository_events_are_delivered_synchronously() {
        let bus = EventBus::new();
        let archived = Arc::new(AtomicBool::new(false));

        let seen = Arc::clone(&archived);
        bus.repository().subscribe(move |event: &RepositoryEvent| {
            seen.store(event.repository.archived, Ordering::SeqCst);
        });

        let mut r = repo("r1");
        r.archived = true;
        bus.publish_repository(RepositoryEvent::modified(r.clone(), repo("r1")));
        // Synchronous delivery: visible immediately after publish returns.
        assert!(archived.load(Ordering::SeqCst));
    }

    #[test]
    fn pre_receive_veto_reaches_publisher() {
        let bus = EventBus::new();
        bus.pre_receive().subscribe(|event: &PreReceiveEvent| {
            if event.changesets.iter().any(|c| c.description.is_empty()) {
                return Err(Veto::new("empty commit message"));
            }
            Ok(())
        });

        let ok = PreReceiveEvent {
            repository_id: RepositoryId::new("r1"),
            changesets: vec![Changeset::new("a1", "fix build", "ford")],
        };
        assert!(bus.publish_pre_receive(&ok).is_ok());

        let bad = PreReceiveEvent {
            repository_id: RepositoryId::new("r1"),
            changesets: vec![Changeset::new("a2", "", "ford")],
        };
        let veto = bus.publish_pre_receive(&bad).unwrap_err();
        assert_eq!(veto.reason, "empty commit message");
    }

    #[test]
    fn post_receive_only_fires_matching_repository() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        bus.post_receive().subscribe_filtered(
            scoped(RepositoryId::new("mine")),
            move |_event: &PostReceiveEvent| {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish_post_receive(PostReceiveEvent {
            repository_id: RepositoryId::new("mine"),
            changesets: vec![],
        });
        bus.publish_post_receive(PostReceiveEvent {
            repository_id: RepositoryId::new("other"),
            changesets: vec![],
        });
        bus.flush();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cache_clear_channel_round_trip() {
        let bus = EventBus::new();
        let cleared = Arc::new(std::sync::Mutex::new(Vec::new()));

        let seen = Arc::clone(&cleared);
        bus.cache_clear()
            .subscribe(move |event: &ClearRepositoryCacheEvent| {
                seen.lock().unwrap().push(event.repository_id.clone());
            });

        bus.publish_cache_clear(ClearRepositoryCacheEvent::new(RepositoryId::new("r9")));
        assert_eq!(
            cleared.lock().unwrap().as_slice(),
            &[RepositoryId::new("r9")]
        );
    }

    #[test]
    fn concurrent_publishers_are_safe() {
        use std::thread;

        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        bus.repository().subscribe(move |_event: &RepositoryEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let mut handles = Vec::new();
        for i in 0..4 {
            let bus = Arc::clone(&bus);
            handles.push(thread::spawn(move || {
                for _ in 0..25 {
                    bus.publish_repository(RepositoryEvent::created(repo(&format!("r{i}"))));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 100);
        assert_eq!(bus.repository().subscriber_count(), 1);
    }

    #[test]
    fn created_event_kind() {
        let event = RepositoryEvent::created(repo("r1"));
        assert_eq!(event.kind, RepositoryEventKind::Created);
        assert!(event.previous.is_none());
    }
}
