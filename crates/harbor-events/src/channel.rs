use std::sync::mpsc;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

use tracing::{debug, trace, warn};

use crate::error::Veto;

type Filter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// One registered handler, optionally restricted by a predicate.
struct Subscriber<E, H> {
    filter: Option<Filter<E>>,
    handler: H,
}

impl<E, H> Subscriber<E, H> {
    fn matches(&self, event: &E) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }
}

// ---------------------------------------------------------------------------
// SyncChannel
// ---------------------------------------------------------------------------

/// Synchronous, non-vetoable delivery.
///
/// Handlers run on the publisher's thread in registration order. When
/// `publish` returns, every matching handler has observed the event — the
/// contract the write gate and the store caches rely on.
pub struct SyncChannel<E> {
    subscribers: RwLock<Vec<Subscriber<E, Box<dyn Fn(&E) + Send + Sync>>>>,
}

impl<E> SyncChannel<E> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler for every event on this channel.
    pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) {
        self.add(None, Box::new(handler));
    }

    /// Register a handler that only sees events matching `filter`.
    pub fn subscribe_filtered(
        &self,
        filter: impl Fn(&E) -> bool + Send + Sync + 'static,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) {
        self.add(Some(Box::new(filter)), Box::new(handler));
    }

    fn add(&self, filter: Option<Filter<E>>, handler: Box<dyn Fn(&E) + Send + Sync>) {
        self.subscribers
            .write()
            .expect("channel lock poisoned")
            .push(Subscriber { filter, handler });
    }

    /// Deliver `event` to every matching subscriber.
    pub fn publish(&self, event: &E) {
        let subs = self.subscribers.read().expect("channel lock poisoned");
        for sub in subs.iter() {
            if sub.matches(event) {
                (sub.handler)(event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("channel lock poisoned")
            .len()
    }
}

// ---------------------------------------------------------------------------
// VetoChannel
// ---------------------------------------------------------------------------

/// Synchronous, vetoable delivery.
///
/// The first handler returning a [`Veto`] aborts delivery to the remaining
/// subscribers; the veto is handed back to the publisher, which must abort
/// the change that triggered the event.
pub struct VetoChannel<E> {
    subscribers: RwLock<Vec<Subscriber<E, Box<dyn Fn(&E) -> Result<(), Veto> + Send + Sync>>>>,
}

impl<E> VetoChannel<E> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a vetoing handler for every event on this channel.
    pub fn subscribe(&self, handler: impl Fn(&E) -> Result<(), Veto> + Send + Sync + 'static) {
        self.add(None, Box::new(handler));
    }

    /// Register a vetoing handler that only sees events matching `filter`.
    pub fn subscribe_filtered(
        &self,
        filter: impl Fn(&E) -> bool + Send + Sync + 'static,
        handler: impl Fn(&E) -> Result<(), Veto> + Send + Sync + 'static,
    ) {
        self.add(Some(Box::new(filter)), Box::new(handler));
    }

    fn add(
        &self,
        filter: Option<Filter<E>>,
        handler: Box<dyn Fn(&E) -> Result<(), Veto> + Send + Sync>,
    ) {
        self.subscribers
            .write()
            .expect("channel lock poisoned")
            .push(Subscriber { filter, handler });
    }

    /// Deliver `event`, stopping at the first veto.
    pub fn publish(&self, event: &E) -> Result<(), Veto> {
        let subs = self.subscribers.read().expect("channel lock poisoned");
        for sub in subs.iter() {
            if sub.matches(event) {
                if let Err(veto) = (sub.handler)(event) {
                    debug!(reason = %veto.reason, "event vetoed");
                    return Err(veto);
                }
            }
        }
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("channel lock poisoned")
            .len()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher + AsyncChannel
// ---------------------------------------------------------------------------

type Job = Box<dyn FnOnce() + Send>;

/// Single worker thread executing queued jobs in submission order.
///
/// Shared by every [`AsyncChannel`] of a bus so asynchronous handlers for one
/// repository never race each other.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name("harbor-event-dispatch".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
                trace!("event dispatcher stopped");
            })
            .expect("failed to spawn event dispatcher");
        Self {
            inner: Arc::new(DispatcherInner {
                sender: Mutex::new(Some(tx)),
                worker: Mutex::new(Some(worker)),
            }),
        }
    }

    fn execute(&self, job: Job) {
        let sender = self.inner.sender.lock().expect("dispatcher lock poisoned");
        if let Some(tx) = sender.as_ref() {
            if tx.send(job).is_err() {
                warn!("event dispatcher is gone, dropping event");
            }
        }
    }

    /// Block until every job queued so far has run.
    pub(crate) fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        self.execute(Box::new(move || {
            let _ = tx.send(());
        }));
        let _ = rx.recv();
    }
}

impl Drop for DispatcherInner {
    fn drop(&mut self) {
        // Closing the sender ends the worker loop.
        if let Ok(mut sender) = self.sender.lock() {
            drop(sender.take());
        }
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Asynchronous, fire-and-forget delivery.
///
/// `publish` queues the event on the bus's dispatcher thread and returns
/// immediately; handler panics or slowness never reach the publisher.
pub struct AsyncChannel<E> {
    subscribers: Arc<RwLock<Vec<Subscriber<E, Box<dyn Fn(&E) + Send + Sync>>>>>,
    dispatcher: Dispatcher,
}

impl<E: Clone + Send + Sync + 'static> AsyncChannel<E> {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            dispatcher,
        }
    }

    /// Register a handler for every event on this channel.
    pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) {
        self.add(None, Box::new(handler));
    }

    /// Register a handler that only sees events matching `filter`.
    pub fn subscribe_filtered(
        &self,
        filter: impl Fn(&E) -> bool + Send + Sync + 'static,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) {
        self.add(Some(Box::new(filter)), Box::new(handler));
    }

    fn add(&self, filter: Option<Filter<E>>, handler: Box<dyn Fn(&E) + Send + Sync>) {
        self.subscribers
            .write()
            .expect("channel lock poisoned")
            .push(Subscriber { filter, handler });
    }

    /// Queue `event` for delivery on the dispatcher thread.
    pub fn publish(&self, event: E) {
        let subscribers = Arc::clone(&self.subscribers);
        self.dispatcher.execute(Box::new(move || {
            let subs = subscribers.read().expect("channel lock poisoned");
            for sub in subs.iter() {
                if sub.matches(&event) {
                    (sub.handler)(&event);
                }
            }
        }));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("channel lock poisoned")
            .len()
    }
}
