//! Connectivity state and transition observers.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

/// Tracks whether the device is online and notifies observers on change.
///
/// The monitor performs no probing of its own - no polling, no heartbeats.
/// Transitions are driven exclusively by the platform reachability signal
/// calling [`ConnectivityMonitor::set_online`]. On every transition the
/// recorded state is updated first, then all registered listeners are
/// invoked synchronously in registration order.
///
/// The monitor is constructed once at startup and injected where needed;
/// tests substitute their own instance.
///
/// # Example
///
/// ```rust
/// use holdfast_sync::ConnectivityMonitor;
/// use std::sync::Arc;
///
/// let monitor = Arc::new(ConnectivityMonitor::new(true));
/// let sub = monitor.subscribe(|online| println!("online: {online}"));
/// monitor.set_online(false);
/// sub.unsubscribe();
/// ```
pub struct ConnectivityMonitor {
    online: AtomicBool,
    listeners: Arc<Mutex<Vec<(u64, Listener)>>>,
    next_id: AtomicU64,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the platform's current reachability state.
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: AtomicBool::new(initially_online),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the current connectivity state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a reachability signal from the platform.
    ///
    /// Returns `true` if the state changed. A call that does not change
    /// the state is a no-op: no listener is notified. Listeners run
    /// synchronously on the calling thread, in registration order, after
    /// the state has been updated; by the time this returns, every
    /// listener has seen the transition.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }
        tracing::debug!(online, "connectivity transition");

        // Snapshot outside the lock so listeners may subscribe or
        // unsubscribe without deadlocking.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(online);
        }
        true
    }

    /// Registers a callback invoked on every transition.
    ///
    /// Returns a handle; dropping it (or calling
    /// [`Subscription::unsubscribe`]) removes the listener.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().push((id, Arc::new(callback)));
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Handle for a registered connectivity listener.
///
/// The listener stays registered for the lifetime of this handle.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    listeners: Weak<Mutex<Vec<(u64, Listener)>>>,
    id: u64,
}

impl Subscription {
    /// Removes the listener now instead of at drop.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
