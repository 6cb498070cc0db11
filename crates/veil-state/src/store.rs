//! Single-writer store: serialized mutators, re-entrant application, and
//! subscriber fan-out.
//!
//! The store owns the committed state and hands mutators a fresh root façade
//! over it. When a mutator returns, its façade is folded onto the state as
//! committed *at that moment* (nested applications may have advanced it), and
//! subscribers are notified exactly once when the outermost application
//! completes, regardless of how many nested applications produced changes.

use crate::value::type_name;
use crate::{snapshot, snapshot_onto, Entry, Facade, StateError, StateResult, Value, WrapOptions};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

type Listener = Rc<dyn Fn(&Value)>;

struct StoreInner {
    state: RefCell<Value>,
    options: WrapOptions,
    depth: Cell<usize>,
    pending_notify: Cell<bool>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
}

/// A single-writer store over an immutable state tree.
///
/// Cloning a `Store` clones the handle; all handles observe the same
/// committed state and subscriber list. The store is single-threaded by
/// design (see the crate docs); mutators may suspend only through
/// [`Store::apply_async`].
///
/// # Examples
///
/// ```
/// use veil_state::{value, Entry, Store, WrapOptions};
///
/// let store = Store::new(value!({"count": 0}), WrapOptions::default()).unwrap();
/// let result = store
///     .apply(|state| {
///         let count = state.get("count")?.unwrap().as_value().unwrap().as_i64().unwrap();
///         state.set("count", count + 1)?;
///         Ok(Entry::Facade(state.clone()))
///     })
///     .unwrap();
///
/// assert_eq!(result["count"], 1);
/// assert_eq!(store.state()["count"], 1);
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state)
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Handle returned by [`Store::subscribe`]; dropping it keeps the listener
/// registered, [`Subscription::unsubscribe`] removes it.
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    /// Remove the listener. Unsubscribing from a dropped store is a no-op.
    pub fn unsubscribe(self) {
        if let Some(store) = self.store.upgrade() {
            store.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl Store {
    /// Create a store over an initial container state.
    pub fn new(initial: Value, options: WrapOptions) -> StateResult<Store> {
        if !initial.is_container() {
            return Err(StateError::unsupported(format!(
                "store state must be a container, found {}",
                type_name(&initial)
            )));
        }
        Ok(Store {
            inner: Rc::new(StoreInner {
                state: RefCell::new(initial),
                options,
                depth: Cell::new(0),
                pending_notify: Cell::new(false),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        })
    }

    /// The committed state. Cheap: containers are shared by reference.
    pub fn state(&self) -> Value {
        self.inner.state.borrow().clone()
    }

    /// Register a listener invoked with the new state after each outermost
    /// application that committed a change. Listeners fire in subscription
    /// order.
    pub fn subscribe(&self, listener: impl Fn(&Value) + 'static) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Run a mutator against a fresh façade over the current state and commit
    /// the effective changes.
    ///
    /// `apply` is re-entrant: a mutator may call `apply` on the same store,
    /// and the nested application commits before the outer one folds. The
    /// mutator's return value resolves as follows: the root façade itself
    /// yields the fresh snapshot, any other recognized entry yields its
    /// snapshot, and a leaf is returned verbatim. Errors from the mutator
    /// propagate unchanged and commit nothing from this invocation.
    pub fn apply<M>(&self, mutator: M) -> StateResult<Value>
    where
        M: FnOnce(&Facade) -> StateResult<Entry>,
    {
        let root = Facade::root(self.state(), self.inner.options);
        self.inner.depth.set(self.inner.depth.get() + 1);
        let returned = mutator(&root);
        let outcome = returned.map(|entry| self.commit(&root, entry));
        self.finish();
        outcome
    }

    /// [`Store::apply`] for mutators that suspend.
    ///
    /// The façade stays live across suspension and the re-entrancy depth
    /// spans it, so applications overlapped through suspension serialize in
    /// resolution order and notifications still coalesce to the outermost
    /// completion.
    pub async fn apply_async<M, Fut>(&self, mutator: M) -> StateResult<Value>
    where
        M: FnOnce(Facade) -> Fut,
        Fut: Future<Output = StateResult<Entry>>,
    {
        let root = Facade::root(self.state(), self.inner.options);
        self.inner.depth.set(self.inner.depth.get() + 1);
        let returned = mutator(root.clone()).await;
        let outcome = returned.map(|entry| self.commit(&root, entry));
        self.finish();
        outcome
    }

    fn commit(&self, root: &Facade, returned: Entry) -> Value {
        // Fold onto the state as committed now, not as wrapped at entry:
        // nested applications may have advanced it.
        let current = self.state();
        let folded = snapshot_onto(&Entry::Facade(root.clone()), &current);
        if !folded.same(&current) {
            debug!(depth = self.inner.depth.get(), "committing state change");
            *self.inner.state.borrow_mut() = folded.clone();
            self.inner.pending_notify.set(true);
        }
        let result = match returned {
            Entry::Facade(f) => {
                if f.ptr_eq(root) {
                    folded
                } else {
                    snapshot(&Entry::Facade(f))
                }
            }
            Entry::Value(v) => v,
            literal => snapshot(&literal),
        };
        root.revoke();
        result
    }

    fn finish(&self) {
        let depth = self.inner.depth.get() - 1;
        self.inner.depth.set(depth);
        if depth == 0 && self.inner.pending_notify.replace(false) {
            let state = self.state();
            let listeners: Vec<Listener> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .map(|(_, l)| l.clone())
                .collect();
            trace!(listeners = listeners.len(), "notifying subscribers");
            for listener in listeners {
                listener(&state);
            }
        }
    }
}
