//! Immutable-snapshot state engine with recording façades.
//!
//! `veil-state` hands you a façade over an existing value tree, lets you
//! apply ordinary mutations to it (assignment, deletion, nested mutation,
//! sequence reshaping), and at commit time produces a new immutable tree that
//! shares structure with the original wherever nothing changed.
//!
//! # Core Concepts
//!
//! - **Value**: settled, immutable data with `Arc`-shared containers
//! - **Facade**: a recording wrapper that intercepts reads and writes on a
//!   source container without mutating it
//! - **Patch**: a pending change against one source slot (a value, a façade,
//!   or a tombstone marking a deletion)
//! - **snapshot**: folds pending patches into a fresh tree with structural
//!   sharing, optionally rebased onto a foreign base
//! - **traverse**: cycle-safe enumeration of every façade reachable from a
//!   root
//! - **Store**: a single-writer controller owning the committed state, with
//!   re-entrant mutator application and subscriber fan-out
//!
//! # Quick Start
//!
//! ```
//! use veil_state::{snapshot, value, wrap, Entry, WrapOptions};
//!
//! let state = value!({"user": {"name": "Alice"}, "count": 1});
//! let facade = wrap(state.clone(), WrapOptions::default()).unwrap();
//!
//! facade.set("count", 2).unwrap();
//! let user = facade.get("user").unwrap().unwrap();
//! user.as_facade().unwrap().set("name", "Bob").unwrap();
//!
//! let next = snapshot(&Entry::Facade(facade));
//! assert_eq!(next["count"], 2);
//! assert_eq!(next["user"]["name"], "Bob");
//!
//! // The original tree is untouched.
//! assert_eq!(state["count"], 1);
//! assert_eq!(state["user"]["name"], "Alice");
//! ```
//!
//! No-op mutations cost nothing: a snapshot with no effective changes *is*
//! the original tree, by identity.
//!
//! ```
//! use veil_state::{snapshot, value, wrap, Entry, WrapOptions};
//!
//! let state = value!({"items": [1, 2, 3]});
//! let facade = wrap(state.clone(), WrapOptions::default()).unwrap();
//! let items = facade.get("items").unwrap().unwrap();
//! items.as_facade().unwrap().push(4).unwrap();
//! items.as_facade().unwrap().pop().unwrap();
//!
//! assert!(snapshot(&Entry::Facade(facade)).same(&state));
//! ```
//!
//! # Using a Store
//!
//! ```
//! use veil_state::{value, Entry, Store, Value, WrapOptions};
//!
//! let store = Store::new(value!({"count": 0}), WrapOptions::default()).unwrap();
//! let sub = store.subscribe(|state| {
//!     assert_eq!(state["count"], 1);
//! });
//!
//! store
//!     .apply(|state| {
//!         state.set("count", 1)?;
//!         Ok(Entry::Value(Value::Null))
//!     })
//!     .unwrap();
//!
//! assert_eq!(store.state()["count"], 1);
//! sub.unsubscribe();
//! ```
//!
//! # Concurrency model
//!
//! The engine is single-threaded and cooperative: façades, entries, and
//! stores are `Rc`-based and deliberately `!Send`, and there is no internal
//! locking. Settled [`Value`] trees are `Arc`-based and freely shareable.
//! Mutators may suspend only through [`Store::apply_async`]; the store's
//! re-entrancy counter spans the suspension.

mod entry;
mod error;
mod facade;
mod path;
mod snapshot;
mod store;
mod traverse;
mod value;

// Re-exported for macro expansion; not part of the public API.
#[doc(hidden)]
pub use serde_json;

pub use entry::{is_facade, is_recognized, source_of, Entry};
pub use error::{StateError, StateResult};
pub use facade::{wrap, Facade, Patch, WrapOptions};
pub use path::{Path, Seg};
pub use snapshot::{snapshot, snapshot_onto};
pub use store::{Store, Subscription};
pub use traverse::{traverse, Order, Visit};
pub use value::{type_name, Map, Value};
