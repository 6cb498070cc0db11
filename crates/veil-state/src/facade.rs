//! The recording façade: a handle over a source container that records
//! writes without ever mutating the source.
//!
//! A façade pairs an immutable source container with lazily allocated
//! bookkeeping: a patch table holding pending writes and a per-slot cache of
//! child façades. Reads consult patches first and fall through to the source,
//! wrapping recognized containers on the way out; writes land in the patch
//! table unless they would restore the slot to what the source already holds.
//!
//! For sequence sources the patch table is itself a sparse sequence whose
//! length *is* the effective length: indexed writes land in natural slots,
//! and shrinking the length purges any patches at truncated indices. This is
//! what makes `push(x)` followed by `pop()` produce an empty patch set.

use crate::value::type_name;
use crate::{Entry, Path, Seg, StateError, StateResult, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Options controlling façade behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WrapOptions {
    /// When enabled, a write that restores a slot to the value the source
    /// already holds records no change (and removes any prior patch). This is
    /// what makes scramble-then-unscramble mutation sequences leave the patch
    /// table empty.
    pub reference_check: bool,
}

impl WrapOptions {
    /// Options with `reference_check` enabled.
    #[inline]
    pub fn reference_checked() -> Self {
        Self {
            reference_check: true,
        }
    }
}

/// A pending change recorded against a single source slot.
#[derive(Clone, Debug)]
pub enum Patch {
    /// The slot holds a replacement entry.
    Entry(Entry),
    /// The slot was deleted from the source.
    Tombstone,
}

impl Patch {
    /// Returns true if this patch marks a deletion.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Patch::Tombstone)
    }

    /// Get the replacement entry, if any.
    #[inline]
    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            Patch::Entry(e) => Some(e),
            Patch::Tombstone => None,
        }
    }
}

/// Pending-patch table, shaped after the source kind.
#[derive(Clone, Debug)]
pub(crate) enum Patches {
    /// Keyed patches for a record source, in write order.
    Record(IndexMap<String, Patch>),
    /// Sparse patches for a sequence source. `slots.len()` is the effective
    /// sequence length; `None` slots fall through to the source.
    Sequence { slots: Vec<Option<Patch>> },
}

struct Inner {
    source: Value,
    patches: Option<Patches>,
    children: Option<HashMap<Seg, Facade>>,
    origin: Weak<RefCell<Inner>>,
    options: WrapOptions,
    revoked: bool,
}

impl Inner {
    fn is_sequence(&self) -> bool {
        self.source.is_array()
    }

    fn source_len(&self) -> usize {
        self.source.as_array().map_or(0, Vec::len)
    }

    fn effective_len(&self) -> usize {
        match &self.patches {
            Some(Patches::Sequence { slots }) => slots.len(),
            _ => self.source_len(),
        }
    }

    fn source_get(&self, key: &Seg) -> Option<Value> {
        self.source.get(key).cloned()
    }

    fn sequence_slots(&mut self) -> &mut Vec<Option<Patch>> {
        let source_len = self.source_len();
        match self
            .patches
            .get_or_insert_with(|| Patches::Sequence {
                slots: vec![None; source_len],
            }) {
            Patches::Sequence { slots } => slots,
            Patches::Record(_) => unreachable!("sequence facade carries a record patch table"),
        }
    }

    fn record_slots(&mut self) -> &mut IndexMap<String, Patch> {
        match self
            .patches
            .get_or_insert_with(|| Patches::Record(IndexMap::new()))
        {
            Patches::Record(map) => map,
            Patches::Sequence { .. } => {
                unreachable!("record facade carries a sequence patch table")
            }
        }
    }

    fn set_patch(&mut self, key: Seg, patch: Patch) -> StateResult<()> {
        let sequence = self.source.is_array();
        let record = self.source.is_object();
        match key {
            Seg::Index(i) if sequence => {
                let slots = self.sequence_slots();
                if i >= slots.len() {
                    slots.resize_with(i + 1, || None);
                }
                slots[i] = Some(patch);
                Ok(())
            }
            Seg::Key(k) if record => {
                self.record_slots().insert(k, patch);
                Ok(())
            }
            Seg::Key(_) if sequence => Err(StateError::unsupported(
                "sequence facades are keyed by indices",
            )),
            Seg::Index(_) if record => Err(StateError::unsupported(
                "record facades are keyed by strings",
            )),
            _ => Err(StateError::invariant("facade source is not a container")),
        }
    }

    fn clear_patch(&mut self, key: &Seg) {
        match (&mut self.patches, key) {
            (Some(Patches::Sequence { slots }), Seg::Index(i)) => {
                if *i < slots.len() {
                    slots[*i] = None;
                }
            }
            (Some(Patches::Record(map)), Seg::Key(k)) => {
                map.shift_remove(k.as_str());
            }
            _ => {}
        }
    }

    /// Own keys: source keys first, then patch-only keys, minus tombstones.
    /// Sequences never enumerate their length.
    fn own_keys(&self) -> Vec<Seg> {
        match &self.source {
            Value::Object(map) => {
                let record = match &self.patches {
                    Some(Patches::Record(table)) => Some(table),
                    _ => None,
                };
                let mut keys = Vec::new();
                for k in map.keys() {
                    let tombstoned = record
                        .and_then(|t| t.get(k.as_str()))
                        .is_some_and(Patch::is_tombstone);
                    if !tombstoned {
                        keys.push(Seg::Key(k.clone()));
                    }
                }
                if let Some(table) = record {
                    for (k, patch) in table {
                        if !map.contains_key(k.as_str()) && !patch.is_tombstone() {
                            keys.push(Seg::Key(k.clone()));
                        }
                    }
                }
                keys
            }
            Value::Array(items) => {
                let source_len = items.len();
                match &self.patches {
                    Some(Patches::Sequence { slots }) => (0..slots.len())
                        .filter(|&i| match &slots[i] {
                            Some(Patch::Tombstone) => false,
                            Some(Patch::Entry(_)) => true,
                            None => i < source_len,
                        })
                        .map(Seg::Index)
                        .collect(),
                    _ => (0..source_len).map(Seg::Index).collect(),
                }
            }
            _ => Vec::new(),
        }
    }
}

/// A recording façade over a source container.
///
/// Cloning a `Facade` clones the handle; both handles observe the same
/// bookkeeping. The source itself is never mutated; pending changes live in
/// the façade until the snapshot engine folds them into a fresh tree.
///
/// # Examples
///
/// ```
/// use veil_state::{value, wrap, WrapOptions};
///
/// let state = value!({"user": {"name": "Alice"}});
/// let facade = wrap(state.clone(), WrapOptions::default()).unwrap();
///
/// let user = facade.get("user").unwrap().unwrap();
/// user.as_facade().unwrap().set("name", "Bob").unwrap();
///
/// // The source is untouched; the write is pending in the facade.
/// assert_eq!(state["user"]["name"], "Alice");
/// ```
#[derive(Clone)]
pub struct Facade {
    inner: Rc<RefCell<Inner>>,
}

/// Create a root façade over a container value.
///
/// Wrapping an existing façade returns it unchanged. Leaves and literal
/// containers (which may hold façades) cannot be wrapped.
pub fn wrap(value: impl Into<Entry>, options: WrapOptions) -> StateResult<Facade> {
    match value.into() {
        Entry::Facade(facade) => Ok(facade),
        Entry::Value(v) if v.is_container() => Ok(Facade::root(v, options)),
        Entry::Value(v) => Err(StateError::unsupported(format!(
            "wrap requires a container value, found {}",
            type_name(&v)
        ))),
        Entry::Array(_) | Entry::Object(_) => Err(StateError::unsupported(
            "wrap requires a settled container; snapshot the literal first",
        )),
    }
}

impl Facade {
    pub(crate) fn root(source: Value, options: WrapOptions) -> Facade {
        debug_assert!(source.is_container());
        let inner = Rc::new_cyclic(|origin: &Weak<RefCell<Inner>>| {
            RefCell::new(Inner {
                source,
                patches: None,
                children: None,
                origin: origin.clone(),
                options,
                revoked: false,
            })
        });
        Facade { inner }
    }

    fn child_of(parent: &Inner, source: Value) -> Facade {
        Facade {
            inner: Rc::new(RefCell::new(Inner {
                source,
                patches: None,
                children: None,
                origin: parent.origin.clone(),
                options: parent.options,
                revoked: false,
            })),
        }
    }

    fn guard(&self) -> StateResult<()> {
        if self.is_revoked() {
            return Err(StateError::unsupported("facade has been revoked"));
        }
        Ok(())
    }

    /// Read a slot.
    ///
    /// Patches are consulted first (a tombstone reads as absent); otherwise
    /// the source slot is returned, wrapped in a lazily created child façade
    /// when it holds a recognized container. Each slot owns its child façade:
    /// the same underlying container reached through two different slots
    /// yields two distinct façades, while re-reading one slot yields the
    /// cached one.
    pub fn get(&self, key: impl Into<Seg>) -> StateResult<Option<Entry>> {
        self.guard()?;
        let key = key.into();
        let mut inner = self.inner.borrow_mut();

        match (&inner.patches, &key) {
            (Some(Patches::Sequence { slots }), Seg::Index(i)) => {
                if *i >= slots.len() {
                    return Ok(None);
                }
                match &slots[*i] {
                    Some(Patch::Tombstone) => return Ok(None),
                    Some(Patch::Entry(entry)) => return Ok(Some(entry.clone())),
                    None => {}
                }
            }
            (Some(Patches::Record(table)), Seg::Key(k)) => match table.get(k.as_str()) {
                Some(Patch::Tombstone) => return Ok(None),
                Some(Patch::Entry(entry)) => return Ok(Some(entry.clone())),
                None => {}
            },
            _ => {}
        }

        let Some(v) = inner.source_get(&key) else {
            return Ok(None);
        };
        if !v.is_container() {
            return Ok(Some(Entry::Value(v)));
        }
        if let Some(child) = inner.children.as_ref().and_then(|c| c.get(&key)) {
            if child.source().same(&v) {
                return Ok(Some(Entry::Facade(child.clone())));
            }
        }
        let child = Facade::child_of(&inner, v);
        inner
            .children
            .get_or_insert_with(HashMap::new)
            .insert(key, child.clone());
        Ok(Some(Entry::Facade(child)))
    }

    /// Write a slot.
    ///
    /// Writing back the child façade that was read from the same slot, or
    /// (under `reference_check`) a value identical to what the source holds,
    /// records no change and removes any prior patch.
    pub fn set(&self, key: impl Into<Seg>, value: impl Into<Entry>) -> StateResult<()> {
        self.guard()?;
        let key = key.into();
        let value = value.into();
        let mut inner = self.inner.borrow_mut();

        if let Entry::Facade(facade) = &value {
            let round_trip = inner
                .children
                .as_ref()
                .and_then(|c| c.get(&key))
                .is_some_and(|child| child.ptr_eq(facade));
            if round_trip {
                inner.clear_patch(&key);
                return Ok(());
            }
        }
        if inner.options.reference_check {
            if let Entry::Value(v) = &value {
                if inner.source_get(&key).is_some_and(|sv| sv.same(v)) {
                    inner.clear_patch(&key);
                    return Ok(());
                }
            }
        }
        inner.set_patch(key, Patch::Entry(value))
    }

    /// Delete a slot.
    ///
    /// Deleting a key the source never had clears any pending patch without
    /// recording a tombstone. String-key deletion on a sequence façade fails:
    /// sequence attributes such as the length are not configurable.
    pub fn delete(&self, key: impl Into<Seg>) -> StateResult<()> {
        self.guard()?;
        let key = key.into();
        let mut inner = self.inner.borrow_mut();

        match (&inner.source, &key) {
            (Value::Array(_), Seg::Key(_)) => {
                return Err(StateError::unsupported(
                    "cannot delete intrinsic sequence attributes",
                ));
            }
            (Value::Object(_), Seg::Index(_)) => {
                return Err(StateError::unsupported(
                    "record facades are keyed by strings",
                ));
            }
            _ => {}
        }
        if inner.source_get(&key).is_none() {
            inner.clear_patch(&key);
            return Ok(());
        }
        inner.set_patch(key, Patch::Tombstone)
    }

    /// Test slot presence: patches first, then the source.
    pub fn has(&self, key: impl Into<Seg>) -> StateResult<bool> {
        self.guard()?;
        let key = key.into();
        let inner = self.inner.borrow();

        match (&inner.patches, &key) {
            (Some(Patches::Sequence { slots }), Seg::Index(i)) => {
                if *i >= slots.len() {
                    return Ok(false);
                }
                match &slots[*i] {
                    Some(patch) => return Ok(!patch.is_tombstone()),
                    None => {}
                }
            }
            (Some(Patches::Record(table)), Seg::Key(k)) => {
                if let Some(patch) = table.get(k.as_str()) {
                    return Ok(!patch.is_tombstone());
                }
            }
            _ => {}
        }
        Ok(inner.source.get(&key).is_some())
    }

    /// Enumerate own keys: source keys first, then patch-added keys, minus
    /// deleted ones. Insertion order is preserved; updates do not reorder.
    pub fn keys(&self) -> StateResult<Vec<Seg>> {
        self.guard()?;
        Ok(self.inner.borrow().own_keys())
    }

    /// The effective length for a sequence façade, the own-key count for a
    /// record façade.
    pub fn len(&self) -> StateResult<usize> {
        self.guard()?;
        let inner = self.inner.borrow();
        if inner.is_sequence() {
            Ok(inner.effective_len())
        } else {
            Ok(inner.own_keys().len())
        }
    }

    /// Returns true if the façade has no own keys.
    pub fn is_empty(&self) -> StateResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Walk a path through nested façades.
    ///
    /// Intermediate reads materialize child façades exactly as single-step
    /// reads do; a missing step yields `None`.
    pub fn get_at(&self, path: &Path) -> StateResult<Option<Entry>> {
        let mut current = Entry::Facade(self.clone());
        for seg in path.segments() {
            let next = match &current {
                Entry::Facade(f) => f.get(seg)?,
                Entry::Value(v) => v.get(seg).cloned().map(Entry::Value),
                Entry::Array(items) => match seg {
                    Seg::Index(i) => items.get(*i).cloned(),
                    Seg::Key(_) => None,
                },
                Entry::Object(map) => match seg {
                    Seg::Key(k) => map.get(k.as_str()).cloned(),
                    Seg::Index(_) => None,
                },
            };
            match next {
                Some(entry) => current = entry,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    // ===== Sequence reshaping =====
    //
    // Reshaping is not primitive: each helper is a series of index reads and
    // writes plus a final length assignment, so the no-change rules above see
    // every intermediate step.

    fn require_sequence_len(&self) -> StateResult<usize> {
        self.guard()?;
        let inner = self.inner.borrow();
        if !inner.is_sequence() {
            return Err(StateError::unsupported(
                "sequence operation on a record facade",
            ));
        }
        Ok(inner.effective_len())
    }

    /// Set the effective length of a sequence façade.
    ///
    /// Shrinking purges patches at truncated indices; growing leaves holes
    /// that read as absent and snapshot as `Null`.
    pub fn set_len(&self, new_len: usize) -> StateResult<()> {
        self.require_sequence_len()?;
        let mut inner = self.inner.borrow_mut();
        let slots = inner.sequence_slots();
        if new_len < slots.len() {
            slots.truncate(new_len);
        } else {
            slots.resize_with(new_len, || None);
        }
        Ok(())
    }

    /// Shrink a sequence façade to `new_len`; growth requests are ignored.
    pub fn truncate(&self, new_len: usize) -> StateResult<()> {
        if new_len < self.require_sequence_len()? {
            self.set_len(new_len)?;
        }
        Ok(())
    }

    /// Append a value to a sequence façade.
    pub fn push(&self, value: impl Into<Entry>) -> StateResult<()> {
        let len = self.require_sequence_len()?;
        self.set(len, value)?;
        self.set_len(len + 1)
    }

    /// Remove and return the last element of a sequence façade.
    pub fn pop(&self) -> StateResult<Option<Entry>> {
        let len = self.require_sequence_len()?;
        if len == 0 {
            return Ok(None);
        }
        let last = self.get(len - 1)?;
        self.set_len(len - 1)?;
        Ok(last)
    }

    /// Remove and return the first element of a sequence façade.
    pub fn shift(&self) -> StateResult<Option<Entry>> {
        let len = self.require_sequence_len()?;
        if len == 0 {
            return Ok(None);
        }
        let first = self.get(0)?;
        for i in 1..len {
            let v = self.get(i)?.unwrap_or(Entry::Value(Value::Null));
            self.set(i - 1, v)?;
        }
        self.set_len(len - 1)?;
        Ok(first)
    }

    /// Prepend values to a sequence façade.
    pub fn unshift(&self, values: Vec<Entry>) -> StateResult<()> {
        let len = self.require_sequence_len()?;
        let n = values.len();
        if n == 0 {
            return Ok(());
        }
        for i in (0..len).rev() {
            let v = self.get(i)?.unwrap_or(Entry::Value(Value::Null));
            self.set(i + n, v)?;
        }
        for (j, value) in values.into_iter().enumerate() {
            self.set(j, value)?;
        }
        self.set_len(len + n)
    }

    /// Remove `delete_count` elements at `start`, inserting `items` in their
    /// place. Returns the removed elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: Vec<Entry>,
    ) -> StateResult<Vec<Entry>> {
        let len = self.require_sequence_len()?;
        let start = start.min(len);
        let delete_count = delete_count.min(len - start);

        let mut removed = Vec::with_capacity(delete_count);
        for i in 0..delete_count {
            removed.push(
                self.get(start + i)?
                    .unwrap_or(Entry::Value(Value::Null)),
            );
        }

        let inserted = items.len();
        if inserted < delete_count {
            let shrink = delete_count - inserted;
            for i in start + delete_count..len {
                let v = self.get(i)?.unwrap_or(Entry::Value(Value::Null));
                self.set(i - shrink, v)?;
            }
        } else if inserted > delete_count {
            let grow = inserted - delete_count;
            for i in (start + delete_count..len).rev() {
                let v = self.get(i)?.unwrap_or(Entry::Value(Value::Null));
                self.set(i + grow, v)?;
            }
        }
        for (j, item) in items.into_iter().enumerate() {
            self.set(start + j, item)?;
        }
        self.set_len(len - delete_count + inserted)?;
        Ok(removed)
    }

    // ===== Introspection =====

    /// The underlying source container.
    pub fn source(&self) -> Value {
        self.inner.borrow().source.clone()
    }

    /// The options this façade was created with.
    pub fn options(&self) -> WrapOptions {
        self.inner.borrow().options
    }

    /// Returns true if the source is a sequence container.
    pub fn is_sequence(&self) -> bool {
        self.inner.borrow().is_sequence()
    }

    /// Returns true if the source is a record container.
    pub fn is_record(&self) -> bool {
        self.inner.borrow().source.is_object()
    }

    /// Handle identity.
    #[inline]
    pub fn ptr_eq(&self, other: &Facade) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns true if any patch is recorded, counting a changed sequence
    /// length as a patch.
    pub fn has_patches(&self) -> bool {
        let inner = self.inner.borrow();
        match &inner.patches {
            None => false,
            Some(Patches::Record(table)) => !table.is_empty(),
            Some(Patches::Sequence { slots }) => {
                slots.iter().any(Option::is_some) || slots.len() != inner.source_len()
            }
        }
    }

    /// The number of recorded slot patches, counting a changed sequence
    /// length as one.
    pub fn patch_count(&self) -> usize {
        let inner = self.inner.borrow();
        match &inner.patches {
            None => 0,
            Some(Patches::Record(table)) => table.len(),
            Some(Patches::Sequence { slots }) => {
                let changed_len = usize::from(slots.len() != inner.source_len());
                slots.iter().filter(|s| s.is_some()).count() + changed_len
            }
        }
    }

    /// The pending patch recorded at `key`, if any.
    pub fn patch(&self, key: impl Into<Seg>) -> Option<Patch> {
        let key = key.into();
        let inner = self.inner.borrow();
        match (&inner.patches, &key) {
            (Some(Patches::Sequence { slots }), Seg::Index(i)) => {
                slots.get(*i).and_then(Clone::clone)
            }
            (Some(Patches::Record(table)), Seg::Key(k)) => table.get(k.as_str()).cloned(),
            _ => None,
        }
    }

    /// Discard the bookkeeping and deny further access.
    ///
    /// Revoking a root façade revokes every child derived from it. This is a
    /// correctness aid for callers that have already materialized a snapshot,
    /// not a safety requirement.
    pub fn revoke(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.revoked = true;
        inner.patches = None;
        inner.children = None;
    }

    /// Returns true if this façade, or the root it was derived from, has been
    /// revoked.
    pub fn is_revoked(&self) -> bool {
        let inner = self.inner.borrow();
        if inner.revoked {
            return true;
        }
        match inner.origin.upgrade() {
            Some(origin) if !Rc::ptr_eq(&origin, &self.inner) => origin.borrow().revoked,
            _ => false,
        }
    }

    // ===== Engine internals =====

    /// Source, cloned patch table, and child façades, read in one borrow.
    pub(crate) fn parts(&self) -> (Value, Option<Patches>, Vec<(Seg, Facade)>) {
        let inner = self.inner.borrow();
        let children = inner
            .children
            .as_ref()
            .map(|c| c.iter().map(|(k, f)| (k.clone(), f.clone())).collect())
            .unwrap_or_default();
        (inner.source.clone(), inner.patches.clone(), children)
    }

    /// Edges to descend into, in own-key order: a recognized patch wins over
    /// the cached child façade for the same slot.
    pub(crate) fn edges(&self) -> Vec<(Seg, Entry)> {
        let inner = self.inner.borrow();
        let mut edges = Vec::new();
        for key in inner.own_keys() {
            let patched = match (&inner.patches, &key) {
                (Some(Patches::Sequence { slots }), Seg::Index(i)) => {
                    slots.get(*i).and_then(Option::as_ref)
                }
                (Some(Patches::Record(table)), Seg::Key(k)) => table.get(k.as_str()),
                _ => None,
            };
            match patched {
                Some(Patch::Entry(entry)) => {
                    if entry.is_recognized() {
                        edges.push((key, entry.clone()));
                    }
                }
                Some(Patch::Tombstone) => {}
                None => {
                    if let Some(child) = inner.children.as_ref().and_then(|c| c.get(&key)) {
                        edges.push((key, Entry::Facade(child.clone())));
                    }
                }
            }
        }
        edges
    }
}

impl fmt::Debug for Facade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Facade")
                .field("kind", &type_name(&inner.source))
                .field("patched", &inner.patches.is_some())
                .field("revoked", &inner.revoked)
                .finish(),
            Err(_) => f.write_str("Facade { <borrowed> }"),
        }
    }
}
