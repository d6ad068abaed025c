//! Single-threaded observable value cells.
//!
//! # Responsibility
//! - Hold one value and notify registered observers when it changes.
//!
//! # Invariants
//! - Observers run only when `set` stores a value different from the current one.
//! - Observers may call `set`, `observe` or `unobserve` on the same cell while
//!   being notified; nested changes notify after the current round completes.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};

/// Handle returned by `Observable::observe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

type Observer<T> = Box<dyn FnMut(&T)>;

/// Observable cell used for every view-facing value (property values, order arrays).
pub struct Observable<T> {
    value: RefCell<T>,
    observers: RefCell<BTreeMap<ObserverId, Observer<T>>>,
    removed_while_notifying: RefCell<BTreeSet<ObserverId>>,
    notifying: Cell<bool>,
    dirty: Cell<bool>,
    next_id: Cell<u64>,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            observers: RefCell::new(BTreeMap::new()),
            removed_while_notifying: RefCell::new(BTreeSet::new()),
            notifying: Cell::new(false),
            dirty: Cell::new(false),
            next_id: Cell::new(1),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Stores `value`; returns `true` (and notifies) only when it changed.
    pub fn set(&self, value: T) -> bool {
        if *self.value.borrow() == value {
            return false;
        }
        *self.value.borrow_mut() = value;
        self.notify();
        true
    }

    /// Registers `observer`, called with the new value after every change.
    pub fn observe(&self, observer: impl FnMut(&T) + 'static) -> ObserverId {
        let id = ObserverId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.observers.borrow_mut().insert(id, Box::new(observer));
        id
    }

    /// Removes one observer. Returns `false` when the id is unknown.
    pub fn unobserve(&self, id: ObserverId) -> bool {
        if self.observers.borrow_mut().remove(&id).is_some() {
            return true;
        }
        if self.notifying.get() && id.0 < self.next_id.get() {
            return self.removed_while_notifying.borrow_mut().insert(id);
        }
        false
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    fn notify(&self) {
        if self.notifying.get() {
            self.dirty.set(true);
            return;
        }
        self.notifying.set(true);
        loop {
            self.dirty.set(false);
            let snapshot = self.get();
            let mut active = std::mem::take(&mut *self.observers.borrow_mut());
            for (id, observer) in active.iter_mut() {
                if self.removed_while_notifying.borrow().contains(id) {
                    continue;
                }
                observer(&snapshot);
            }
            let removed = std::mem::take(&mut *self.removed_while_notifying.borrow_mut());
            active.retain(|id, _| !removed.contains(id));
            // Observers registered during this round were put into the emptied map.
            active.append(&mut self.observers.borrow_mut());
            *self.observers.borrow_mut() = active;
            if !self.dirty.get() {
                break;
            }
        }
        self.notifying.set(false);
    }
}

impl<T: Clone + PartialEq + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Debug> Debug for Observable<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value.borrow())
            .field("observers", &self.observers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Observable;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn observers_fire_only_on_change() {
        let cell = Observable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        cell.observe(move |value| sink.borrow_mut().push(*value));

        assert!(!cell.set(1));
        assert!(cell.set(2));
        assert!(cell.set(3));
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }

    #[test]
    fn unobserve_stops_notifications() {
        let cell = Observable::new(String::new());
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = cell.observe(move |_| *sink.borrow_mut() += 1);

        cell.set("a".to_string());
        assert!(cell.unobserve(id));
        cell.set("b".to_string());
        assert_eq!(*count.borrow(), 1);
        assert!(!cell.unobserve(id));
    }

    #[test]
    fn observer_can_set_same_cell_without_panicking() {
        let cell = Rc::new(Observable::new(0));
        let inner = Rc::clone(&cell);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        cell.observe(move |value| {
            sink.borrow_mut().push(*value);
            if *value < 3 {
                inner.set(*value + 1);
            }
        });

        cell.set(1);
        assert_eq!(cell.get(), 3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn observer_registered_during_notification_is_kept() {
        let cell = Rc::new(Observable::new(0));
        let inner = Rc::clone(&cell);
        let late_calls = Rc::new(RefCell::new(0));
        let late_sink = Rc::clone(&late_calls);
        let registered = RefCell::new(false);
        cell.observe(move |_| {
            if !*registered.borrow() {
                *registered.borrow_mut() = true;
                let sink = Rc::clone(&late_sink);
                inner.observe(move |_| *sink.borrow_mut() += 1);
            }
        });

        cell.set(1);
        cell.set(2);
        assert_eq!(cell.observer_count(), 2);
        assert_eq!(*late_calls.borrow(), 1);
    }
}
