#![forbid(unsafe_code)]

//! Single-slot delegate hooks.
//!
//! A hook is taken out of its slot for the duration of a call, so it may
//! re-enter the map (and even replace or remove itself) without a borrow
//! conflict. Each install gets a generation number; removal and restore only
//! act on the generation they belong to.

use std::cell::{Cell, RefCell};

pub(crate) struct HookSlot<F: ?Sized> {
    generation: Cell<u64>,
    hook: RefCell<Option<Box<F>>>,
}

impl<F: ?Sized> HookSlot<F> {
    pub(crate) fn new() -> Self {
        Self {
            generation: Cell::new(0),
            hook: RefCell::new(None),
        }
    }

    /// Replace the current hook. Returns the generation of `hook`.
    pub(crate) fn install(&self, hook: Box<F>) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let previous = self.hook.borrow_mut().replace(hook);
        drop(previous);
        generation
    }

    /// Remove the hook if it is still generation `generation`.
    pub(crate) fn remove(&self, generation: u64) -> bool {
        if self.generation.get() != generation {
            return false;
        }
        self.generation.set(generation + 1);
        let removed = self.hook.borrow_mut().take();
        drop(removed);
        true
    }

    /// Run `f` with the installed hook; `None` when there is none.
    pub(crate) fn call<R>(&self, f: impl FnOnce(&mut F) -> R) -> Option<R> {
        let generation = self.generation.get();
        let mut hook = self.hook.borrow_mut().take()?;
        let result = f(&mut hook);
        if self.generation.get() == generation {
            *self.hook.borrow_mut() = Some(hook);
        }
        Some(result)
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.hook.borrow().is_some()
    }
}
