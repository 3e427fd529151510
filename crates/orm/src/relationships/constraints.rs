//! Relation constraint scope
//!
//! Relations add their lazy-load constraints (`foreign_key = parent key`)
//! when constructed. Eager loading builds relations from a template model and
//! adds batched constraints itself, so it constructs them inside
//! [`no_constraints`].

use std::cell::Cell;

thread_local! {
    static CONSTRAINTS_ENABLED: Cell<bool> = const { Cell::new(true) };
}

struct RestoreConstraints(bool);

impl Drop for RestoreConstraints {
    fn drop(&mut self) {
        CONSTRAINTS_ENABLED.with(|enabled| enabled.set(self.0));
    }
}

/// Run `f` with relation constraints disabled on this thread
pub fn no_constraints<T>(f: impl FnOnce() -> T) -> T {
    let previous = CONSTRAINTS_ENABLED.with(|enabled| enabled.replace(false));
    let _restore = RestoreConstraints(previous);
    f()
}

/// Whether relations constructed now should add their own constraints
pub fn constraints_enabled() -> bool {
    CONSTRAINTS_ENABLED.with(Cell::get)
}
