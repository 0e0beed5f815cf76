//! Iterative destruction of deeply nested values.
//!
//! A left-nested chain of 100 000 `flat_map`s, or a stream with 100 000
//! eagerly built cells, is a linked structure of the same depth. Dropping it
//! with the compiler-generated glue recurses once per link and overflows the
//! stack long before the interpreter would.
//!
//! Nodes that own the next link hand it to [`reclaim`] instead of letting it
//! drop in place. The first call on a thread becomes the drain loop; nested
//! calls made while a link is being dropped only enqueue, so the stack depth
//! of a drop stays constant.

use std::any::Any;
use std::cell::{Cell, RefCell};

thread_local! {
    static DRAINING: Cell<bool> = const { Cell::new(false) };
    static PENDING: RefCell<Vec<Box<dyn Any>>> = const { RefCell::new(Vec::new()) };
}

/// Drops `value`, deferring any reclamation it triggers to a loop.
pub(crate) fn reclaim<T: 'static>(value: T) {
    let nested = DRAINING.try_with(Cell::get).unwrap_or(true);

    if nested {
        // While thread-local storage is torn down `value` is dropped in place
        // instead, and that drop may recurse once per link.
        let _ = PENDING.try_with(move |pending| pending.borrow_mut().push(Box::new(value)));
        return;
    }

    DRAINING.with(|draining| draining.set(true));
    drop(value);

    loop {
        let next = PENDING.with(|pending| pending.borrow_mut().pop());
        match next {
            Some(item) => drop(item),
            None => break,
        }
    }

    DRAINING.with(|draining| draining.set(false));
}
