// Listener table: event kind -> handlers, in registration order

use std::cell::RefCell;
use std::rc::Rc;

/// Identifies one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

struct Entry<H: ?Sized> {
    id: ListenerId,
    kind: String,
    handler: Rc<RefCell<H>>,
}

/// Registered handlers keyed by event kind
///
/// Handlers are reference counted so a dispatcher can hold them while the
/// table itself is being modified by a handler.
pub struct ListenerRegistry<H: ?Sized> {
    next_id: u64,
    entries: Vec<Entry<H>>,
}

impl<H: ?Sized> ListenerRegistry<H> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, kind: &str, handler: Rc<RefCell<H>>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(Entry {
            id,
            kind: kind.to_string(),
            handler,
        });
        id
    }

    /// Remove one listener, returning the kind it was registered for
    pub fn remove(&mut self, id: ListenerId) -> Option<String> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index).kind)
    }

    /// Remove every listener of `kind`, or all of them for `None`
    pub fn remove_kind(&mut self, kind: Option<&str>) -> Vec<(ListenerId, String)> {
        let (removed, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition::<Vec<_>, _>(|e| kind.map_or(true, |k| e.kind == k));
        self.entries = kept;
        removed.into_iter().map(|e| (e.id, e.kind)).collect()
    }

    /// Handlers registered for `kind`, in registration order
    pub fn matching(&self, kind: &str) -> Vec<(ListenerId, Rc<RefCell<H>>)> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (e.id, Rc::clone(&e.handler)))
            .collect()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: ?Sized> Default for ListenerRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
