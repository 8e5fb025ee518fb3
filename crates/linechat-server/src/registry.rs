//! Fixed-capacity connection registry.
//!
//! The registry is an arena of slots. A slot index doubles as the connection
//! identifier for as long as the connection lives; once it is removed the
//! slot is free and the next accepted connection may reuse it.
//!
//! # Invariants
//!
//! - Each live connection occupies exactly one slot.
//! - A free slot holds no transport handle.
//! - The number of live connections never exceeds the capacity; a full
//!   registry refuses new handles instead of queueing them.

use linechat_proto::{LineFramer, MAX_LINE_LEN, Nickname};

/// Index of a registry slot.
pub type SlotId = usize;

/// State of one peer connection.
///
/// Created unregistered on accept. A connection becomes registered once a
/// valid `NICK` is accepted, and is marked failed when a write or framing
/// error means it must be dropped on the next loop iteration.
#[derive(Debug)]
pub struct Connection<H> {
    /// Transport handle, owned exclusively by this entry
    handle: H,
    /// Accepted nickname; `Some` exactly when the connection is registered
    nickname: Option<Nickname>,
    /// Inbound bytes not yet resolved into a line
    framer: LineFramer,
    /// Set when the connection must be removed on the next reap
    failed: bool,
}

impl<H> Connection<H> {
    /// Create an unregistered connection.
    pub fn new(handle: H, line_capacity: usize) -> Self {
        Self { handle, nickname: None, framer: LineFramer::with_capacity(line_capacity), failed: false }
    }

    /// Whether the connection has an accepted nickname.
    pub fn is_registered(&self) -> bool {
        self.nickname.is_some()
    }

    /// Accepted nickname. `None` while unregistered.
    pub fn nickname(&self) -> Option<&Nickname> {
        self.nickname.as_ref()
    }

    /// Register (or rename) the connection, returning the previous nickname.
    pub fn register(&mut self, nickname: Nickname) -> Option<Nickname> {
        self.nickname.replace(nickname)
    }

    /// Transport handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Mutable transport handle.
    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Inbound line framer.
    pub fn framer_mut(&mut self) -> &mut LineFramer {
        &mut self.framer
    }

    /// Mark the connection for removal on the next reap.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Whether the connection is waiting to be reaped.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Consume the connection, returning its transport handle.
    pub fn into_handle(self) -> H {
        self.handle
    }
}

/// Arena of connection slots with a fixed maximum cardinality.
#[derive(Debug)]
pub struct ConnectionRegistry<H> {
    /// Slot index → connection, `None` for free slots
    slots: Vec<Option<Connection<H>>>,
    /// Inbound buffer capacity given to every new connection
    line_capacity: usize,
    /// Number of occupied slots
    live: usize,
}

impl<H> ConnectionRegistry<H> {
    /// Create a registry with `capacity` slots and the default line capacity.
    pub fn new(capacity: usize) -> Self {
        Self::with_line_capacity(capacity, MAX_LINE_LEN)
    }

    /// Create a registry with `capacity` slots whose connections buffer at
    /// most `line_capacity` bytes of an unterminated line.
    pub fn with_line_capacity(capacity: usize, line_capacity: usize) -> Self {
        Self { slots: (0..capacity).map(|_| None).collect(), line_capacity, live: 0 }
    }

    /// Place a handle in the first free slot.
    ///
    /// Returns the handle back if every slot is taken.
    pub fn insert(&mut self, handle: H) -> Result<SlotId, H> {
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            return Err(handle);
        };

        self.slots[slot] = Some(Connection::new(handle, self.line_capacity));
        self.live += 1;
        Ok(slot)
    }

    /// Free a slot, returning the connection that occupied it.
    ///
    /// Dropping the returned connection closes its transport handle.
    pub fn remove(&mut self, slot: SlotId) -> Option<Connection<H>> {
        let conn = self.slots.get_mut(slot)?.take()?;
        self.live -= 1;
        Some(conn)
    }

    /// Connection in `slot`. `None` if the slot is free or out of range.
    pub fn get(&self, slot: SlotId) -> Option<&Connection<H>> {
        self.slots.get(slot)?.as_ref()
    }

    /// Mutable connection in `slot`. `None` if the slot is free or out of
    /// range.
    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Connection<H>> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Check if a slot is occupied.
    pub fn contains(&self, slot: SlotId) -> bool {
        self.get(slot).is_some()
    }

    /// Live connections, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Connection<H>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| Some((slot, entry.as_ref()?)))
    }

    /// Mutable live connections, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut Connection<H>)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(slot, entry)| Some((slot, entry.as_mut()?)))
    }

    /// Slots whose connections are marked failed.
    pub fn failed_slots(&self) -> Vec<SlotId> {
        self.iter().filter(|(_, conn)| conn.is_failed()).map(|(slot, _)| slot).collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Check if every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Maximum number of live connections.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of registered connections.
    pub fn registered_count(&self) -> usize {
        self.iter().filter(|(_, conn)| conn.is_registered()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nick(name: &str) -> Nickname {
        Nickname::parse(name).unwrap()
    }

    #[test]
    fn insert_uses_first_free_slot() {
        let mut registry = ConnectionRegistry::new(4);

        assert_eq!(registry.insert("a"), Ok(0));
        assert_eq!(registry.insert("b"), Ok(1));
        assert_eq!(registry.insert("c"), Ok(2));

        registry.remove(1).unwrap();
        assert_eq!(registry.insert("d"), Ok(1));
        assert_eq!(*registry.get(1).unwrap().handle(), "d");
    }

    #[test]
    fn new_connection_is_unregistered() {
        let mut registry = ConnectionRegistry::new(1);
        let slot = registry.insert(()).unwrap();

        let conn = registry.get(slot).unwrap();
        assert!(!conn.is_registered());
        assert!(conn.nickname().is_none());
        assert!(!conn.is_failed());
    }

    #[test]
    fn full_registry_returns_handle() {
        let mut registry = ConnectionRegistry::new(2);

        registry.insert(1).unwrap();
        registry.insert(2).unwrap();

        assert!(registry.is_full());
        assert_eq!(registry.insert(3), Err(3));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_frees_slot() {
        let mut registry = ConnectionRegistry::new(2);
        let slot = registry.insert(7).unwrap();

        let conn = registry.remove(slot).unwrap();
        assert_eq!(conn.into_handle(), 7);
        assert!(!registry.contains(slot));
        assert!(registry.is_empty());

        assert!(registry.remove(slot).is_none());
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut registry: ConnectionRegistry<()> = ConnectionRegistry::new(1);
        assert!(registry.remove(5).is_none());
        assert!(registry.get(5).is_none());
    }

    #[test]
    fn register_and_rename() {
        let mut registry = ConnectionRegistry::new(1);
        let slot = registry.insert(()).unwrap();
        let conn = registry.get_mut(slot).unwrap();

        assert_eq!(conn.register(nick("alice")), None);
        assert!(conn.is_registered());
        assert_eq!(conn.register(nick("alicia")), Some(nick("alice")));
        assert_eq!(conn.nickname(), Some(&nick("alicia")));
    }

    #[test]
    fn registered_count_ignores_unregistered() {
        let mut registry = ConnectionRegistry::new(3);
        let a = registry.insert(()).unwrap();
        registry.insert(()).unwrap();
        let c = registry.insert(()).unwrap();

        registry.get_mut(a).unwrap().register(nick("a"));
        registry.get_mut(c).unwrap().register(nick("c"));

        assert_eq!(registry.registered_count(), 2);
    }

    #[test]
    fn failed_slots_are_listed() {
        let mut registry = ConnectionRegistry::new(3);
        registry.insert(()).unwrap();
        let b = registry.insert(()).unwrap();
        registry.insert(()).unwrap();

        registry.get_mut(b).unwrap().mark_failed();
        assert_eq!(registry.failed_slots(), vec![b]);
    }

    #[test]
    fn connections_get_configured_line_capacity() {
        let mut registry = ConnectionRegistry::with_line_capacity(1, 32);
        let slot = registry.insert(()).unwrap();

        assert_eq!(registry.get_mut(slot).unwrap().framer_mut().capacity(), 32);
    }
}
