use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::relay::peer::Peer;

#[derive(Default)]
struct Tables {
    /// Bound id -> owning connection. Keys are never zero.
    by_id: HashMap<u32, Arc<Peer>>,
    /// Every open connection, keyed by `conn_id`.
    all: HashMap<u64, Arc<Peer>>,
}

/// Client registry:
/// - `id -> Peer` for bound connections
/// - `conn_id -> Peer` for every open connection
///
/// Both tables sit behind one lock, so binds are check-and-insert atomic and
/// enumeration never observes a half-applied mutation. The lock is never held
/// across an `.await`.
pub struct Registry {
    tables: RwLock<Tables>,
    next_conn_id: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_conn_id: AtomicU64::new(1),
        }
    }

    // A panic while holding the lock cannot leave the maps half-updated
    // (every mutation is a single insert/remove), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn next_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add_connection(&self, peer: Arc<Peer>) {
        self.write().all.insert(peer.conn_id(), peer);
    }

    /// Drop a connection from the open set. Callers unregister its id
    /// separately if it was bound.
    pub fn remove_connection(&self, conn_id: u64) -> Option<Arc<Peer>> {
        self.write().all.remove(&conn_id)
    }

    /// Bind `id` to `peer`. First writer wins; zero is never accepted.
    pub fn register(&self, id: u32, peer: &Arc<Peer>) -> bool {
        if id == 0 {
            return false;
        }
        let mut t = self.write();
        if t.by_id.contains_key(&id) {
            return false;
        }
        t.by_id.insert(id, Arc::clone(peer));
        true
    }

    pub fn unregister(&self, id: u32) {
        self.write().by_id.remove(&id);
    }

    pub fn lookup(&self, id: u32) -> Option<Arc<Peer>> {
        self.read().by_id.get(&id).cloned()
    }

    /// Visit every open connection except `conn_id` under one read lock.
    pub fn for_each_except(&self, conn_id: u64, mut f: impl FnMut(&Arc<Peer>)) {
        let t = self.read();
        for (id, peer) in &t.all {
            if *id != conn_id {
                f(peer);
            }
        }
    }

    /// Snapshot of every open connection except `conn_id`.
    pub fn peers_except(&self, conn_id: u64) -> Vec<Arc<Peer>> {
        let mut out = Vec::new();
        self.for_each_except(conn_id, |p| out.push(Arc::clone(p)));
        out
    }

    pub fn connection_count(&self) -> usize {
        self.read().all.len()
    }

    pub fn bound_count(&self) -> usize {
        self.read().by_id.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn peer(reg: &Registry) -> Arc<Peer> {
        let addr = "127.0.0.1:9".parse().unwrap();
        Arc::new(Peer::new(reg.next_conn_id(), addr, tokio::io::sink()))
    }

    #[test]
    fn register_rejects_zero_and_conflicts() {
        let reg = Registry::new();
        let a = peer(&reg);
        let b = peer(&reg);

        assert!(!reg.register(0, &a));
        assert!(reg.register(7, &a));
        assert!(!reg.register(7, &b));
        assert_eq!(reg.lookup(7).unwrap().conn_id(), a.conn_id());
        assert_eq!(reg.bound_count(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = Registry::new();
        let a = peer(&reg);
        assert!(reg.register(7, &a));
        reg.unregister(7);
        reg.unregister(7);
        assert!(reg.lookup(7).is_none());

        let b = peer(&reg);
        assert!(reg.register(7, &b));
    }

    #[test]
    fn for_each_except_skips_the_caller() {
        let reg = Registry::new();
        let peers: Vec<_> = (0..4).map(|_| peer(&reg)).collect();
        for p in &peers {
            reg.add_connection(Arc::clone(p));
        }

        let sender = peers[2].conn_id();
        let mut seen: Vec<u64> = reg.peers_except(sender).iter().map(|p| p.conn_id()).collect();
        seen.sort_unstable();
        let mut want: Vec<u64> = peers
            .iter()
            .map(|p| p.conn_id())
            .filter(|id| *id != sender)
            .collect();
        want.sort_unstable();
        assert_eq!(seen, want);

        reg.remove_connection(peers[0].conn_id());
        assert_eq!(reg.peers_except(sender).len(), 2);
        assert_eq!(reg.connection_count(), 3);
    }

    #[test]
    fn concurrent_register_has_one_winner() {
        let reg = Arc::new(Registry::new());
        let peers: Vec<_> = (0..32).map(|_| peer(&reg)).collect();

        let wins = std::thread::scope(|s| {
            let handles: Vec<_> = peers
                .iter()
                .map(|p| {
                    let reg = Arc::clone(&reg);
                    s.spawn(move || reg.register(42, p))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });

        assert_eq!(wins, 1);
        assert_eq!(reg.bound_count(), 1);
    }
}
