//! In-memory identity → token binding table.
//!
//! The table is the authority's only shared mutable state. Every operation
//! takes the lock once, so an enrollment overwrite and a delivery
//! lookup-and-compare never interleave: a delivery sees either the old or the
//! new token, never a partial value.
//!
//! Entries never expire. An optional capacity evicts the identity whose
//! binding is oldest when a new identity would exceed it.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;

use herald_core::{Identity, Token};
use tokio::sync::RwLock;

/// Result of a [`BindingTable::bind`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindReport {
    /// A previous token for the same identity was revoked.
    pub replaced: bool,
    /// Identity dropped to stay within capacity.
    pub evicted: Option<Identity>,
}

struct Entry {
    token: Token,
    /// Position in `Bindings::order`.
    seq: u64,
}

#[derive(Default)]
struct Bindings {
    entries: HashMap<Identity, Entry>,
    /// Binding sequence → identity, oldest first.
    order: BTreeMap<u64, Identity>,
    next_seq: u64,
}

/// Identity → token table owned by the authority.
pub struct BindingTable {
    inner: RwLock<Bindings>,
    capacity: Option<NonZeroUsize>,
}

impl BindingTable {
    /// Create an unbounded table.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    pub fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            inner: RwLock::new(Bindings::default()),
            capacity,
        }
    }

    /// Bind `identity` to `token`, revoking any previous token for it.
    pub async fn bind(&self, identity: Identity, token: Token) -> BindReport {
        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let previous = inner.entries.insert(identity.clone(), Entry { token, seq });
        if let Some(previous) = &previous {
            inner.order.remove(&previous.seq);
        }
        inner.order.insert(seq, identity);

        let mut evicted = None;
        if let Some(capacity) = self.capacity {
            if inner.entries.len() > capacity.get() {
                if let Some((_, oldest)) = inner.order.pop_first() {
                    inner.entries.remove(&oldest);
                    evicted = Some(oldest);
                }
            }
        }

        BindReport {
            replaced: previous.is_some(),
            evicted,
        }
    }

    /// Current token for `identity`, if it ever enrolled.
    pub async fn lookup(&self, identity: &Identity) -> Option<Token> {
        let inner = self.inner.read().await;
        inner.entries.get(identity).map(|e| e.token.clone())
    }

    /// Check a presented token against the bound one under a single lock.
    ///
    /// Unknown identities never verify, whatever token is presented.
    pub async fn verify(&self, identity: &Identity, presented: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(identity)
            .is_some_and(|e| e.token.matches(presented))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}
