//! Entity sinks: where imported records go.

use crate::entity::{Entity, EntityKind};
use crate::util::SinkError;

/// A store that accepts entities in bounded transactions.
///
/// The pipeline opens one transaction per chunk: `begin`, `append` for
/// each row, then `commit`. On cancellation or error the open transaction
/// is dropped with `discard`; committed transactions are never rolled back.
pub trait EntitySink: Send {
    /// Open a transaction for up to `rows` entities of `kind`.
    fn begin(&mut self, kind: EntityKind, rows: usize) -> Result<(), SinkError>;

    /// Stage one entity in the open transaction.
    fn append(&mut self, entity: Entity) -> Result<(), SinkError>;

    /// Make the staged entities durable.
    fn commit(&mut self) -> Result<(), SinkError>;

    /// Drop the open transaction, if any.
    fn discard(&mut self);
}

impl<S: EntitySink + ?Sized> EntitySink for &mut S {
    fn begin(&mut self, kind: EntityKind, rows: usize) -> Result<(), SinkError> {
        (**self).begin(kind, rows)
    }

    fn append(&mut self, entity: Entity) -> Result<(), SinkError> {
        (**self).append(entity)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        (**self).commit()
    }

    fn discard(&mut self) {
        (**self).discard()
    }
}

impl<S: EntitySink + ?Sized> EntitySink for Box<S> {
    fn begin(&mut self, kind: EntityKind, rows: usize) -> Result<(), SinkError> {
        (**self).begin(kind, rows)
    }

    fn append(&mut self, entity: Entity) -> Result<(), SinkError> {
        (**self).append(entity)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        (**self).commit()
    }

    fn discard(&mut self) {
        (**self).discard()
    }
}

/// In-memory entity store.
///
/// Committed rows are kept per kind in commit order, so the position of a
/// record equals its source row when the import ran to completion.
#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: [Vec<Entity>; 9],
    pending: Option<(EntityKind, Vec<Entity>)>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed records of `kind`.
    pub fn records(&self, kind: EntityKind) -> &[Entity] {
        &self.committed[kind.ordinal()]
    }

    /// Number of committed records of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.committed[kind.ordinal()].len()
    }

    /// Number of committed records of every kind.
    pub fn total(&self) -> usize {
        self.committed.iter().map(Vec::len).sum()
    }

    /// Number of committed transactions.
    #[inline]
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// True while a transaction is open.
    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// All committed records in import order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.committed.iter().flatten()
    }
}

impl EntitySink for MemoryStore {
    fn begin(&mut self, kind: EntityKind, rows: usize) -> Result<(), SinkError> {
        if let Some((open, _)) = &self.pending {
            return Err(SinkError::new(format!("transaction for {open} still open")));
        }
        self.pending = Some((kind, Vec::with_capacity(rows)));
        Ok(())
    }

    fn append(&mut self, entity: Entity) -> Result<(), SinkError> {
        let Some((kind, rows)) = &mut self.pending else {
            return Err(SinkError::new("append outside a transaction"));
        };
        if entity.kind() != *kind {
            return Err(SinkError::new(format!("{} appended to {kind} transaction", entity.kind())));
        }
        rows.push(entity);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        let (kind, rows) = self
            .pending
            .take()
            .ok_or_else(|| SinkError::new("commit outside a transaction"))?;
        self.committed[kind.ordinal()].extend(rows);
        self.commits += 1;
        Ok(())
    }

    fn discard(&mut self) {
        self.pending = None;
    }
}
