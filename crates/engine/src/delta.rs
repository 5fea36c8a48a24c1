//! Planning a batch of remote records against the local mirror.
//!
//! Planning is pure: it turns a remote batch plus the existing
//! remote-id → local-id index into one write step per record. The reconcilers
//! then execute the steps concurrently.

use std::{collections::HashMap, hash::Hash};

use uuid::Uuid;

/// A record delivered by the remote ledger API.
pub(crate) trait RemoteRecord {
    type Key: Clone + Eq + Hash + ToString;

    fn remote_key(&self) -> Self::Key;

    fn is_deleted(&self) -> bool;
}

#[derive(Debug, PartialEq)]
pub(crate) enum Planned<R> {
    Insert(R),
    Update { local_id: Uuid, record: R },
    Delete { local_id: Uuid, record: R },
    /// Delete flag set for a record that was never mirrored.
    Skip(R),
}

impl<R: RemoteRecord> Planned<R> {
    pub(crate) fn record(&self) -> &R {
        match self {
            Self::Insert(record)
            | Self::Update { record, .. }
            | Self::Delete { record, .. }
            | Self::Skip(record) => record,
        }
    }
}

/// Plan the writes for one batch.
///
/// A remote id seen more than once in the batch keeps only its last
/// occurrence, so a batch never yields two inserts for the same record.
pub(crate) fn plan<R: RemoteRecord>(
    records: Vec<R>,
    index: &HashMap<R::Key, Uuid>,
) -> Vec<Planned<R>> {
    let mut latest: HashMap<R::Key, usize> = HashMap::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        latest.insert(record.remote_key(), position);
    }

    records
        .into_iter()
        .enumerate()
        .filter(|(position, record)| latest.get(&record.remote_key()) == Some(position))
        .map(|(_, record)| {
            let existing = index.get(&record.remote_key()).copied();
            match (record.is_deleted(), existing) {
                (true, Some(local_id)) => Planned::Delete { local_id, record },
                (true, None) => Planned::Skip(record),
                (false, Some(local_id)) => Planned::Update { local_id, record },
                (false, None) => Planned::Insert(record),
            }
        })
        .collect()
}

impl RemoteRecord for api_types::category::Category {
    type Key = Uuid;

    fn remote_key(&self) -> Uuid {
        self.id
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl RemoteRecord for api_types::account::Account {
    type Key = Uuid;

    fn remote_key(&self) -> Uuid {
        self.id
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl RemoteRecord for api_types::transaction::Transaction {
    type Key = String;

    fn remote_key(&self) -> String {
        self.id.clone()
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}
