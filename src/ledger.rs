// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Thread-safe credit ledger with reference uniqueness.
//!
//! Records are keyed by reference; inserting a reference that is already
//! present is reported as a conflict so reference allocation can retry.
//! Commit order is kept in a journal for reporting.

use crate::base::Reference;
use crate::credit::CreditRecord;
use crate::error::PersistError;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory store of credit records.
///
/// Combines a [`DashMap`] for atomic check-and-insert on the reference with a
/// [`SegQueue`] recording commit order.
#[derive(Debug)]
pub struct CreditLedger {
    records: DashMap<Reference, Arc<CreditRecord>>,
    journal: SegQueue<Reference>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            journal: SegQueue::new(),
        }
    }

    /// Stores a record under its reference.
    ///
    /// # Errors
    ///
    /// [`PersistError::Conflict`] if the reference is already taken; the
    /// existing record is left untouched.
    pub fn insert(&self, record: Arc<CreditRecord>) -> Result<(), PersistError> {
        let reference = record.reference;

        match self.records.entry(reference) {
            Entry::Occupied(_) => Err(PersistError::Conflict),
            Entry::Vacant(entry) => {
                entry.insert(record);
                self.journal.push(reference);
                Ok(())
            }
        }
    }

    pub fn get(&self, reference: &Reference) -> Option<Arc<CreditRecord>> {
        self.records.get(reference).map(|record| Arc::clone(&record))
    }

    /// Records credited to `member_id`, in no particular order.
    pub fn for_member(&self, member_id: &str) -> Vec<Arc<CreditRecord>> {
        self.records
            .iter()
            .filter(|record| record.member_id == member_id)
            .map(|record| Arc::clone(record.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes and returns journal entries committed since the last drain, in
    /// commit order. Records stay in the ledger.
    pub fn drain_journal(&self) -> Vec<Arc<CreditRecord>> {
        std::iter::from_fn(|| self.journal.pop())
            .filter_map(|reference| self.get(&reference))
            .collect()
    }
}

impl Default for CreditLedger {
    fn default() -> Self {
        Self::new()
    }
}
