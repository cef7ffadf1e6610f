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

//! Reference allocation integration tests.

use loyalty_engine_rs::{
    DEFAULT_MAX_ATTEMPTS, EngineError, PersistError, Reference, allocate, allocate_reference,
};
use std::collections::HashSet;

#[test]
fn succeeds_on_last_attempt() {
    let mut generated = Vec::new();
    let mut attempts = 0;

    let result = allocate(
        5,
        || {
            let reference = Reference::generate();
            generated.push(reference);
            reference
        },
        |_| {
            attempts += 1;
            if attempts < 5 { Err(PersistError::Conflict) } else { Ok(()) }
        },
    );

    assert_eq!(generated.len(), 5);
    assert_eq!(result, Ok(generated[4]));
}

#[test]
fn always_conflicting_store_exhausts_retries() {
    let mut generated = 0;

    let result = allocate(
        5,
        || {
            generated += 1;
            Reference::generate()
        },
        |_| Err(PersistError::Conflict),
    );

    assert_eq!(result, Err(EngineError::ExhaustedRetries { attempts: 5 }));
    assert_eq!(generated, 5);
}

#[test]
fn each_attempt_gets_a_fresh_reference() {
    let mut seen = Vec::new();

    let _ = allocate_reference(DEFAULT_MAX_ATTEMPTS, |reference| {
        seen.push(reference);
        Err(PersistError::Conflict)
    });

    assert_eq!(seen.len(), DEFAULT_MAX_ATTEMPTS as usize);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), seen.len());
}

#[test]
fn persisted_reference_is_returned() {
    let mut stored = None;

    let reference = allocate_reference(DEFAULT_MAX_ATTEMPTS, |reference| {
        stored = Some(reference);
        Ok(())
    })
    .unwrap();

    assert_eq!(stored, Some(reference));
}

#[test]
fn collisions_with_taken_references_are_retried() {
    let taken = Reference::generate();
    let fresh = Reference::generate();
    let mut queue = vec![fresh, taken, taken];

    let result = allocate(
        DEFAULT_MAX_ATTEMPTS,
        || queue.pop().unwrap_or_else(Reference::generate),
        |reference| {
            if reference == taken { Err(PersistError::Conflict) } else { Ok(()) }
        },
    );

    assert_eq!(result, Ok(fresh));
}
