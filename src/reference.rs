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

//! Reference allocation with bounded retry.
//!
//! A fresh reference is generated for every attempt and handed to a
//! persistence callback. A uniqueness conflict discards the attempt and
//! retries; success returns the reference that was stored. There is no delay
//! between attempts.

use crate::base::Reference;
use crate::error::{EngineError, PersistError};

/// Attempts made before giving up on a transaction.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Persists a record under a unique reference.
///
/// `generate` is called once per attempt, at most `max_attempts` times.
///
/// # Errors
///
/// - [`EngineError::ExhaustedRetries`] - every attempt reported
///   [`PersistError::Conflict`].
/// - [`EngineError::Persistence`] - the store failed for another reason; no
///   further attempts are made.
pub fn allocate<G, P>(max_attempts: u32, mut generate: G, mut persist: P) -> Result<Reference, EngineError>
where
    G: FnMut() -> Reference,
    P: FnMut(Reference) -> Result<(), PersistError>,
{
    for attempt in 1..=max_attempts {
        let reference = generate();
        match persist(reference) {
            Ok(()) => return Ok(reference),
            Err(PersistError::Conflict) => {
                tracing::warn!(attempt, %reference, "reference already in use, retrying");
            }
            Err(PersistError::Unavailable(reason)) => {
                return Err(EngineError::Persistence(reason));
            }
        }
    }

    tracing::error!(attempts = max_attempts, "reference allocation exhausted");
    Err(EngineError::ExhaustedRetries {
        attempts: max_attempts,
    })
}

/// [`allocate`] with random v4 references.
pub fn allocate_reference<P>(max_attempts: u32, persist: P) -> Result<Reference, EngineError>
where
    P: FnMut(Reference) -> Result<(), PersistError>,
{
    allocate(max_attempts, Reference::generate, persist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_succeeds() {
        let mut generated = 0;
        let reference = allocate(
            DEFAULT_MAX_ATTEMPTS,
            || {
                generated += 1;
                Reference::generate()
            },
            |_| Ok(()),
        );
        assert!(reference.is_ok());
        assert_eq!(generated, 1);
    }

    #[test]
    fn zero_attempts_never_generates() {
        let mut generated = 0;
        let result = allocate(
            0,
            || {
                generated += 1;
                Reference::generate()
            },
            |_| Ok(()),
        );
        assert_eq!(result, Err(EngineError::ExhaustedRetries { attempts: 0 }));
        assert_eq!(generated, 0);
    }

    #[test]
    fn store_failure_stops_retrying() {
        let mut calls = 0;
        let result = allocate_reference(DEFAULT_MAX_ATTEMPTS, |_| {
            calls += 1;
            Err(PersistError::Unavailable("connection reset".into()))
        });
        assert_eq!(result, Err(EngineError::Persistence("connection reset".into())));
        assert_eq!(calls, 1);
    }
}
