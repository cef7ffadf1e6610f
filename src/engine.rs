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

//! Credit creation engine.
//!
//! The [`Engine`] owns the promotion catalog and the credit ledger and runs
//! the full flow for one credit request:
//!
//! 1. Select the promotions scoped to the request's airline and partner that
//!    are still active.
//! 2. Resolve the best award with [`resolve_points`].
//! 3. Persist the credit under a freshly allocated [`Reference`], retrying on
//!    reference conflicts.
//!
//! # Thread Safety
//!
//! Requests may be processed concurrently. The catalog sits behind a
//! [`RwLock`] and each resolution works on a snapshot of the candidates; the
//! ledger's uniqueness check is atomic per reference.

use crate::base::Reference;
use crate::credit::{CreditRecord, CreditRequest};
use crate::ledger::CreditLedger;
use crate::promotion::{Catalog, Promotion, PromotionName};
use crate::reference::{DEFAULT_MAX_ATTEMPTS, allocate};
use crate::resolver::resolve_points;
use crate::EngineError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Reference attempts per credit before giving up.
    pub max_reference_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_reference_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Resolves promotions and records credits.
#[derive(Debug)]
pub struct Engine {
    catalog: RwLock<Catalog>,
    ledger: CreditLedger,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with default settings.
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    pub fn with_config(catalog: Catalog, config: EngineConfig) -> Self {
        Engine {
            catalog: RwLock::new(catalog),
            ledger: CreditLedger::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    /// Adds a promotion to the catalog.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicatePromotion`] if the ID is already used.
    pub fn add_promotion(&self, promotion: Promotion) -> Result<(), EngineError> {
        let id = promotion.id;
        self.catalog.write().push(promotion)?;
        tracing::info!(promotion = %id, "promotion added");
        Ok(())
    }

    /// Snapshot of the promotions a request for this airline and partner
    /// would be resolved against at `now`.
    pub fn candidates(&self, airline_code: &str, partner_code: &str, now: DateTime<Utc>) -> Vec<Promotion> {
        self.catalog.read().candidates(airline_code, partner_code, now)
    }

    /// Names and descriptions of the promotions offered through a partner.
    pub fn promotion_names(&self, partner_code: &str) -> Vec<PromotionName> {
        self.catalog.read().names_for_partner(partner_code)
    }

    /// Resolves and records a credit.
    ///
    /// `now` is both the instant promotions are checked against and the
    /// transaction date of the record.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConditionFormat`] / [`EngineError::InvalidFormula`] -
    ///   an eligible promotion has a malformed points rule. Nothing is recorded.
    /// - [`EngineError::ExhaustedRetries`] - no free reference was found.
    /// - [`EngineError::Persistence`] - the ledger rejected the record.
    pub fn process(&self, request: &CreditRequest, now: DateTime<Utc>) -> Result<Arc<CreditRecord>, EngineError> {
        let candidates = self.candidates(&request.airline_code, &request.partner_code, now);
        let outcome = resolve_points(request.amount, &request.attributes, &candidates)?;

        let mut committed = None;
        let reference = allocate(self.config.max_reference_attempts, Reference::generate, |reference| {
            let record = Arc::new(CreditRecord::new(reference, request, &outcome, now));
            self.ledger.insert(Arc::clone(&record))?;
            committed = Some(record);
            Ok(())
        })?;

        tracing::info!(
            %reference,
            member = %request.member_id,
            amount = %outcome.final_amount,
            promotion = ?outcome.promotion_id,
            "credit recorded"
        );

        committed.ok_or_else(|| EngineError::Persistence(format!("record {reference} was not stored")))
    }

    pub fn credit(&self, reference: &Reference) -> Option<Arc<CreditRecord>> {
        self.ledger.get(reference)
    }

    pub fn credits_for_member(&self, member_id: &str) -> Vec<Arc<CreditRecord>> {
        self.ledger.for_member(member_id)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Catalog::new())
    }
}
