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

//! Credit requests and the records persisted for them.

use crate::base::{PromotionId, Reference};
use crate::eligibility::Attributes;
use crate::resolver::AwardOutcome;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A validated request to credit points for a transaction.
///
/// Member identifier and airline code are assumed validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRequest {
    pub member_id: String,
    pub airline_code: String,
    pub partner_code: String,
    pub amount: Decimal,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum CreditStatus {
    #[serde(rename = "In Progress")]
    InProgress,
}

/// A persisted credit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreditRecord {
    pub reference: Reference,
    pub member_id: String,
    pub airline_code: String,
    pub partner_code: String,
    /// Transaction amount before promotions.
    pub base_amount: Decimal,
    /// Points credited.
    pub amount: Decimal,
    pub promotion_id: Option<PromotionId>,
    pub transaction_date: DateTime<Utc>,
    pub status: CreditStatus,
}

impl CreditRecord {
    pub fn new(
        reference: Reference,
        request: &CreditRequest,
        outcome: &AwardOutcome,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            reference,
            member_id: request.member_id.clone(),
            airline_code: request.airline_code.clone(),
            partner_code: request.partner_code.clone(),
            base_amount: request.amount,
            amount: outcome.final_amount,
            promotion_id: outcome.promotion_id,
            transaction_date,
            status: CreditStatus::InProgress,
        }
    }
}
