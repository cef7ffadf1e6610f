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

//! Promotions and the promotion catalog.
//!
//! A promotion is scoped to an airline and partner pair, expires at a fixed
//! instant, and carries an eligibility rule plus an ordered list of point
//! conditions. Promotions are created administratively and never modified
//! by resolution.
//!
//! Catalogs are loaded from JSON:
//!
//! ```
//! use loyalty_engine_rs::Catalog;
//!
//! let catalog = Catalog::from_json(r#"[{
//!     "id": 1,
//!     "airline_code": "GJP",
//!     "partner_code": "DBS",
//!     "expiry": "2099-01-01T00:00:00Z",
//!     "conditions": { "monthly_spending": { "op": "gt", "value": 1500 } },
//!     "points_rule": { "point_condition": [["x > 1500", "x * 1.5"]] }
//! }]"#).unwrap();
//! assert_eq!(catalog.len(), 1);
//! ```

use crate::EngineError;
use crate::base::PromotionId;
use crate::eligibility::{Condition, EligibilityRule};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `(condition, formula)` pair of a points rule, kept as source text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PointCondition(pub String, pub String);

impl PointCondition {
    pub fn new(condition: impl Into<String>, formula: impl Into<String>) -> Self {
        Self(condition.into(), formula.into())
    }

    pub fn condition(&self) -> &str {
        &self.0
    }

    pub fn formula(&self) -> &str {
        &self.1
    }
}

/// Ordered point conditions of a promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PointsRule {
    #[serde(default)]
    pub point_condition: Vec<PointCondition>,
}

/// Scoped, time-bounded promotion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub airline_code: String,
    #[serde(default)]
    pub partner_code: Option<String>,
    /// Exclusive end of validity. `None` never expires.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    /// Card validity window shown to members. Resolution ignores it.
    #[serde(default)]
    pub start_date_for_card: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_date_for_card: Option<NaiveDateTime>,
    #[serde(default)]
    pub conditions: EligibilityRule,
    #[serde(default)]
    pub points_rule: PointsRule,
}

impl Promotion {
    pub fn new(id: u32, airline_code: &str, partner_code: &str) -> Self {
        Self {
            id: PromotionId(id),
            name: String::new(),
            description: String::new(),
            airline_code: airline_code.to_string(),
            partner_code: Some(partner_code.to_string()),
            expiry: None,
            start_date_for_card: None,
            end_date_for_card: None,
            conditions: EligibilityRule::new(),
            points_rule: PointsRule::default(),
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_card_window(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start_date_for_card = Some(start);
        self.end_date_for_card = Some(end);
        self
    }

    pub fn with_condition(mut self, attribute: &str, condition: Condition) -> Self {
        self.conditions.insert(attribute.to_string(), condition);
        self
    }

    pub fn with_point_condition(mut self, condition: &str, formula: &str) -> Self {
        self.points_rule
            .point_condition
            .push(PointCondition::new(condition, formula));
        self
    }

    /// Whether the promotion is still valid at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_none_or(|expiry| now < expiry)
    }

    /// A promotion without point conditions can never award points.
    pub fn is_inert(&self) -> bool {
        self.points_rule.point_condition.is_empty()
    }

    fn is_scoped_to(&self, airline_code: &str, partner_code: &str) -> bool {
        self.airline_code == airline_code && self.partner_code.as_deref() == Some(partner_code)
    }
}

/// Display fields of a promotion, as listed to members of a partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionName {
    pub id: PromotionId,
    pub name: String,
    pub description: String,
}

/// Ordered collection of promotions with unique IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<Promotion>")]
pub struct Catalog {
    promotions: Vec<Promotion>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of promotions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Appends a promotion.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicatePromotion`] if the ID is already present.
    pub fn push(&mut self, promotion: Promotion) -> Result<(), EngineError> {
        if self.get(promotion.id).is_some() {
            return Err(EngineError::DuplicatePromotion(promotion.id.0));
        }
        self.promotions.push(promotion);
        Ok(())
    }

    pub fn get(&self, id: PromotionId) -> Option<&Promotion> {
        self.promotions.iter().find(|promotion| promotion.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Promotion> {
        self.promotions.iter()
    }

    pub fn len(&self) -> usize {
        self.promotions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promotions.is_empty()
    }

    /// Names and descriptions of every promotion offered through
    /// `partner_code`, in catalog order, regardless of airline or expiry.
    pub fn names_for_partner(&self, partner_code: &str) -> Vec<PromotionName> {
        self.promotions
            .iter()
            .filter(|promotion| promotion.partner_code.as_deref() == Some(partner_code))
            .map(|promotion| PromotionName {
                id: promotion.id,
                name: promotion.name.clone(),
                description: promotion.description.clone(),
            })
            .collect()
    }

    /// Promotions scoped to the airline and partner pair that are still
    /// active at `now`, in catalog order.
    pub fn candidates(&self, airline_code: &str, partner_code: &str, now: DateTime<Utc>) -> Vec<Promotion> {
        self.promotions
            .iter()
            .filter(|promotion| promotion.is_scoped_to(airline_code, partner_code))
            .filter(|promotion| promotion.is_active(now))
            .cloned()
            .collect()
    }
}

impl TryFrom<Vec<Promotion>> for Catalog {
    type Error = EngineError;

    fn try_from(promotions: Vec<Promotion>) -> Result<Self, Self::Error> {
        let mut catalog = Self::new();
        for promotion in promotions {
            catalog.push(promotion)?;
        }
        Ok(catalog)
    }
}
