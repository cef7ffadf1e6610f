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

//! # Loyalty Engine
//!
//! This library awards loyalty points for card transactions by resolving
//! airline and partner promotions against the transaction's amount and
//! attributes, and records each credit under a unique reference.
//!
//! ## Core Components
//!
//! - [`ConditionExpr`]: Point condition language (`x > 1500`, `600 < x <= 1000`)
//! - [`Formula`]: Point formula language (`(1.5 * x) + 200`)
//! - [`matches()`]: Attribute-based eligibility rules
//! - [`resolve_points`]: Best award across candidate promotions
//! - [`allocate`]: Unique reference allocation with bounded retry
//! - [`Engine`]: End-to-end credit creation over a [`Catalog`] and [`CreditLedger`]
//! - [`EngineError`]: Error types for resolution and credit failures
//!
//! ## Example
//!
//! ```
//! use loyalty_engine_rs::{
//!     Attributes, Condition, CreditRequest, Engine, Operator, Promotion, PromotionId, RuleValue,
//! };
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::default();
//! engine
//!     .add_promotion(
//!         Promotion::new(1, "GJP", "DBS")
//!             .with_condition(
//!                 "monthly_spending",
//!                 Condition::new(Operator::Gt, RuleValue::Scalar(dec!(1500).into())),
//!             )
//!             .with_point_condition("x > 500", "x * 1.5"),
//!     )
//!     .unwrap();
//!
//! let request = CreditRequest {
//!     member_id: "1234567890".into(),
//!     airline_code: "GJP".into(),
//!     partner_code: "DBS".into(),
//!     amount: dec!(1000),
//!     attributes: Attributes::from([("monthly_spending".to_string(), dec!(2000).into())]),
//! };
//!
//! let record = engine.process(&request, Utc::now()).unwrap();
//! assert_eq!(record.amount, dec!(1500));
//! assert_eq!(record.promotion_id, Some(PromotionId(1)));
//! ```
//!
//! ## Thread Safety
//!
//! Parsing, evaluation and resolution are pure. The engine can be shared
//! across threads; concurrent credits never receive the same reference.

mod base;
pub mod condition;
mod credit;
pub mod eligibility;
mod engine;
pub mod error;
pub mod formula;
mod ledger;
pub mod promotion;
pub mod reference;
pub mod resolver;

pub use base::{PromotionId, Reference};
pub use condition::{Comparator, ConditionExpr};
pub use credit::{CreditRecord, CreditRequest, CreditStatus};
pub use eligibility::{AttributeValue, Attributes, Condition, EligibilityRule, Operator, RuleValue, matches};
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, FormulaFault, PersistError};
pub use formula::{Formula, calculate_points};
pub use ledger::CreditLedger;
pub use promotion::{Catalog, PointCondition, PointsRule, Promotion, PromotionName};
pub use reference::{DEFAULT_MAX_ATTEMPTS, allocate, allocate_reference};
pub use resolver::{AwardOutcome, first_matching_award, resolve_points};
