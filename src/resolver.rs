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

//! Promotion resolution.
//!
//! Every candidate promotion whose eligibility rule matches is scanned. Within
//! one promotion only the first point condition that holds is used, even if a
//! later one would award more. Across promotions the largest award wins, and
//! ties keep the promotion seen first.
//!
//! # Example
//!
//! ```
//! use loyalty_engine_rs::{resolve_points, Attributes, Promotion, PromotionId};
//! use rust_decimal_macros::dec;
//!
//! let promotion = Promotion::new(7, "GJP", "DBS").with_point_condition("x > 500", "x * 2");
//! let attributes = Attributes::from([("tier".to_string(), "gold".into())]);
//!
//! let outcome = resolve_points(dec!(1000), &attributes, &[promotion]).unwrap();
//! assert_eq!(outcome.final_amount, dec!(2000));
//! assert_eq!(outcome.promotion_id, Some(PromotionId(7)));
//! ```

use crate::EngineError;
use crate::base::PromotionId;
use crate::condition::ConditionExpr;
use crate::eligibility::{self, Attributes};
use crate::formula::Formula;
use crate::promotion::Promotion;
use rust_decimal::Decimal;
use serde::Serialize;

/// Result of resolving a transaction against its candidate promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AwardOutcome {
    /// Points credited; the base amount when no promotion improves it.
    pub final_amount: Decimal,
    /// Promotion that produced `final_amount`, if any.
    pub promotion_id: Option<PromotionId>,
}

impl AwardOutcome {
    pub fn unchanged(base_amount: Decimal) -> Self {
        Self {
            final_amount: base_amount,
            promotion_id: None,
        }
    }
}

/// Selects the best award among `candidates` for a transaction.
///
/// # Errors
///
/// Malformed point conditions or formulas of an eligible promotion are
/// reported rather than skipped:
///
/// - [`EngineError::InvalidConditionFormat`] - a condition evaluated before
///   the first match does not parse.
/// - [`EngineError::InvalidFormula`] - the formula of the first matching
///   condition does not parse or cannot be evaluated.
pub fn resolve_points(
    base_amount: Decimal,
    attributes: &Attributes,
    candidates: &[Promotion],
) -> Result<AwardOutcome, EngineError> {
    let mut best = AwardOutcome::unchanged(base_amount);

    for promotion in candidates {
        if promotion.is_inert() {
            tracing::debug!(promotion = %promotion.id, "promotion has no point conditions");
            continue;
        }

        if !eligibility::matches(&promotion.conditions, attributes) {
            tracing::debug!(promotion = %promotion.id, "promotion not eligible");
            continue;
        }

        let Some(points) = first_matching_award(promotion, base_amount)? else {
            continue;
        };

        let points = Decimal::from(points);
        if points > best.final_amount {
            tracing::debug!(promotion = %promotion.id, %points, "new best award");
            best = AwardOutcome {
                final_amount: points,
                promotion_id: Some(promotion.id),
            };
        }
    }

    Ok(best)
}

/// Points awarded by the first point condition of `promotion` that holds for
/// `amount`.
///
/// Later point conditions are never examined once one holds, so a later,
/// larger award is not considered. Returns `None` when no condition holds.
pub fn first_matching_award(promotion: &Promotion, amount: Decimal) -> Result<Option<i64>, EngineError> {
    for point_condition in &promotion.points_rule.point_condition {
        let condition = ConditionExpr::parse(point_condition.condition())?;
        if !condition.evaluate(amount) {
            continue;
        }

        let points = Formula::parse(point_condition.formula())?.evaluate(amount)?;
        tracing::debug!(
            promotion = %promotion.id,
            condition = point_condition.condition(),
            formula = point_condition.formula(),
            points,
            "point condition matched"
        );
        return Ok(Some(points));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FormulaFault;
    use rust_decimal_macros::dec;

    fn attributes() -> Attributes {
        Attributes::from([("tier".to_string(), "gold".into())])
    }

    #[test]
    fn inert_promotions_never_win() {
        let inert = Promotion::new(1, "GJP", "DBS");
        let awarding = Promotion::new(2, "GJP", "DBS").with_point_condition("x > 0", "x + 5");
        assert_eq!(
            resolve_points(dec!(100), &attributes(), &[inert.clone()]),
            Ok(AwardOutcome::unchanged(dec!(100)))
        );
        assert_eq!(
            resolve_points(dec!(100), &attributes(), &[inert, awarding]),
            Ok(AwardOutcome {
                final_amount: dec!(105),
                promotion_id: Some(PromotionId(2)),
            })
        );
    }

    #[test]
    fn first_match_stops_scanning() {
        let promotion = Promotion::new(1, "GJP", "DBS")
            .with_point_condition("x > 100", "x + 1")
            .with_point_condition("x > 100", "x * 10");
        assert_eq!(first_matching_award(&promotion, dec!(1000)), Ok(Some(1001)));
    }

    #[test]
    fn first_match_skips_failed_conditions() {
        let promotion = Promotion::new(1, "GJP", "DBS")
            .with_point_condition("x < 100", "x * 10")
            .with_point_condition("x >= 100", "x * 2");
        assert_eq!(first_matching_award(&promotion, dec!(1000)), Ok(Some(2000)));
    }

    #[test]
    fn no_condition_holds() {
        let promotion = Promotion::new(1, "GJP", "DBS").with_point_condition("x < 100", "x * 10");
        assert_eq!(first_matching_award(&promotion, dec!(1000)), Ok(None));
    }

    #[test]
    fn pairs_after_first_match_are_not_parsed() {
        let promotion = Promotion::new(1, "GJP", "DBS")
            .with_point_condition("x > 0", "x")
            .with_point_condition("garbage", "((");
        assert_eq!(first_matching_award(&promotion, dec!(10)), Ok(Some(10)));
    }

    #[test]
    fn award_lower_than_base_keeps_base() {
        let promotion = Promotion::new(1, "GJP", "DBS").with_point_condition("x > 0", "x / 2");
        let outcome = resolve_points(dec!(1000), &attributes(), &[promotion]).unwrap();
        assert_eq!(outcome, AwardOutcome::unchanged(dec!(1000)));
    }

    #[test]
    fn ties_keep_first_promotion() {
        let first = Promotion::new(1, "GJP", "DBS").with_point_condition("x > 0", "x * 2");
        let second = Promotion::new(2, "GJP", "DBS").with_point_condition("x > 0", "2 * x");
        let outcome = resolve_points(dec!(10), &attributes(), &[first, second]).unwrap();
        assert_eq!(outcome.promotion_id, Some(PromotionId(1)));
    }

    #[test]
    fn formula_errors_surface() {
        let promotion = Promotion::new(1, "GJP", "DBS").with_point_condition("x > 0", "x / 0");
        assert_eq!(
            resolve_points(dec!(10), &attributes(), &[promotion]),
            Err(EngineError::InvalidFormula {
                formula: "x / 0".into(),
                fault: FormulaFault::DivisionByZero,
            })
        );
    }

    #[test]
    fn ineligible_promotions_are_not_evaluated() {
        let promotion = Promotion::new(1, "GJP", "DBS")
            .with_condition(
                "missing",
                crate::Condition::new(crate::Operator::Eq, crate::RuleValue::Scalar("y".into())),
            )
            .with_point_condition("not a condition", "x");
        let outcome = resolve_points(dec!(10), &attributes(), &[promotion]).unwrap();
        assert_eq!(outcome, AwardOutcome::unchanged(dec!(10)));
    }
}
