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

//! Promotion eligibility rules.
//!
//! A promotion's eligibility rule maps attribute names to a comparison:
//!
//! ```json
//! {
//!   "monthly_spending": { "op": "gt", "value": 1500 },
//!   "black_card_holder": { "op": "eq", "value": "true" },
//!   "tier": { "value": ["gold", "platinum"] }
//! }
//! ```
//!
//! Rules are conjunctive: every attribute named must be present in the
//! transaction's attributes and satisfy its comparison. A list value always
//! means membership, whatever operator is stated.

use crate::EngineError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Attribute value supplied with a transaction or named by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
    Number(Decimal),
}

impl AttributeValue {
    /// Reads a free-form cell: a decimal literal becomes a number, anything
    /// else is kept as text.
    pub fn from_cell(cell: &str) -> Self {
        Decimal::from_str(cell)
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(cell.to_string()))
    }

    /// Orders two values of the same kind; values of different kinds are
    /// incomparable.
    fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<Decimal> for AttributeValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Per-transaction attributes inspected by eligibility rules.
pub type Attributes = HashMap<String, AttributeValue>;

/// Comparison value of a rule: a scalar, or a list for membership tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    List(Vec<AttributeValue>),
    Scalar(AttributeValue),
}

/// Closed set of eligibility operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
        }
    }
}

impl FromStr for Operator {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Self::Eq),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            other => Err(EngineError::UnrecognizedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule data as stored, before the operator is validated.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub op: Option<String>,
    pub value: RuleValue,
}

/// A validated attribute comparison.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCondition")]
pub struct Condition {
    op: Operator,
    value: RuleValue,
}

impl Condition {
    pub fn new(op: Operator, value: RuleValue) -> Self {
        // A list value is always a membership test.
        let op = match value {
            RuleValue::List(_) => Operator::In,
            RuleValue::Scalar(_) => op,
        };
        Self { op, value }
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn value(&self) -> &RuleValue {
        &self.value
    }

    /// Whether `actual <op> value` holds.
    pub fn holds(&self, actual: &AttributeValue) -> bool {
        let expected = match &self.value {
            RuleValue::List(items) => return items.contains(actual),
            RuleValue::Scalar(expected) => expected,
        };

        if self.op == Operator::In {
            return match (actual, expected) {
                (AttributeValue::Text(needle), AttributeValue::Text(haystack)) => {
                    haystack.contains(needle.as_str())
                }
                _ => false,
            };
        }

        let Some(ordering) = actual.compare(expected) else {
            return false;
        };
        match self.op {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
            Operator::In => false,
        }
    }
}

impl TryFrom<RawCondition> for Condition {
    type Error = EngineError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        // The stated operator is irrelevant for list values, so it is not
        // validated for them.
        let op = match (&raw.value, raw.op.as_deref()) {
            (RuleValue::List(_), _) | (_, None) => Operator::default(),
            (RuleValue::Scalar(_), Some(op)) => op.parse()?,
        };
        Ok(Self::new(op, raw.value))
    }
}

/// Eligibility rule of a promotion, keyed by attribute name.
pub type EligibilityRule = BTreeMap<String, Condition>;

/// Whether `attributes` satisfy every condition of `rule`.
///
/// Returns `false` for an empty attribute map, even when the rule is empty,
/// and as soon as one condition names a missing attribute or fails.
pub fn matches(rule: &EligibilityRule, attributes: &Attributes) -> bool {
    if attributes.is_empty() {
        return false;
    }

    rule.iter().all(|(name, condition)| match attributes.get(name) {
        Some(actual) => {
            let holds = condition.holds(actual);
            if !holds {
                tracing::debug!(attribute = %name, op = %condition.op(), "eligibility condition failed");
            }
            holds
        }
        None => {
            tracing::debug!(attribute = %name, "eligibility attribute missing");
            false
        }
    })
}
