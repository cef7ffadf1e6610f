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

//! Point condition language.
//!
//! A point condition compares the transaction amount `x` against numeric
//! literals. Two shapes are accepted, tokens separated by whitespace:
//!
//! - single: `x <op> n` with `<op>` one of `<`, `<=`, `>`, `>=`, `==`, `!=`
//! - range: `n <op1> x <op2> n` with both operators one of `<`, `<=`, `>`, `>=`
//!
//! The two comparisons of a range are independent and combined with AND.
//! `600 > x < 1000` is accepted even though it does not describe an interval.
//!
//! Literals too large for a `Decimal` are still valid. They are approximated
//! through `f64`, and anything beyond the `Decimal` range saturates to
//! `Decimal::MAX` or `Decimal::MIN`.
//!
//! # Example
//!
//! ```
//! use loyalty_engine_rs::ConditionExpr;
//! use rust_decimal_macros::dec;
//!
//! let condition: ConditionExpr = "600 < x <= 1000".parse().unwrap();
//! assert!(condition.evaluate(dec!(1000)));
//! assert!(!condition.evaluate(dec!(600)));
//! ```

use crate::EngineError;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a point condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    /// Equality operators are only legal in the single form.
    fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    /// Applies `lhs <op> rhs`.
    pub fn apply(self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };
        f.write_str(token)
    }
}

/// Parsed point condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionExpr {
    /// `x <op> rhs`
    Single { op: Comparator, rhs: Decimal },
    /// `lower <lower_op> x <upper_op> upper`
    Range {
        lower: Decimal,
        lower_op: Comparator,
        upper_op: Comparator,
        upper: Decimal,
    },
}

impl ConditionExpr {
    /// Parses condition text.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConditionFormat`] carrying `text` verbatim when it
    /// matches neither shape.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidConditionFormat(text.to_string());
        let tokens: Vec<&str> = text.split_whitespace().collect();

        match tokens.as_slice() {
            ["x", op, rhs] => {
                let op = Comparator::from_token(op).ok_or_else(invalid)?;
                let rhs = literal(rhs).ok_or_else(invalid)?;
                Ok(Self::Single { op, rhs })
            }
            [lower, lower_op, "x", upper_op, upper] => {
                let lower = literal(lower).ok_or_else(invalid)?;
                let upper = literal(upper).ok_or_else(invalid)?;
                let lower_op = Comparator::from_token(lower_op)
                    .filter(|op| op.is_ordering())
                    .ok_or_else(invalid)?;
                let upper_op = Comparator::from_token(upper_op)
                    .filter(|op| op.is_ordering())
                    .ok_or_else(invalid)?;
                Ok(Self::Range {
                    lower,
                    lower_op,
                    upper_op,
                    upper,
                })
            }
            _ => Err(invalid()),
        }
    }

    /// Evaluates the condition for `x`.
    pub fn evaluate(&self, x: Decimal) -> bool {
        match *self {
            Self::Single { op, rhs } => op.apply(x, rhs),
            Self::Range {
                lower,
                lower_op,
                upper_op,
                upper,
            } => lower_op.apply(lower, x) && upper_op.apply(x, upper),
        }
    }
}

impl FromStr for ConditionExpr {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single { op, rhs } => write!(f, "x {op} {rhs}"),
            Self::Range {
                lower,
                lower_op,
                upper_op,
                upper,
            } => write!(f, "{lower} {lower_op} x {upper_op} {upper}"),
        }
    }
}

/// Parses a literal of the form `-?digits(.digits)?`.
fn literal(token: &str) -> Option<Decimal> {
    let unsigned = token.strip_prefix('-').unwrap_or(token);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !fraction.is_none_or(all_digits) {
        return None;
    }
    Decimal::from_str(token).ok().or_else(|| approximate(token))
}

/// Maps a well-formed literal that `Decimal` cannot hold onto the nearest
/// representable value.
fn approximate(token: &str) -> Option<Decimal> {
    let value = token.parse::<f64>().ok()?;
    Decimal::from_f64(value).or(Some(if value.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }))
}
