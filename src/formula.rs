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

//! Point formula language.
//!
//! Formulas are infix arithmetic over `+ - * /`, parentheses, decimal
//! literals and the variable `x`, e.g. `(1.5 * x) + 200`. Parsing produces an
//! immutable [`Formula`] tree; evaluation substitutes the transaction amount
//! for `x` and truncates the result toward zero.
//!
//! Evaluation is exact: decimal inputs become `i128` fractions, so
//! `x / 3 * 3` gives back `x`. Intermediate values that do not fit are
//! reported as [`FormulaFault::Overflow`].

use crate::EngineError;
use crate::error::FormulaFault;
use nom::{
    IResult,
    branch::alt,
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded},
};
use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Zero};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Exact value used during evaluation.
type Exact = Ratio<i128>;

fn exact(value: Decimal) -> Exact {
    // Scale is at most 28, so the power of ten fits an i128.
    Exact::new(value.mantissa(), 10i128.pow(value.scale()))
}

/// Deepest parenthesis nesting accepted from formula text.
const MAX_NESTING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn from_char(c: char) -> Self {
        match c {
            '+' => Self::Add,
            '-' => Self::Sub,
            '*' => Self::Mul,
            _ => Self::Div,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Number(Decimal),
    Variable,
    Neg(Box<Node>),
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

impl Node {
    fn binary(op: char, lhs: Node, rhs: Node) -> Self {
        Self::Binary {
            op: BinaryOp::from_char(op),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn eval(&self, x: Exact) -> Result<Exact, FormulaFault> {
        match self {
            Self::Number(n) => Ok(exact(*n)),
            Self::Variable => Ok(x),
            Self::Neg(inner) => Exact::zero()
                .checked_sub(&inner.eval(x)?)
                .ok_or(FormulaFault::Overflow),
            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(x)?;
                let rhs = rhs.eval(x)?;
                match op {
                    BinaryOp::Add => lhs.checked_add(&rhs).ok_or(FormulaFault::Overflow),
                    BinaryOp::Sub => lhs.checked_sub(&rhs).ok_or(FormulaFault::Overflow),
                    BinaryOp::Mul => lhs.checked_mul(&rhs).ok_or(FormulaFault::Overflow),
                    BinaryOp::Div if rhs.is_zero() => Err(FormulaFault::DivisionByZero),
                    BinaryOp::Div => lhs.checked_div(&rhs).ok_or(FormulaFault::Overflow),
                }
            }
        }
    }
}

/// A parsed point formula together with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    source: String,
    root: Node,
}

impl Formula {
    /// Parses formula text.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidFormula`] with [`FormulaFault::Syntax`] when the
    /// text is not a complete arithmetic expression over `x`.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let syntax_error = || EngineError::InvalidFormula {
            formula: text.to_string(),
            fault: FormulaFault::Syntax,
        };
        if nesting_depth(text) > MAX_NESTING {
            return Err(syntax_error());
        }
        let (_, root) = all_consuming(ws(expr))(text).map_err(|_| syntax_error())?;
        Ok(Self {
            source: text.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the formula for `x`, truncating toward zero.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidFormula`] on division by zero or when the value
    /// leaves the representable range.
    pub fn evaluate(&self, x: Decimal) -> Result<i64, EngineError> {
        self.root
            .eval(exact(x))
            .and_then(|result| {
                i64::try_from(result.to_integer()).map_err(|_| FormulaFault::Overflow)
            })
            .map_err(|fault| EngineError::InvalidFormula {
                formula: self.source.clone(),
                fault,
            })
    }
}

impl FromStr for Formula {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parses `formula` and evaluates it for `amount` in one step.
///
/// # Example
///
/// ```
/// use loyalty_engine_rs::calculate_points;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(calculate_points(dec!(1000), "(1.5 * x) + 200").unwrap(), 1700);
/// ```
pub fn calculate_points(amount: Decimal, formula: &str) -> Result<i64, EngineError> {
    Formula::parse(formula)?.evaluate(amount)
}

fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

// expr := term (('+' | '-') term)*
fn expr(input: &str) -> IResult<&str, Node> {
    let (input, first) = term(input)?;
    fold_many0(
        pair(ws(one_of("+-")), term),
        move || first.clone(),
        |lhs, (op, rhs)| Node::binary(op, lhs, rhs),
    )(input)
}

// term := unary (('*' | '/') unary)*
fn term(input: &str) -> IResult<&str, Node> {
    let (input, first) = unary(input)?;
    fold_many0(
        pair(ws(one_of("*/")), unary),
        move || first.clone(),
        |lhs, (op, rhs)| Node::binary(op, lhs, rhs),
    )(input)
}

// unary := ('+' | '-')* atom
fn unary(input: &str) -> IResult<&str, Node> {
    map(pair(many0(ws(one_of("+-"))), atom), |(signs, node)| {
        let negations = signs.iter().filter(|&&sign| sign == '-').count();
        if negations % 2 == 1 {
            Node::Neg(Box::new(node))
        } else {
            node
        }
    })(input)
}

// atom := number | 'x' | '(' expr ')'
fn atom(input: &str) -> IResult<&str, Node> {
    ws(alt((
        number,
        value(Node::Variable, char('x')),
        delimited(char('('), ws(expr), char(')')),
    )))(input)
}

fn number(input: &str) -> IResult<&str, Node> {
    map_res(
        recognize(pair(digit1, opt(preceded(char('.'), digit1)))),
        |digits: &str| Decimal::from_str(digits).map(Node::Number),
    )(input)
}
