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

//! Error types for promotion resolution and credit creation.

use thiserror::Error;

/// Why a formula could not produce a point value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaFault {
    /// Text is not a well-formed arithmetic expression
    #[error("malformed expression")]
    Syntax,

    /// Evaluation divided by zero
    #[error("division by zero")]
    DivisionByZero,

    /// An intermediate or final value does not fit the numeric range
    #[error("numeric overflow")]
    Overflow,
}

/// Engine errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Point condition is neither `x <op> n` nor `n <op> x <op> n`
    #[error("invalid condition format: {0}")]
    InvalidConditionFormat(String),

    /// Point formula is malformed or cannot be evaluated
    #[error("invalid formula '{formula}': {fault}")]
    InvalidFormula { formula: String, fault: FormulaFault },

    /// Eligibility rule names an operator outside eq/gt/gte/lt/lte/in
    #[error("unrecognized operator: {0}")]
    UnrecognizedOperator(String),

    /// Every reference attempt collided with an existing record
    #[error("reference allocation exhausted after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    /// The store failed for a reason other than a uniqueness conflict
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// A promotion with the same ID is already in the catalog
    #[error("duplicate promotion ID {0}")]
    DuplicatePromotion(u32),
}

/// Signal reported by a store when persisting a record fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// A record with the same reference already exists
    #[error("reference already in use")]
    Conflict,

    /// Any other storage failure
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            EngineError::InvalidConditionFormat("600 ! x < 1000".into()).to_string(),
            "invalid condition format: 600 ! x < 1000"
        );
        assert_eq!(
            EngineError::InvalidFormula {
                formula: "x / 0".into(),
                fault: FormulaFault::DivisionByZero,
            }
            .to_string(),
            "invalid formula 'x / 0': division by zero"
        );
        assert_eq!(
            EngineError::UnrecognizedOperator("ne".into()).to_string(),
            "unrecognized operator: ne"
        );
        assert_eq!(
            EngineError::ExhaustedRetries { attempts: 5 }.to_string(),
            "reference allocation exhausted after 5 attempts"
        );
        assert_eq!(
            EngineError::Persistence("disk full".into()).to_string(),
            "persistence failure: disk full"
        );
        assert_eq!(EngineError::DuplicatePromotion(7).to_string(), "duplicate promotion ID 7");
        assert_eq!(PersistError::Conflict.to_string(), "reference already in use");
    }

    #[test]
    fn formula_faults_are_errors() {
        let faults: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(FormulaFault::Syntax),
            Box::new(FormulaFault::DivisionByZero),
            Box::new(FormulaFault::Overflow),
        ];
        let messages: Vec<String> = faults.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            ["malformed expression", "division by zero", "numeric overflow"]
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = EngineError::ExhaustedRetries { attempts: 3 };
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
