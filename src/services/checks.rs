//! ILL check identifiers and the configured check order
//!
//! Check names are resolved once, when the configuration is loaded, into a
//! [`CheckPlan`]. The plan order is the bit order of the status code.

use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Checks the eligibility engine knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckId {
    Hebis8,
    Free,
    SerialOrCollection,
    CurrentLibrary,
    ParallelEditions,
    JournalAvailable,
    Format,
    Indicator,
}

impl CheckId {
    pub const ALL: [CheckId; 8] = [
        CheckId::Hebis8,
        CheckId::Free,
        CheckId::SerialOrCollection,
        CheckId::CurrentLibrary,
        CheckId::ParallelEditions,
        CheckId::JournalAvailable,
        CheckId::Format,
        CheckId::Indicator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CheckId::Hebis8 => "Hebis8",
            CheckId::Free => "Free",
            CheckId::SerialOrCollection => "SerialOrCollection",
            CheckId::CurrentLibrary => "CurrentLibrary",
            CheckId::ParallelEditions => "ParallelEditions",
            CheckId::JournalAvailable => "JournalAvailable",
            CheckId::Format => "Format",
            CheckId::Indicator => "Indicator",
        }
    }
}

impl FromStr for CheckId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckId::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::Configuration(format!("Unknown ILL check '{}'", s)))
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Prefix applied to a configured check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Outcome is the check result
    Plain,
    /// `!`: outcome is the negated check result
    Negate,
    /// `~`: outcome is always true; the check still runs for its side effects
    Force,
}

impl Modifier {
    pub fn apply(&self, result: bool) -> bool {
        match self {
            Modifier::Plain => result,
            Modifier::Negate => !result,
            Modifier::Force => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedCheck {
    pub id: CheckId,
    pub modifier: Modifier,
}

/// Validated, ordered list of checks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckPlan {
    checks: Vec<PlannedCheck>,
}

impl CheckPlan {
    /// Parse a comma separated check list such as `"!Free,~Format,Indicator"`.
    ///
    /// Duplicate checks are always rejected. Unknown names are rejected when
    /// `strict` is set and skipped otherwise.
    pub fn parse(methods: &str, strict: bool) -> AppResult<Self> {
        let mut checks: Vec<PlannedCheck> = Vec::new();

        for token in methods.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (modifier, name) = match token.chars().next() {
                Some('!') => (Modifier::Negate, &token[1..]),
                Some('~') => (Modifier::Force, &token[1..]),
                _ => (Modifier::Plain, token),
            };

            let id = match name.trim().parse::<CheckId>() {
                Ok(id) => id,
                Err(e) if strict => return Err(e),
                Err(_) => {
                    tracing::warn!("Skipping unknown ILL check '{}'", name);
                    continue;
                }
            };

            if checks.iter().any(|c| c.id == id) {
                return Err(AppError::Configuration(format!(
                    "ILL check '{}' is configured more than once",
                    id
                )));
            }

            checks.push(PlannedCheck { id, modifier });
        }

        Ok(Self { checks })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedCheck> {
        self.checks.iter()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modifiers_in_order() {
        let plan = CheckPlan::parse(" !Free, ~format ,Indicator,", true).unwrap();
        let parsed: Vec<_> = plan.iter().map(|c| (c.id, c.modifier)).collect();
        assert_eq!(
            parsed,
            vec![
                (CheckId::Free, Modifier::Negate),
                (CheckId::Format, Modifier::Force),
                (CheckId::Indicator, Modifier::Plain),
            ]
        );
    }

    #[test]
    fn test_unknown_check_strict_and_lenient() {
        let err = CheckPlan::parse("Free,Bogus", true).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));

        let plan = CheckPlan::parse("Free,!Bogus,Format", false).unwrap();
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(CheckPlan::parse("Free,!Free", false).is_err());
    }

    #[test]
    fn test_modifier_semantics() {
        for result in [true, false] {
            assert_eq!(Modifier::Plain.apply(result), result);
            assert_eq!(Modifier::Negate.apply(result), !result);
            assert!(Modifier::Force.apply(result));
        }
    }

    #[test]
    fn test_empty_plan() {
        assert!(CheckPlan::parse("", true).unwrap().is_empty());
    }
}
