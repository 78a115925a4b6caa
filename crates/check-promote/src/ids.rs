// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::env;

use thiserror::Error;

/// Environment variable the CLI reads the verified-ID set from.
pub const VERIFIED_IDS_VAR: &str = "VERIFIED_IDS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdSetError {
    #[error("malformed verified ID `{0}`: expected a positive integer")]
    BadToken(String),
}

/// Set of assertion sequence numbers an external verifier has discharged.
///
/// The input format is a comma-separated list of positive integers.
/// Anything else in the list is fatal: a silently skipped token could make
/// the pass keep a check the verifier actually discharged, or worse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedIds {
    ids: BTreeSet<u64>,
}

impl VerifiedIds {
    pub fn parse(input: &str) -> Result<Self, IdSetError> {
        let mut ids = BTreeSet::new();
        if input.trim().is_empty() {
            return Ok(Self { ids });
        }
        for tok in input.split(',') {
            let tok = tok.trim();
            match tok.parse::<u64>() {
                Ok(n) if n > 0 => {
                    ids.insert(n);
                }
                _ => return Err(IdSetError::BadToken(tok.to_string())),
            }
        }
        Ok(Self { ids })
    }

    /// Read the set from [`VERIFIED_IDS_VAR`]. An unset variable is an
    /// empty set.
    pub fn from_env() -> Result<Self, IdSetError> {
        match env::var(VERIFIED_IDS_VAR) {
            Ok(v) => Self::parse(&v),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(env::VarError::NotUnicode(_)) => {
                Err(IdSetError::BadToken("<non-unicode>".to_string()))
            }
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_list() {
        let ids = VerifiedIds::parse("1,7,8").unwrap();
        assert!(ids.contains(1));
        assert!(ids.contains(7));
        assert!(ids.contains(8));
        assert!(!ids.contains(2));
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn tolerates_whitespace_and_duplicates() {
        let ids = VerifiedIds::parse(" 2 , 5 ,2 ").unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(2));
        assert!(ids.contains(5));
    }

    #[test]
    fn empty_input_is_an_empty_set() {
        assert!(VerifiedIds::parse("").unwrap().is_empty());
        assert!(VerifiedIds::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert_eq!(
            VerifiedIds::parse("1,x,3").unwrap_err(),
            IdSetError::BadToken("x".into())
        );
        assert_eq!(
            VerifiedIds::parse("1,,3").unwrap_err(),
            IdSetError::BadToken("".into())
        );
    }

    #[test]
    fn rejects_zero_and_negatives() {
        assert_eq!(
            VerifiedIds::parse("0").unwrap_err(),
            IdSetError::BadToken("0".into())
        );
        assert_eq!(
            VerifiedIds::parse("3,-1").unwrap_err(),
            IdSetError::BadToken("-1".into())
        );
    }

    #[test]
    fn from_env_round_trips() {
        env::set_var(VERIFIED_IDS_VAR, "4,9");
        let ids = VerifiedIds::from_env().unwrap();
        env::remove_var(VERIFIED_IDS_VAR);
        assert!(ids.contains(4));
        assert!(ids.contains(9));
        assert_eq!(ids.len(), 2);
    }
}
