//! SHA-256 password hashing and lookup.

use crate::error::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// Arguments of the password workload.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordParams {
    pub stored: usize,
    pub tried: usize,
    pub min_len: usize,
    pub max_len: usize,
    /// Share of tried passwords drawn from the stored set.
    pub correct_ratio: f64,
}

impl PasswordParams {
    pub fn new(
        stored: usize,
        tried: usize,
        (min_len, max_len): (usize, usize),
        correct_ratio: f64,
    ) -> Result<Self> {
        let params = Self {
            stored,
            tried,
            min_len,
            max_len,
            correct_ratio,
        };
        params.validate()?;
        Ok(params)
    }

    /// `[stored, tried, [min_len, max_len], correct_ratio]`
    pub(super) fn from_args(args: &[Value]) -> Result<Self> {
        let count = |i: usize| {
            args.get(i)
                .and_then(Value::as_u64)
                .map(|v| v as usize)
                .ok_or_else(|| bad_arg(i, "a non-negative integer"))
        };
        let range = args
            .get(2)
            .and_then(Value::as_array)
            .filter(|r| r.len() == 2)
            .and_then(|r| Some((r[0].as_u64()? as usize, r[1].as_u64()? as usize)))
            .ok_or_else(|| bad_arg(2, "a [min, max] length pair"))?;
        let ratio = args
            .get(3)
            .and_then(Value::as_f64)
            .ok_or_else(|| bad_arg(3, "a number"))?;

        Self::new(count(0)?, count(1)?, range, ratio)
    }

    fn validate(&self) -> Result<()> {
        if self.min_len == 0 || self.min_len > self.max_len {
            return Err(Error::config(format!(
                "password length range ({}, {}) is invalid",
                self.min_len, self.max_len
            )));
        }
        if !(0.0..=1.0).contains(&self.correct_ratio) {
            return Err(Error::config("password correct ratio must be within [0, 1]"));
        }
        if self.stored == 0 && self.correct_count() > 0 {
            return Err(Error::config(
                "password task needs stored passwords to draw correct guesses from",
            ));
        }
        Ok(())
    }

    pub fn correct_count(&self) -> usize {
        (self.tried as f64 * self.correct_ratio) as usize
    }
}

impl fmt::Display for PasswordParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}; ({}, {}); {}",
            self.stored, self.tried, self.min_len, self.max_len, self.correct_ratio
        )
    }
}

fn bad_arg(i: usize, expected: &str) -> Error {
    Error::config(format!("task 'password' argument {i} must be {expected}"))
}

fn random_password<R: Rng>(params: &PasswordParams, rng: &mut R) -> String {
    let len = rng.gen_range(params.min_len..=params.max_len);
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

fn sha256(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Hash the stored set, hash every tried password and count matches.
pub(super) fn hash_and_check<R: Rng>(params: &PasswordParams, rng: &mut R) -> u64 {
    let stored: Vec<String> = (0..params.stored)
        .map(|_| random_password(params, rng))
        .collect();

    let correct = params.correct_count();
    let mut tried: Vec<String> = if correct <= stored.len() {
        stored.choose_multiple(rng, correct).cloned().collect()
    } else {
        // more correct guesses than stored passwords: repeat some
        (0..correct)
            .filter_map(|_| stored.choose(rng).cloned())
            .collect()
    };
    tried.extend((correct..params.tried).map(|_| random_password(params, rng)));
    tried.shuffle(rng);

    let hashes: HashSet<[u8; 32]> = stored.iter().map(|p| sha256(p)).collect();
    tried
        .iter()
        .filter(|p| hashes.contains(&sha256(p)))
        .count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use serde_json::json;

    #[test]
    fn test_known_digest() {
        let hex: String = sha256("abc").iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_matches_at_least_correct_share() {
        let params = PasswordParams::new(200, 100, (6, 12), 0.4).unwrap();
        let mut rng = Pcg64::seed_from_u64(8);
        let matched = hash_and_check(&params, &mut rng);
        assert!(matched >= 40);
        assert!(matched <= 100);
    }

    #[test]
    fn test_more_correct_than_stored() {
        let params = PasswordParams::new(3, 10, (6, 6), 1.0).unwrap();
        let mut rng = Pcg64::seed_from_u64(8);
        assert_eq!(hash_and_check(&params, &mut rng), 10);
    }

    #[test]
    fn test_from_args() {
        let params =
            PasswordParams::from_args(&[json!(1000), json!(100), json!([6, 25]), json!(0.5)])
                .unwrap();
        assert_eq!(params.correct_count(), 50);
        assert_eq!(params.to_string(), "1000/100; (6, 25); 0.5");

        assert!(
            PasswordParams::from_args(&[json!(10), json!(10), json!([9, 3]), json!(0.5)])
                .is_err()
        );
        assert!(
            PasswordParams::from_args(&[json!(10), json!(10), json!([3, 9]), json!(1.5)])
                .is_err()
        );
        assert!(PasswordParams::from_args(&[json!(10), json!(10), json!(6), json!(0.5)]).is_err());
    }
}
