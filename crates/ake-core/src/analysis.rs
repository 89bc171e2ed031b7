//! Safety analysis of a key pair
//!
//! Four independent predicates, each named after the protocol analysis tool
//! whose attack class it screens for:
//!
//! | Predicate | Tool | Check |
//! |---|---|---|
//! | NoFactoring | OFMC | `gcd(M, N) == 1` |
//! | NoReplay | CL-AtSe | `M mod N != 0` |
//! | Invertible | SATMC | `a⁻¹ mod N` exists |
//! | BoundedRandomness | TA4SP | `r <= N` |

use crate::arith::{is_coprime, mod_inverse};
use crate::{Error, PrivateKey, PublicKey, Result};
use num_traits::Zero;
use serde::Serialize;

/// One of the four safety predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Predicate {
    NoFactoring,
    NoReplay,
    Invertible,
    BoundedRandomness,
}

impl Predicate {
    pub const ALL: [Predicate; 4] = [
        Predicate::NoFactoring,
        Predicate::NoReplay,
        Predicate::Invertible,
        Predicate::BoundedRandomness,
    ];

    /// Attack class reported when the predicate fails
    pub fn label(self) -> &'static str {
        match self {
            Predicate::NoFactoring => "Factoring Attack",
            Predicate::NoReplay => "Replay Attack / Key Reuse",
            Predicate::Invertible => "Key Compromise / Man-in-the-Middle Attack",
            Predicate::BoundedRandomness => "Overflow Vulnerabilities / Timing Attacks",
        }
    }

    /// Analysis tool the predicate stands in for
    pub fn tool(self) -> &'static str {
        match self {
            Predicate::NoFactoring => "OFMC",
            Predicate::NoReplay => "CL-AtSe",
            Predicate::Invertible => "SATMC",
            Predicate::BoundedRandomness => "TA4SP",
        }
    }

    /// Evaluate this predicate alone
    pub fn check(self, public_key: &PublicKey, private_key: &PrivateKey) -> bool {
        let n = &public_key.n;
        match self {
            Predicate::NoFactoring => is_coprime(&public_key.m, n),
            Predicate::NoReplay => !n.is_zero() && !(&public_key.m % n).is_zero(),
            Predicate::Invertible => mod_inverse(&private_key.a, n).is_ok(),
            Predicate::BoundedRandomness => private_key.r <= *n,
        }
    }
}

/// Result of a single predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateOutcome {
    pub predicate: Predicate,
    pub ok: bool,
    /// Empty when `ok`
    pub attack_label: &'static str,
}

/// Outcome of all four predicates for one key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyReport {
    pub outcomes: Vec<PredicateOutcome>,
}

impl SafetyReport {
    /// Conjunction of every predicate
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.ok)
    }

    /// Labels of the failing predicates, in predicate order
    pub fn failures(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| !o.ok)
            .map(|o| o.attack_label)
            .collect()
    }

    pub fn outcome(&self, predicate: Predicate) -> Option<&PredicateOutcome> {
        self.outcomes.iter().find(|o| o.predicate == predicate)
    }

    /// Turn the first failure into [`Error::SafetyViolation`]
    pub fn into_result(self, public_key: &PublicKey, private_key: &PrivateKey) -> Result<()> {
        match self.outcomes.iter().find(|o| !o.ok) {
            None => Ok(()),
            Some(failed) => Err(Error::SafetyViolation {
                label: failed.attack_label,
                n: public_key.n.clone(),
                m: public_key.m.clone(),
                a: private_key.a.clone(),
                b: private_key.b.clone(),
                r: private_key.r.clone(),
            }),
        }
    }
}

/// Evaluate all four predicates. Pure: no mutation, no I/O.
pub fn analyze(public_key: &PublicKey, private_key: &PrivateKey) -> SafetyReport {
    let outcomes = Predicate::ALL
        .iter()
        .map(|&predicate| {
            let ok = predicate.check(public_key, private_key);
            PredicateOutcome {
                predicate,
                ok,
                attack_label: if ok { "" } else { predicate.label() },
            }
        })
        .collect();

    SafetyReport { outcomes }
}
