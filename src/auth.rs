use std::sync::Arc;

use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::roster::Roster;

/// Who is trying to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Cr { username: String },
    Student { roll_no: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Cr,
    Student { roll_no: String, name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid CR username or password.")]
    InvalidCr,
    #[error("Invalid student roll number or password.")]
    InvalidStudent,
}

pub trait Authenticator: Send + Sync {
    fn verify(&self, identity: &Identity, secret: &str) -> Result<Principal, AuthError>;
}

/// Checks credentials against the plaintext roster.
pub struct RosterAuthenticator {
    roster: Arc<Roster>,
}

impl RosterAuthenticator {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self { roster }
    }
}

fn secret_matches(expected: &str, given: &str) -> bool {
    expected.as_bytes().ct_eq(given.as_bytes()).into()
}

impl Authenticator for RosterAuthenticator {
    fn verify(&self, identity: &Identity, secret: &str) -> Result<Principal, AuthError> {
        match identity {
            Identity::Cr { username } => {
                let cr = self.roster.cr();
                if cr.username == *username && secret_matches(&cr.password, secret) {
                    Ok(Principal::Cr)
                } else {
                    Err(AuthError::InvalidCr)
                }
            }
            Identity::Student { roll_no } => self
                .roster
                .student(roll_no)
                .filter(|s| secret_matches(&s.password, secret))
                .map(|s| Principal::Student {
                    roll_no: s.roll_no.clone(),
                    name: s.name.clone(),
                })
                .ok_or(AuthError::InvalidStudent),
        }
    }
}
