//! Client-held login state. Nothing here is signed or checked by the server; a
//! session is only as trustworthy as the client holding it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{AuthError, Authenticator, Identity, Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "CR")]
    Cr,
    #[serde(rename = "student")]
    Student,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<Principal> for Session {
    fn from(principal: Principal) -> Self {
        match principal {
            Principal::Cr => Session {
                role: Role::Cr,
                roll_no: None,
                name: None,
            },
            Principal::Student { roll_no, name } => Session {
                role: Role::Student,
                roll_no: Some(roll_no),
                name: Some(name),
            },
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("not logged in")]
    LoggedOut,
    #[error("this view requires the {0:?} role")]
    WrongRole(Role),
    #[error("student session has no roll number")]
    MissingRollNo,
}

impl Session {
    pub fn require(&self, role: Role) -> Result<&Self, SessionError> {
        if self.role != role {
            return Err(SessionError::WrongRole(role));
        }
        if role == Role::Student && self.roll_no.is_none() {
            return Err(SessionError::MissingRollNo);
        }
        Ok(self)
    }
}

#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Option<Session>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(
        &mut self,
        auth: &dyn Authenticator,
        identity: &Identity,
        secret: &str,
    ) -> Result<&Session, AuthError> {
        let principal = auth.verify(identity, secret)?;
        Ok(&*self.current.insert(principal.into()))
    }

    pub fn logout(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Guard run when a dashboard opens.
    pub fn require(&self, role: Role) -> Result<&Session, SessionError> {
        self.current
            .as_ref()
            .ok_or(SessionError::LoggedOut)?
            .require(role)
    }
}
