//! The authenticated caller, passed explicitly into every workflow.

use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Actor {
  Hr { username: String },
  Employee { person_id: Uuid, username: String },
}

impl Actor {
  pub fn username(&self) -> &str {
    match self {
      Self::Hr { username } | Self::Employee { username, .. } => username,
    }
  }

  pub fn is_hr(&self) -> bool { matches!(self, Self::Hr { .. }) }

  pub fn require_hr(&self) -> Result<()> {
    if self.is_hr() {
      Ok(())
    } else {
      Err(Error::Forbidden("HR access required".into()))
    }
  }

  /// The caller's person id, or `Forbidden` for HR.
  pub fn require_employee(&self) -> Result<Uuid> {
    match self {
      Self::Employee { person_id, .. } => Ok(*person_id),
      Self::Hr { .. } => Err(Error::Forbidden("employee access required".into())),
    }
  }

  /// HR may act on anyone; an employee only on themselves.
  pub fn require_self_or_hr(&self, person_id: Uuid) -> Result<()> {
    match self {
      Self::Hr { .. } => Ok(()),
      Self::Employee { person_id: own, .. } if *own == person_id => Ok(()),
      Self::Employee { .. } => {
        Err(Error::Forbidden("cannot access another person's records".into()))
      }
    }
  }
}
