//! Resolution of raw commit authors to configured users.

use crate::model::User;
use serde::Serialize;
use std::fmt;

/// Returns the first user (in declaration order) associated with the
/// author's email or name, compared case-insensitively.
pub fn resolve<'u>(users: &'u [User], email: &str, name: &str) -> Option<&'u User> {
    let email = email.to_lowercase();
    let name = name.to_lowercase();
    users
        .iter()
        .find(|u| u.is_associated(&email) || u.is_associated(&name))
}

/// Key an author is aggregated under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Identity {
    Registered { user: String },
    Unregistered { email: String, name: String },
    Others { label: String },
}

impl Identity {
    pub fn of(users: &[User], email: &str, name: &str) -> Self {
        match resolve(users, email, name) {
            Some(user) => Identity::Registered { user: user.name.clone() },
            None => Identity::Unregistered {
                email: email.to_lowercase(),
                name: name.to_lowercase(),
            },
        }
    }

    pub fn others(label: impl Into<String>) -> Self {
        Identity::Others { label: label.into() }
    }

    pub fn user_name(&self) -> Option<&str> {
        match self {
            Identity::Registered { user } => Some(user),
            _ => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Registered { user } => write!(f, "{user}"),
            Identity::Unregistered { email, name } => write!(f, "{name} <{email}>"),
            Identity::Others { label } => write!(f, "{label}"),
        }
    }
}
