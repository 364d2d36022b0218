use serde::{Deserialize, Serialize};

use super::{directory_model::Person, identity_model::Identity};

/// Snapshot of the authenticated user kept in the session store.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub person: Person,
    pub fullname: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(rename = "loggedIn")]
    pub logged_in: bool,
}

impl SessionRecord {
    /// A profile without a name falls back to the directory name, then the email.
    pub fn merge(person: Person, identity: Identity) -> Self {
        let fullname = if identity.name.is_empty() {
            person
                .display_name()
                .map(str::to_owned)
                .unwrap_or(identity.email)
        } else {
            identity.name
        };
        SessionRecord {
            person,
            fullname,
            picture: identity.picture,
            logged_in: true,
        }
    }
}
