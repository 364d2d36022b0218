use serde::{Deserialize, Serialize};

use super::directory_model::null_as_default;

/// Profile returned by the identity provider's userinfo endpoint.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}
