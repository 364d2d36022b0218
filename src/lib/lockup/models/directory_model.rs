//! Module with directory models compatible with lockup.pro's REST API
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reads `null` the same way as a missing key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/* enrollment keys are sometimes sent as bare numbers */
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(key)) => Ok(Some(key)),
        Some(Value::Number(key)) => Ok(Some(key.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or a number, found {}",
            other
        ))),
    }
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "qr",
        alias = "enrollment_key",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub enrollment_key: Option<String>,
}

/// A student or an instructor row. Fields the client does not interpret are
/// kept in `extra` so a stored session mirrors the backend row.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq)]
pub struct Person {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Person {
    pub fn display_name(&self) -> Option<&str> {
        self.username.as_deref().or(self.name.as_deref())
    }
}

/// Join-table row associating a subject with a person.
#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct LinkRecord {
    pub subject_id: u32,
    pub user_id: u32,
}

/// Laboratory guideline post.
#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Guideline {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Deserialize, Debug, Serialize, Clone, PartialEq, Eq)]
pub struct SubjectWithInstructor {
    #[serde(flatten)]
    pub subject: Subject,
    #[serde(rename = "instructorName")]
    pub instructor_name: String,
}

/// The two shapes a collection endpoint may answer with.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Collection<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Collection<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Collection::Bare(items) => items,
            Collection::Wrapped { data } => data,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentRequest {
    pub student_id: u32,
    pub subject_id: u32,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}
