use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    error::LockupError,
    models::{
        directory_model::{
            Collection, Guideline, LinkRecord, Person, Subject, SubjectWithInstructor,
        },
        CURRENT_SCHEDULE_KEY,
    },
    session_store::SessionStore,
};

pub const UNKNOWN_INSTRUCTOR: &str = "Unknown Instructor";

/// Accepts a bare array or an object wrapping the array in `data`. Rows are
/// decoded one by one; a row that does not decode is dropped with a warning.
pub fn decode_collection<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, LockupError> {
    let kind = match &body {
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        _ => "scalar",
    };
    let rows = serde_json::from_value::<Collection<Value>>(body)
        .map(Collection::into_items)
        .map_err(|err| LockupError::UnexpectedShape {
            message: format!("{} body: {}", kind, err),
        })?;
    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<T>(row) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("Skipping row {}: {}", index, err);
                None
            }
        })
        .collect())
}

/// Lookup maps derived from one directory snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// First instructor discovered for each subject.
    pub subject_instructor: BTreeMap<u32, SubjectWithInstructor>,
    /// Subjects per instructor in link-record order.
    pub instructor_subjects: BTreeMap<u32, Vec<Subject>>,
    /// Subjects referenced by at least one link record, in subject order.
    pub current_schedule: Vec<Subject>,
}

/* join the three collections by id; links with a dangling side are skipped */
pub fn reconcile(
    subjects: &[Subject],
    instructors: &[Person],
    links: &[LinkRecord],
) -> Reconciliation {
    let mut subject_instructor: BTreeMap<u32, SubjectWithInstructor> = BTreeMap::new();
    let mut instructor_subjects: BTreeMap<u32, Vec<Subject>> = BTreeMap::new();

    for link in links {
        let Some(subject) = subjects.iter().find(|sub| sub.id == link.subject_id) else {
            continue;
        };
        let Some(instructor) = instructors.iter().find(|inst| inst.id == link.user_id) else {
            continue;
        };

        subject_instructor
            .entry(subject.id)
            .or_insert_with(|| SubjectWithInstructor {
                subject: subject.clone(),
                instructor_name: instructor
                    .display_name()
                    .unwrap_or(UNKNOWN_INSTRUCTOR)
                    .to_owned(),
            });
        instructor_subjects
            .entry(instructor.id)
            .or_default()
            .push(subject.clone());
    }

    let linked_ids = links
        .iter()
        .map(|link| link.subject_id)
        .collect::<BTreeSet<_>>();
    let current_schedule = subjects
        .iter()
        .filter(|subject| linked_ids.contains(&subject.id))
        .cloned()
        .collect::<Vec<_>>();

    debug!(
        "Reconciled {} subjects with instructors, {} instructors with subjects, {} in schedule",
        subject_instructor.len(),
        instructor_subjects.len(),
        current_schedule.len()
    );

    Reconciliation {
        subject_instructor,
        instructor_subjects,
        current_schedule,
    }
}

impl Reconciliation {
    pub fn instructor_name_of(&self, subject_id: u32) -> &str {
        self.subject_instructor
            .get(&subject_id)
            .map(|entry| entry.instructor_name.as_str())
            .unwrap_or(UNKNOWN_INSTRUCTOR)
    }

    pub fn with_instructor(&self, subject: &Subject) -> SubjectWithInstructor {
        SubjectWithInstructor {
            subject: subject.clone(),
            instructor_name: self.instructor_name_of(subject.id).to_owned(),
        }
    }

    /// The active schedule entry. With several linked subjects the first in
    /// subject-collection order wins.
    pub fn current_schedule_entry(&self) -> Option<SubjectWithInstructor> {
        self.current_schedule
            .first()
            .map(|subject| self.with_instructor(subject))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup {
    pub instructor_name: String,
    pub subjects: Vec<Subject>,
}

pub fn grouped_subjects(
    reconciliation: &Reconciliation,
    instructors: &[Person],
) -> Vec<SubjectGroup> {
    reconciliation
        .instructor_subjects
        .iter()
        .map(|(instructor_id, subjects)| SubjectGroup {
            instructor_name: instructors
                .iter()
                .find(|inst| inst.id == *instructor_id)
                .and_then(Person::display_name)
                .unwrap_or(UNKNOWN_INSTRUCTOR)
                .to_owned(),
            subjects: subjects.clone(),
        })
        .collect()
}

/* instructor match keeps the whole group, otherwise only matching subject names survive */
pub fn filter_groups(groups: &[SubjectGroup], query: &str) -> Vec<SubjectGroup> {
    let query = query.to_lowercase();
    groups
        .iter()
        .filter_map(|group| {
            if group.instructor_name.to_lowercase().contains(&query) {
                return Some(group.clone());
            }
            let subjects = group
                .subjects
                .iter()
                .filter(|subject| {
                    subject
                        .name
                        .as_ref()
                        .is_some_and(|name| name.to_lowercase().contains(&query))
                })
                .cloned()
                .collect::<Vec<_>>();
            if subjects.is_empty() {
                None
            } else {
                Some(SubjectGroup {
                    instructor_name: group.instructor_name.clone(),
                    subjects,
                })
            }
        })
        .collect()
}

/// Renders `HH:MM[:SS]` as a 12-hour clock time.
pub fn format_time(time: Option<&str>) -> String {
    let Some(time) = time.filter(|t| !t.is_empty()) else {
        return "Invalid Time".to_owned();
    };
    let mut parts = time.split(':');
    let (Some(hours), Some(minutes)) = (parts.next(), parts.next()) else {
        return "Invalid Time".to_owned();
    };
    let Ok(hours) = hours.trim().parse::<u32>() else {
        return "Invalid Time".to_owned();
    };
    let ampm = if hours >= 12 { "PM" } else { "AM" };
    let hours = match hours % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{} {}", hours, minutes, ampm)
}

/* form string of information about a subject */
pub fn format_subject_as_string(subject: &Subject) -> String {
    format!(
        "  [{}] {}\n    Code: {}\n    Every: {}\n    Time: {} - {}\n    Section: {}\n    {}\n",
        subject.id,
        subject.name.as_deref().unwrap_or("Unknown Subject"),
        subject.code.as_deref().unwrap_or("N/A"),
        subject.day.as_deref().unwrap_or("Unknown Day"),
        format_time(subject.start_time.as_deref()),
        format_time(subject.end_time.as_deref()),
        subject.section.as_deref().unwrap_or("N/A"),
        subject
            .description
            .as_deref()
            .unwrap_or("No description available"),
    )
}

pub fn format_groups(groups: &[SubjectGroup]) -> String {
    groups
        .iter()
        .map(|group| {
            let subjects = if group.subjects.is_empty() {
                "  No subjects available\n".to_owned()
            } else {
                group
                    .subjects
                    .iter()
                    .map(format_subject_as_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            format!("{}\n{}", group.instructor_name, subjects)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_schedule_entry(entry: &SubjectWithInstructor) -> String {
    format!(
        "Instructor: {}\n{}",
        entry.instructor_name,
        format_subject_as_string(&entry.subject)
    )
}

pub fn guideline_image_url(storage_base_url: &str, guideline: &Guideline) -> Option<String> {
    guideline
        .image
        .as_deref()
        .filter(|image| !image.is_empty())
        .map(|image| {
            format!(
                "{}/{}",
                storage_base_url.trim_end_matches('/'),
                image.trim_start_matches('/')
            )
        })
}

pub fn format_guidelines(storage_base_url: &str, guidelines: &[Guideline]) -> String {
    guidelines
        .iter()
        .map(|guideline| {
            format!(
                "{}\n  {}\n",
                guideline.title,
                guideline_image_url(storage_base_url, guideline)
                    .unwrap_or_else(|| "No Image".to_owned())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rows without an email never match.
pub fn find_person_by_email<'a>(people: &'a [Person], email: &str) -> Option<&'a Person> {
    people
        .iter()
        .find(|person| !person.email.is_empty() && person.email == email)
}

/// Persists the active schedule entry, or clears it when nothing is scheduled.
pub fn save_current_schedule<S: SessionStore>(
    store: &S,
    reconciliation: &Reconciliation,
) -> Result<Option<SubjectWithInstructor>, LockupError> {
    match reconciliation.current_schedule_entry() {
        Some(entry) => {
            info!(
                "Saving current schedule: subject {} with {}",
                entry.subject.id, entry.instructor_name
            );
            store.save(CURRENT_SCHEDULE_KEY, &entry)?;
            Ok(Some(entry))
        }
        None => {
            store.remove_item(CURRENT_SCHEDULE_KEY)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;
