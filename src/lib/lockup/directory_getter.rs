use log::{error, info};

use super::{
    api_client::ApiClient,
    error::LockupError,
    models::directory_model::{
        EnrollmentRequest, EnrollmentResponse, Guideline, LinkRecord, Person, Subject,
    },
};

/// A trait, necessary for every entity that will be used for talking to the LockUp backend.
#[allow(async_fn_in_trait)]
pub trait DirectoryGetter {
    async fn get_subjects(&self) -> Result<Vec<Subject>, LockupError>;
    async fn get_instructors(&self) -> Result<Vec<Person>, LockupError>;
    async fn get_students(&self) -> Result<Vec<Person>, LockupError>;
    async fn get_links(&self) -> Result<Vec<LinkRecord>, LockupError>;
    async fn get_guidelines(&self) -> Result<Vec<Guideline>, LockupError>;
    async fn post_enrollment(
        &self,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentResponse, LockupError>;
}

/// Allows to use ApiClient for getting the directory via requests to LockUp resource.
impl DirectoryGetter for ApiClient {
    async fn get_subjects(&self) -> Result<Vec<Subject>, LockupError> {
        self.get_collection("subs").await
    }

    async fn get_instructors(&self) -> Result<Vec<Person>, LockupError> {
        self.get_collection("instructors").await
    }

    async fn get_students(&self) -> Result<Vec<Person>, LockupError> {
        self.get_collection("students").await
    }

    async fn get_links(&self) -> Result<Vec<LinkRecord>, LockupError> {
        self.get_collection("linkedSubjects").await
    }

    async fn get_guidelines(&self) -> Result<Vec<Guideline>, LockupError> {
        self.get_collection("posts").await
    }

    async fn post_enrollment(
        &self,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentResponse, LockupError> {
        info!(
            "Enrolling student {} into subject {}",
            request.student_id, request.subject_id
        );
        let response = self
            .http
            .post(self.endpoint("student-subjects"))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// The three raw collections reconciliation works on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    pub subjects: Vec<Subject>,
    pub instructors: Vec<Person>,
    pub links: Vec<LinkRecord>,
}

/// Logs a failed fetch and degrades it to an empty collection.
pub fn or_empty<T>(result: Result<Vec<T>, LockupError>, what: &str) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(err) => {
            error!("Error fetching {}: {}", what, err);
            Vec::new()
        }
    }
}

/// Fetches subjects, instructors and link records concurrently. Never fails:
/// a collection that could not be fetched is empty.
pub async fn fetch_directory<DG: DirectoryGetter>(getter: &DG) -> Directory {
    let (subjects, instructors, links) = futures::join!(
        getter.get_subjects(),
        getter.get_instructors(),
        getter.get_links()
    );
    let directory = Directory {
        subjects: or_empty(subjects, "subjects"),
        instructors: or_empty(instructors, "instructors"),
        links: or_empty(links, "linked subjects"),
    };
    info!(
        "Collected {} subjects, {} instructors, {} links",
        directory.subjects.len(),
        directory.instructors.len(),
        directory.links.len()
    );
    directory
}
