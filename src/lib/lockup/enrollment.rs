use log::{debug, info};
use serde_json::Value;

use super::{
    directory_getter::DirectoryGetter,
    error::LockupError,
    models::{
        directory_model::{EnrollmentRequest, Subject},
        STUDENT_DATA_KEY,
    },
    session_store::SessionStore,
};

pub const ENROLLMENT_SUCCESS: &str = "success";

/// Verifies `key` against the subject's enrollment key as currently served by
/// the backend, then links the stored student to the subject.
pub async fn enroll<DG: DirectoryGetter, S: SessionStore>(
    getter: &DG,
    store: &S,
    subject_id: u32,
    key: &str,
) -> Result<Subject, LockupError> {
    if key.is_empty() {
        return Err(LockupError::MissingEnrollmentKey);
    }

    let subject = getter
        .get_subjects()
        .await?
        .into_iter()
        .find(|subject| subject.id == subject_id)
        .ok_or(LockupError::SubjectNotFound)?;

    if subject.enrollment_key.as_deref() != Some(key) {
        return Err(LockupError::InvalidEnrollmentKey);
    }

    let user = store
        .get_item(STUDENT_DATA_KEY)?
        .ok_or(LockupError::NoStoredUser)?;
    let student_id = user
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| {
            debug!("Stored user data without a usable id: {}", user);
            LockupError::InvalidStoredUser
        })?;

    let request = EnrollmentRequest {
        student_id,
        subject_id: subject.id,
    };
    let response = getter.post_enrollment(request).await?;
    debug!("Enrollment answered with status {:?}", response.status);

    if response.status == ENROLLMENT_SUCCESS {
        info!("Student {} enrolled into subject {}", student_id, subject.id);
        Ok(subject)
    } else {
        Err(LockupError::EnrollmentRejected {
            status: response.status,
        })
    }
}
