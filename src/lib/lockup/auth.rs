use std::time::Duration;

use log::{info, warn};

use super::{
    directory_getter::{or_empty, DirectoryGetter},
    error::LockupError,
    helpers::find_person_by_email,
    identity_provider::IdentityProvider,
    models::{session_model::SessionRecord, Role, CURRENT_SCHEDULE_KEY},
    session_store::SessionStore,
};

/// Exchanges the token for a profile and matches it against the role's directory.
/// Students and instructors are fetched together.
pub async fn resolve_session<IP: IdentityProvider, DG: DirectoryGetter>(
    provider: &IP,
    getter: &DG,
    role: Role,
    access_token: &str,
) -> Result<SessionRecord, LockupError> {
    let identity = provider
        .get_userinfo(access_token)
        .await
        .ok_or(LockupError::UserInfo)?;
    info!("User info fetched for {}", identity.email);

    let (students, instructors) = futures::join!(getter.get_students(), getter.get_instructors());
    let people = match role {
        Role::Student => or_empty(students, "students"),
        Role::Instructor => or_empty(instructors, "instructors"),
    };

    let person = find_person_by_email(&people, &identity.email)
        .cloned()
        .ok_or(LockupError::NotRegistered)?;
    info!("Matched {} {} ({})", role, person.id, person.email);
    Ok(SessionRecord::merge(person, identity))
}

/// Runs the whole post-authorization sequence under `timeout`. The session is
/// written only once the bounded part finished in time; on expiry the pending
/// requests are dropped and nothing is stored.
pub async fn login<IP: IdentityProvider, DG: DirectoryGetter, S: SessionStore>(
    provider: &IP,
    getter: &DG,
    store: &S,
    role: Role,
    access_token: &str,
    timeout: Duration,
) -> Result<SessionRecord, LockupError> {
    let resolving = resolve_session(provider, getter, role, access_token);
    let record = tokio::time::timeout(timeout, resolving)
        .await
        .map_err(|_| {
            warn!("Login as {} did not finish within {:?}", role, timeout);
            LockupError::Timeout
        })??;

    store.save(role.session_key(), &record)?;
    info!("Stored {} session under {}", role, role.session_key());
    Ok(record)
}

/// First stored session, students before instructors.
pub fn stored_session<S: SessionStore>(
    store: &S,
) -> Result<Option<(Role, SessionRecord)>, LockupError> {
    for role in [Role::Student, Role::Instructor] {
        if let Some(record) = store.load::<SessionRecord>(role.session_key())? {
            return Ok(Some((role, record)));
        }
    }
    Ok(None)
}

pub fn logout<S: SessionStore>(store: &S) -> Result<(), LockupError> {
    for role in [Role::Student, Role::Instructor] {
        store.remove_item(role.session_key())?;
    }
    store.remove_item(CURRENT_SCHEDULE_KEY)?;
    info!("Session cleared");
    Ok(())
}
