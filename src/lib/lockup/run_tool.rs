use std::{future::Future, time::Duration};

use super::{
    auth::{login, logout, stored_session},
    directory_getter::{fetch_directory, or_empty, DirectoryGetter},
    enrollment::enroll,
    error::LockupError,
    helpers::{
        filter_groups, format_groups, format_guidelines, format_schedule_entry, grouped_subjects,
        reconcile, save_current_schedule,
    },
    identity_provider::{authorization_url, IdentityProvider},
    models::{Command, Config},
    poller::watch,
    session_store::SessionStore,
};

/// Runs one command and returns the text to show the user. `shutdown` only
/// matters for `watch`.
pub async fn run<IP, DG, S, F>(
    provider: &IP,
    getter: &DG,
    store: &S,
    config: &Config,
    command: Command,
    shutdown: F,
) -> Result<String, LockupError>
where
    IP: IdentityProvider,
    DG: DirectoryGetter,
    S: SessionStore,
    F: Future<Output = ()>,
{
    match command {
        Command::AuthUrl { role } => {
            let url = authorization_url(config, role)?;
            Ok(format!("Open this URL to log in as {}:\n{}", role, url))
        }
        Command::Login { role, access_token } => {
            let record = login(
                provider,
                getter,
                store,
                role,
                &access_token,
                config.login_timeout(role),
            )
            .await?;
            Ok(format!("Welcome, {}!", record.fullname))
        }
        Command::Whoami => Ok(match stored_session(store)? {
            Some((role, record)) => format!(
                "Logged in as {} <{}> ({})",
                record.fullname, record.person.email, role
            ),
            None => "Not logged in".to_owned(),
        }),
        Command::Logout => {
            logout(store)?;
            Ok("Logged out".to_owned())
        }
        Command::Directory { search } => {
            let directory = fetch_directory(getter).await;
            let reconciliation =
                reconcile(&directory.subjects, &directory.instructors, &directory.links);
            let groups = grouped_subjects(&reconciliation, &directory.instructors);
            let groups = match search.as_deref() {
                Some(query) => filter_groups(&groups, query),
                None => groups,
            };
            if groups.is_empty() {
                Ok("No subjects available".to_owned())
            } else {
                Ok(format_groups(&groups))
            }
        }
        Command::Schedule => {
            let directory = fetch_directory(getter).await;
            let reconciliation =
                reconcile(&directory.subjects, &directory.instructors, &directory.links);
            Ok(match save_current_schedule(store, &reconciliation)? {
                Some(entry) => format!(
                    "Current schedule ({} linked subject(s)):\n{}",
                    reconciliation.current_schedule.len(),
                    format_schedule_entry(&entry)
                ),
                None => "No current schedule".to_owned(),
            })
        }
        Command::Guidelines => {
            let guidelines = or_empty(getter.get_guidelines().await, "lab guidelines");
            if guidelines.is_empty() {
                Ok("No guidelines available".to_owned())
            } else {
                Ok(format_guidelines(&config.storage_base_url, &guidelines))
            }
        }
        Command::Enroll { subject_id, key } => {
            let subject = enroll(getter, store, subject_id, &key).await?;
            Ok(format!(
                "Student successfully associated with the subject {}.",
                subject.name.as_deref().unwrap_or("Unknown Subject")
            ))
        }
        Command::Watch { cycles } => {
            let state = watch(
                getter,
                store,
                Duration::from_millis(config.poll_interval_ms),
                cycles,
                shutdown,
            )
            .await;
            Ok(format!(
                "Committed directory cycle {}, discarded {} stale cycle(s)",
                state.committed_epoch(),
                state.discarded()
            ))
        }
    }
}
