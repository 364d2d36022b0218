use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use futures::future;
use lib::lockup::auth::{login, stored_session};
use lib::lockup::directory_getter::{fetch_directory, DirectoryGetter};
use lib::lockup::enrollment::enroll;
use lib::lockup::error::LockupError;
use lib::lockup::helpers::decode_collection;
use lib::lockup::identity_provider::{authorization_url, IdentityProvider};
use lib::lockup::models::directory_model::{
    EnrollmentRequest, EnrollmentResponse, Guideline, LinkRecord, Person, Subject,
};
use lib::lockup::models::identity_model::Identity;
use lib::lockup::models::session_model::SessionRecord;
use lib::lockup::models::{
    Command, Config, Role, CURRENT_SCHEDULE_KEY, STUDENT_DATA_KEY, USER_DATA_KEY,
};
use lib::lockup::poller::{watch, DirectoryState, MAX_IN_FLIGHT};
use lib::lockup::run_tool::run;
use lib::lockup::session_store::{JsonFileStore, MemoryStore, SessionStore};
use serde::de::DeserializeOwned;
use serde_json::json;

fn read_fixture<T: DeserializeOwned>(path: &str) -> Vec<T> {
    let file = BufReader::new(File::open(path).unwrap());
    decode_collection(serde_json::from_reader(file).unwrap()).unwrap()
}

/// Serves the JSON fixtures under `tests/` in place of lockup.pro.
pub struct TestGetter {
    pub fail_students: bool,
    pub enrollment_status: String,
    pub posted: RefCell<Vec<EnrollmentRequest>>,
    pub subject_calls: Cell<usize>,
    /// Delay of the n-th subjects request; later requests use the last entry.
    pub subject_delays: Vec<Duration>,
}

impl Default for TestGetter {
    fn default() -> Self {
        TestGetter {
            fail_students: false,
            enrollment_status: "success".to_owned(),
            posted: RefCell::new(Vec::new()),
            subject_calls: Cell::new(0),
            subject_delays: Vec::new(),
        }
    }
}

impl DirectoryGetter for TestGetter {
    async fn get_subjects(&self) -> Result<Vec<Subject>, LockupError> {
        let call = self.subject_calls.get();
        self.subject_calls.set(call + 1);
        if let Some(delay) = self
            .subject_delays
            .get(call)
            .or(self.subject_delays.last())
        {
            tokio::time::sleep(*delay).await;
        }
        Ok(read_fixture("tests/test.subjects.json"))
    }

    async fn get_instructors(&self) -> Result<Vec<Person>, LockupError> {
        Ok(read_fixture("tests/test.instructors.json"))
    }

    async fn get_students(&self) -> Result<Vec<Person>, LockupError> {
        if self.fail_students {
            return Err(LockupError::Network {
                message: "503 Service Unavailable".to_owned(),
            });
        }
        Ok(read_fixture("tests/test.students.json"))
    }

    async fn get_links(&self) -> Result<Vec<LinkRecord>, LockupError> {
        Ok(read_fixture("tests/test.links.json"))
    }

    async fn get_guidelines(&self) -> Result<Vec<Guideline>, LockupError> {
        Ok(read_fixture("tests/test.guidelines.json"))
    }

    async fn post_enrollment(
        &self,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentResponse, LockupError> {
        self.posted.borrow_mut().push(request);
        Ok(EnrollmentResponse {
            status: self.enrollment_status.clone(),
        })
    }
}

pub struct TestProvider {
    pub identity: Option<Identity>,
    pub delay: Duration,
    pub answered: Cell<bool>,
}

impl TestProvider {
    fn answering(email: &str, name: &str) -> Self {
        TestProvider {
            identity: Some(Identity {
                email: email.to_owned(),
                name: name.to_owned(),
                picture: Some("https://lh3.googleusercontent.com/a/photo".to_owned()),
            }),
            delay: Duration::ZERO,
            answered: Cell::new(false),
        }
    }
}

impl IdentityProvider for TestProvider {
    async fn get_userinfo(&self, _access_token: &str) -> Option<Identity> {
        tokio::time::sleep(self.delay).await;
        self.answered.set(true);
        self.identity.clone()
    }
}

fn student_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .set_item(
            STUDENT_DATA_KEY,
            json!({ "id": 42, "name": "Ana Santos", "email": "ana@student.lockup.pro" }),
        )
        .unwrap();
    store
}

#[tokio::test]
async fn login_student_stores_merged_record() {
    let provider = TestProvider::answering("ana@student.lockup.pro", "Ana Maria Santos");
    let getter = TestGetter::default();
    let store = MemoryStore::new();

    let record = login(
        &provider,
        &getter,
        &store,
        Role::Student,
        "token",
        Duration::from_secs(10),
    )
    .await
    .unwrap();
    assert_eq!(record.person.id, 42);
    assert!(record.logged_in);

    let stored = store.get_item(STUDENT_DATA_KEY).unwrap().unwrap();
    assert_eq!(stored["id"], json!(42));
    assert_eq!(stored["name"], json!("Ana Santos"));
    assert_eq!(stored["fullname"], json!("Ana Maria Santos"));
    assert_eq!(stored["picture"], json!("https://lh3.googleusercontent.com/a/photo"));
    assert_eq!(stored["loggedIn"], json!(true));
    assert_eq!(stored["year_level"], json!(3));
    assert_eq!(store.get_item(USER_DATA_KEY).unwrap(), None);

    let (role, reloaded) = stored_session(&store).unwrap().unwrap();
    assert_eq!(role, Role::Student);
    assert_eq!(reloaded, record);
}

#[tokio::test]
async fn login_instructor_uses_user_data_key() {
    let provider = TestProvider::answering("cruz@lockup.pro", "Maria Cruz");
    let getter = TestGetter::default();
    let store = MemoryStore::new();

    login(
        &provider,
        &getter,
        &store,
        Role::Instructor,
        "token",
        Duration::from_secs(30),
    )
    .await
    .unwrap();

    let stored: SessionRecord = store.load(USER_DATA_KEY).unwrap().unwrap();
    assert_eq!(stored.person.id, 9);
    assert_eq!(stored.person.username.as_deref(), Some("Dr. Cruz"));
    assert_eq!(store.keys(), vec![USER_DATA_KEY.to_owned()]);
}

#[tokio::test]
async fn login_with_wrong_role_is_not_registered() {
    let provider = TestProvider::answering("ana@student.lockup.pro", "Ana");
    let getter = TestGetter::default();
    let store = MemoryStore::new();

    let err = login(
        &provider,
        &getter,
        &store,
        Role::Instructor,
        "token",
        Duration::from_secs(30),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LockupError::NotRegistered));
    assert_eq!(
        err.alert_message(),
        "Your email is not registered, please contact the administrator."
    );
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn login_failed_directory_fetch_is_empty_directory() {
    let provider = TestProvider::answering("ana@student.lockup.pro", "Ana");
    let getter = TestGetter {
        fail_students: true,
        ..TestGetter::default()
    };
    let store = MemoryStore::new();

    let err = login(
        &provider,
        &getter,
        &store,
        Role::Student,
        "token",
        Duration::from_secs(30),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LockupError::NotRegistered));
}

#[tokio::test]
async fn login_without_profile() {
    let provider = TestProvider {
        identity: None,
        delay: Duration::ZERO,
        answered: Cell::new(false),
    };
    let store = MemoryStore::new();

    let err = login(
        &provider,
        &TestGetter::default(),
        &store,
        Role::Student,
        "expired",
        Duration::from_secs(30),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LockupError::UserInfo));
    assert!(store.keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_timeout_never_writes_late_session() {
    let mut provider = TestProvider::answering("ana@student.lockup.pro", "Ana");
    provider.delay = Duration::from_secs(11);
    let getter = TestGetter::default();
    let store = MemoryStore::new();

    let err = login(
        &provider,
        &getter,
        &store,
        Role::Student,
        "token",
        Duration::from_secs(10),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LockupError::Timeout));

    // the response would have arrived one second after the deadline
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!provider.answered.get());
    assert_eq!(store.get_item(STUDENT_DATA_KEY).unwrap(), None);
}

#[tokio::test]
async fn enroll_with_matching_key_posts_link() {
    let getter = TestGetter::default();
    let store = student_store();

    let subject = enroll(&getter, &store, 1, "ABC123").await.unwrap();
    assert_eq!(subject.id, 1);
    assert_eq!(
        *getter.posted.borrow(),
        vec![EnrollmentRequest {
            student_id: 42,
            subject_id: 1
        }]
    );
}

#[tokio::test]
async fn enroll_with_wrong_key_never_posts() {
    let getter = TestGetter::default();
    let store = student_store();

    let err = enroll(&getter, &store, 1, "abc123").await.unwrap_err();
    assert!(matches!(err, LockupError::InvalidEnrollmentKey));
    assert_eq!(err.alert_message(), "Invalid enrolment key.");

    // subject 3 has no key at all
    let err = enroll(&getter, &store, 3, "ABC123").await.unwrap_err();
    assert!(matches!(err, LockupError::InvalidEnrollmentKey));
    assert!(getter.posted.borrow().is_empty());
}

#[tokio::test]
async fn enroll_validation_failures() {
    let getter = TestGetter::default();

    let err = enroll(&getter, &student_store(), 1, "").await.unwrap_err();
    assert!(matches!(err, LockupError::MissingEnrollmentKey));
    assert_eq!(getter.subject_calls.get(), 0);

    let err = enroll(&getter, &student_store(), 77, "ABC123").await.unwrap_err();
    assert!(matches!(err, LockupError::SubjectNotFound));

    let err = enroll(&getter, &MemoryStore::new(), 1, "ABC123")
        .await
        .unwrap_err();
    assert!(matches!(err, LockupError::NoStoredUser));

    let idless = MemoryStore::new();
    idless
        .set_item(STUDENT_DATA_KEY, json!({ "name": "Ana Santos" }))
        .unwrap();
    let err = enroll(&getter, &idless, 1, "ABC123").await.unwrap_err();
    assert!(matches!(err, LockupError::InvalidStoredUser));

    assert!(getter.posted.borrow().is_empty());
}

#[tokio::test]
async fn enroll_rejected_by_backend() {
    let getter = TestGetter {
        enrollment_status: "error".to_owned(),
        ..TestGetter::default()
    };

    let err = enroll(&getter, &student_store(), 2, "NET456")
        .await
        .unwrap_err();
    assert!(matches!(err, LockupError::EnrollmentRejected { .. }));
    assert_eq!(err.alert_message(), "Failed to enroll in the subject.");
    assert_eq!(getter.posted.borrow().len(), 1);
}

#[tokio::test]
async fn fetch_directory_collects_all_collections() {
    let directory = fetch_directory(&TestGetter::default()).await;
    assert_eq!(directory.subjects.len(), 3);
    assert_eq!(directory.instructors.len(), 2);
    assert_eq!(directory.links.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn watch_discards_stale_cycles() {
    // the first cycle is slower than the two after it
    let getter = TestGetter {
        subject_delays: vec![Duration::from_millis(2500), Duration::from_millis(100)],
        ..TestGetter::default()
    };
    let store = MemoryStore::new();

    let state = watch(
        &getter,
        &store,
        Duration::from_secs(1),
        Some(3),
        future::pending(),
    )
    .await;

    assert_eq!(state.committed_epoch(), 4);
    assert_eq!(state.discarded(), 1);
    let snapshot = state.latest().unwrap();
    assert_eq!(snapshot.epoch, 4);
    assert_eq!(
        snapshot.reconciliation.subject_instructor[&1].instructor_name,
        "Dr. Cruz"
    );

    let current = store.get_item(CURRENT_SCHEDULE_KEY).unwrap().unwrap();
    assert_eq!(current["id"], json!(1));
    assert_eq!(current["instructorName"], json!("Dr. Cruz"));
}

#[tokio::test]
async fn watch_stops_on_shutdown() {
    let store = MemoryStore::new();
    let state = watch(
        &TestGetter::default(),
        &store,
        Duration::from_secs(1),
        None,
        future::ready(()),
    )
    .await;
    assert!(state.latest().is_none());
}

/// A store whose writes always fail.
struct ReadOnlyStore;

impl SessionStore for ReadOnlyStore {
    fn get_item(&self, _key: &str) -> Result<Option<serde_json::Value>, LockupError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: serde_json::Value) -> Result<(), LockupError> {
        Err(LockupError::Storage {
            message: "read-only file system".to_owned(),
        })
    }

    fn remove_item(&self, _key: &str) -> Result<(), LockupError> {
        Err(LockupError::Storage {
            message: "read-only file system".to_owned(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn watch_keeps_polling_when_schedule_write_fails() {
    let getter = TestGetter::default();

    let state = watch(
        &getter,
        &ReadOnlyStore,
        Duration::from_secs(1),
        Some(3),
        future::pending(),
    )
    .await;

    assert_eq!(state.committed_epoch(), 3);
    assert_eq!(getter.subject_calls.get(), 3);
    assert!(state.latest().is_some());
}

#[tokio::test(start_paused = true)]
async fn watch_caps_cycles_in_flight() {
    let getter = TestGetter {
        subject_delays: vec![Duration::from_secs(60)],
        ..TestGetter::default()
    };
    let store = MemoryStore::new();

    let state = watch(
        &getter,
        &store,
        Duration::from_secs(1),
        None,
        tokio::time::sleep(Duration::from_millis(10_500)),
    )
    .await;

    assert_eq!(getter.subject_calls.get(), MAX_IN_FLIGHT);
    assert_eq!(state.committed_epoch(), 0);
    assert!(state.latest().is_none());
}

#[test]
fn directory_state_rejects_older_epochs() {
    let mut state = DirectoryState::new();
    let first = state.begin();
    let second = state.begin();

    assert!(state.commit(second, Default::default(), Default::default()));
    assert!(!state.commit(first, Default::default(), Default::default()));
    assert!(!state.commit(second, Default::default(), Default::default()));
    assert_eq!(state.committed_epoch(), second);
    assert_eq!(state.discarded(), 2);
}

#[test]
fn json_file_store_persists_between_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let store = JsonFileStore::new(&path);
    assert_eq!(store.get_item(USER_DATA_KEY).unwrap(), None);

    store.set_item(USER_DATA_KEY, json!({ "id": 9 })).unwrap();
    store
        .set_item(CURRENT_SCHEDULE_KEY, json!({ "id": 1 }))
        .unwrap();

    let reopened = JsonFileStore::new(&path);
    assert_eq!(
        reopened.get_item(USER_DATA_KEY).unwrap(),
        Some(json!({ "id": 9 }))
    );
    reopened.remove_item(CURRENT_SCHEDULE_KEY).unwrap();
    assert_eq!(store.get_item(CURRENT_SCHEDULE_KEY).unwrap(), None);
    assert_eq!(store.get_item(USER_DATA_KEY).unwrap(), Some(json!({ "id": 9 })));
}

#[test]
fn authorization_url_carries_client_and_role() {
    let config = Config {
        oauth_client_id: "client-1".to_owned(),
        ..Config::default()
    };
    let url = authorization_url(&config, Role::Instructor).unwrap();
    let query = url.query_pairs().into_owned().collect::<Vec<_>>();

    assert_eq!(url.host_str(), Some("accounts.google.com"));
    assert!(query.contains(&("client_id".to_owned(), "client-1".to_owned())));
    assert!(query.contains(&("response_type".to_owned(), "token".to_owned())));
    assert!(query.contains(&("state".to_owned(), "instructor".to_owned())));
}

#[tokio::test]
async fn run_directory_with_search() {
    let provider = TestProvider::answering("ana@student.lockup.pro", "Ana");
    let config = Config::default();
    let store = MemoryStore::new();

    let output = run(
        &provider,
        &TestGetter::default(),
        &store,
        &config,
        Command::Directory {
            search: Some("cruz".to_owned()),
        },
        future::pending(),
    )
    .await
    .unwrap();
    assert!(output.starts_with("Dr. Cruz\n"));
    assert!(output.contains("OS Lab"));
    assert!(output.contains("Time: 8:30 AM - 10:00 AM"));
    assert!(!output.contains("Prof. Reyes"));

    let nothing = run(
        &provider,
        &TestGetter::default(),
        &store,
        &config,
        Command::Directory {
            search: Some("chemistry".to_owned()),
        },
        future::pending(),
    )
    .await
    .unwrap();
    assert_eq!(nothing, "No subjects available");
}

#[tokio::test]
async fn run_session_lifecycle() {
    let provider = TestProvider::answering("ana@student.lockup.pro", "Ana Maria Santos");
    let getter = TestGetter::default();
    let config = Config::default();
    let store = MemoryStore::new();

    let whoami = run(&provider, &getter, &store, &config, Command::Whoami, future::pending())
        .await
        .unwrap();
    assert_eq!(whoami, "Not logged in");

    let welcome = run(
        &provider,
        &getter,
        &store,
        &config,
        Command::Login {
            role: Role::Student,
            access_token: "token".to_owned(),
        },
        future::pending(),
    )
    .await
    .unwrap();
    assert_eq!(welcome, "Welcome, Ana Maria Santos!");

    let schedule = run(&provider, &getter, &store, &config, Command::Schedule, future::pending())
        .await
        .unwrap();
    assert!(schedule.starts_with("Current schedule (3 linked subject(s)):\nInstructor: Dr. Cruz"));

    let whoami = run(&provider, &getter, &store, &config, Command::Whoami, future::pending())
        .await
        .unwrap();
    assert_eq!(
        whoami,
        "Logged in as Ana Maria Santos <ana@student.lockup.pro> (student)"
    );

    run(&provider, &getter, &store, &config, Command::Logout, future::pending())
        .await
        .unwrap();
    assert!(store.keys().is_empty());
}
