use std::{fmt, path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

pub mod directory_model;
pub mod identity_model;
pub mod session_model;

/// Which directory a user logs in against.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl Role {
    /// Session store key holding the merged record for this role.
    pub fn session_key(self) -> &'static str {
        match self {
            Role::Student => STUDENT_DATA_KEY,
            Role::Instructor => USER_DATA_KEY,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Instructor => write!(f, "instructor"),
        }
    }
}

pub const USER_DATA_KEY: &str = "userData";
pub const STUDENT_DATA_KEY: &str = "studentData";
pub const CURRENT_SCHEDULE_KEY: &str = "currentSchedule";

/// A model for describing ARGS of the tool.
/// Consists of:
/// 1. Path to config.json, that provides API endpoints, OAuth client and timing parameters.
/// 2. The command to run.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config_json_path: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the identity provider URL to open in a browser.
    AuthUrl {
        #[arg(long, value_enum)]
        role: Role,
    },
    /// Exchange an access token for a profile and store the session.
    Login {
        #[arg(long, value_enum)]
        role: Role,
        #[arg(long, value_name = "TOKEN")]
        access_token: String,
    },
    /// Show the stored session, if any.
    Whoami,
    /// Forget the stored session and current schedule.
    Logout,
    /// List subjects grouped by instructor.
    Directory {
        #[arg(long)]
        search: Option<String>,
    },
    /// Show the current schedule and persist the active entry.
    Schedule,
    /// List laboratory guidelines.
    Guidelines,
    /// Enroll the logged-in student into a subject.
    Enroll {
        #[arg(long)]
        subject_id: u32,
        #[arg(long)]
        key: String,
    },
    /// Re-fetch the directory periodically.
    Watch {
        #[arg(long)]
        cycles: Option<usize>,
    },
}

/// A model for describing configuration of the tool.
/// Consists of:
/// 1. LockUp REST API base and storage base used for guideline images
/// 2. Identity provider authorization and userinfo endpoints
/// 3. OAuth client id and redirect uri
/// 4. Login timeouts per role, HTTP request timeouts and polling interval
/// 5. Path to the local session store
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub storage_base_url: String,
    pub authorization_endpoint: String,
    pub userinfo_endpoint: String,
    pub oauth_client_id: String,
    pub oauth_redirect_uri: String,
    pub student_login_timeout_secs: u64,
    pub instructor_login_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub session_json_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: "https://lockup.pro/api".to_owned(),
            storage_base_url: "https://lockup.pro/storage".to_owned(),
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_owned(),
            userinfo_endpoint: "https://www.googleapis.com/userinfo/v2/me".to_owned(),
            oauth_client_id: String::new(),
            oauth_redirect_uri: "http://localhost:8080/callback".to_owned(),
            student_login_timeout_secs: 10,
            instructor_login_timeout_secs: 30,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            poll_interval_ms: 1000,
            session_json_path: PathBuf::from("session.json"),
        }
    }
}

impl Config {
    pub fn login_timeout(&self, role: Role) -> Duration {
        Duration::from_secs(match role {
            Role::Student => self.student_login_timeout_secs,
            Role::Instructor => self.instructor_login_timeout_secs,
        })
    }
}
