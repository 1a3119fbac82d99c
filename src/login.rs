//! Accounts and sessions.
//!
//! Users live in `<database>/users.json`, keyed by username, with Argon2
//! password hashes. Sessions are held in memory and identified by the
//! `session` cookie.

use crate::app::SharedState;
use crate::calculator::UserReference;
use crate::mailer::{self, generate_reset_code};
use crate::templates::{Notice, render};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fs::{self, File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Registered application user
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// Username (unique identifier for the user)
    pub username: String,

    /// Email address (unique, used for password recovery)
    pub email: String,

    /// Argon2 hash of the user's password
    pub password_hash: String,

    /// Password reset code (if a reset has been requested)
    pub reset_code: Option<String>,

    /// Expiration time for the reset code
    pub reset_code_expires: Option<SystemTime>,

    /// File name of the uploaded profile picture, inside the user's directory
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// Login and registration form
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,

    /// Required for registration, ignored on login
    #[serde(default)]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub email: String,
    pub reset_code: String,
    pub new_password: String,
}

/// Password change form. The user comes from the session, not the form.
#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// User session data
#[derive(Debug, Clone)]
pub struct Session {
    /// Username of the authenticated user
    pub user_id: String,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Username, email and password cannot be empty")]
    MissingFields,

    #[error("Usernames may only contain letters, digits, '_' and '-' (at most 32)")]
    InvalidUsername,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email address is already registered")]
    EmailTaken,

    #[error("Email not found")]
    EmailNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("No reset code found")]
    NoResetCode,

    #[error("Reset code expired")]
    ResetCodeExpired,

    #[error("Invalid reset code")]
    InvalidResetCode,

    #[error("Invalid old password")]
    WrongPassword,

    #[error("New passwords don't match")]
    PasswordMismatch,

    #[error("Password hashing failed")]
    Hash,

    #[error("Invalid password hash format")]
    CorruptHash,

    #[error("user database I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("user database is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("user database lock poisoned")]
    Poisoned,
}

impl AccountError {
    /// Whether the error is the user's to fix rather than a server fault.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            AccountError::Hash
                | AccountError::CorruptHash
                | AccountError::Io(_)
                | AccountError::Json(_)
                | AccountError::Poisoned
        )
    }
}

lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,32}$").unwrap();
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

const USERS_FILE: &str = "users.json";
const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds
const RESET_CODE_DURATION: u64 = 60 * 60;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// File-backed user registry
pub struct UserDatabase {
    dir: PathBuf,
    // Serializes read-modify-write cycles on users.json
    lock: Mutex<()>,
}

impl UserDatabase {
    /// Opens the database directory, creating it and an empty users file if
    /// they don't exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AccountError> {
        let dir = dir.into();
        if !dir.exists() {
            create_dir_all(&dir)?;
        }

        let users_path = dir.join(USERS_FILE);
        if !users_path.exists() {
            let mut file = File::create(&users_path)?;
            file.write_all(b"{}")?;
        }

        Ok(UserDatabase {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding a user's own files
    pub fn user_dir(&self, username: &str) -> PathBuf {
        self.dir.join(username)
    }

    /// Get all registered users, keyed by username
    pub fn get_users(&self) -> Result<HashMap<String, User>, AccountError> {
        let contents = fs::read_to_string(self.dir.join(USERS_FILE))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn get_user(&self, username: &str) -> Result<Option<User>, AccountError> {
        Ok(self.get_users()?.remove(username))
    }

    fn save_users(&self, users: &HashMap<String, User>) -> Result<(), AccountError> {
        let json = serde_json::to_string_pretty(users)?;
        fs::write(self.dir.join(USERS_FILE), json)?;
        Ok(())
    }

    /// Loads users, applies `f`, and saves only if `f` succeeded.
    fn update<T, F>(&self, f: F) -> Result<T, AccountError>
    where
        F: FnOnce(&mut HashMap<String, User>) -> Result<T, AccountError>,
    {
        let _guard = self.lock.lock().map_err(|_| AccountError::Poisoned)?;
        let mut users = self.get_users()?;
        let value = f(&mut users)?;
        self.save_users(&users)?;
        Ok(value)
    }

    /// Register a new user
    ///
    /// The password is hashed before storage and a directory is created for
    /// the user's files.
    ///
    /// # Errors
    /// * Any field empty, a malformed username or email
    /// * Username or email already registered
    pub fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AccountError> {
        if username.is_empty() || password.is_empty() || email.is_empty() {
            return Err(AccountError::MissingFields);
        }
        if !USERNAME_REGEX.is_match(username) {
            return Err(AccountError::InvalidUsername);
        }
        if !is_valid_email(email) {
            return Err(AccountError::InvalidEmail);
        }

        self.update(|users| {
            // Usernames name directories on disk, so compare case-insensitively
            if users.keys().any(|name| name.eq_ignore_ascii_case(username)) {
                return Err(AccountError::UsernameTaken);
            }
            if users.values().any(|user| user.email.eq_ignore_ascii_case(email)) {
                return Err(AccountError::EmailTaken);
            }

            let password_hash = hash_password(password)?;
            create_dir_all(self.user_dir(username))?;

            users.insert(
                username.to_string(),
                User {
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash,
                    reset_code: None,
                    reset_code_expires: None,
                    profile_picture: None,
                },
            );
            Ok(())
        })?;

        info!("registered user {}", username);
        Ok(())
    }

    /// Checks whether the username and password match a registered user.
    pub fn verify_user(&self, username: &str, password: &str) -> Result<bool, AccountError> {
        match self.get_user(username)? {
            Some(user) => verify_password(password, &user.password_hash),
            None => Ok(false),
        }
    }

    /// Issues a reset code for the account with this email and returns it.
    /// The code expires after one hour.
    pub fn start_password_reset(&self, email: &str) -> Result<String, AccountError> {
        self.update(|users| {
            let user = users
                .values_mut()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .ok_or(AccountError::EmailNotFound)?;

            let reset_code = generate_reset_code();
            user.reset_code = Some(reset_code.clone());
            user.reset_code_expires =
                Some(SystemTime::now() + Duration::from_secs(RESET_CODE_DURATION));
            Ok(reset_code)
        })
    }

    /// Sets a new password if `reset_code` matches and has not expired.
    pub fn confirm_password_reset(
        &self,
        email: &str,
        reset_code: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        self.confirm_password_reset_at(email, reset_code, new_password, SystemTime::now())
    }

    fn confirm_password_reset_at(
        &self,
        email: &str,
        reset_code: &str,
        new_password: &str,
        now: SystemTime,
    ) -> Result<(), AccountError> {
        if new_password.is_empty() {
            return Err(AccountError::MissingFields);
        }

        self.update(|users| {
            let user = users
                .values_mut()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .ok_or(AccountError::EmailNotFound)?;

            let stored_code = user.reset_code.as_ref().ok_or(AccountError::NoResetCode)?;
            let expires = user
                .reset_code_expires
                .ok_or(AccountError::ResetCodeExpired)?;

            if now > expires {
                return Err(AccountError::ResetCodeExpired);
            }
            if stored_code != reset_code {
                return Err(AccountError::InvalidResetCode);
            }

            user.password_hash = hash_password(new_password)?;
            user.reset_code = None;
            user.reset_code_expires = None;
            Ok(())
        })
    }

    /// Changes the password of a signed-in user after checking the old one.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AccountError> {
        if new_password.is_empty() {
            return Err(AccountError::MissingFields);
        }

        self.update(|users| {
            let user = users.get_mut(username).ok_or(AccountError::UserNotFound)?;

            if !verify_password(old_password, &user.password_hash)? {
                return Err(AccountError::WrongPassword);
            }
            if new_password != confirm_password {
                return Err(AccountError::PasswordMismatch);
            }

            user.password_hash = hash_password(new_password)?;
            Ok(())
        })
    }

    /// Records the profile picture file name for a user.
    pub fn set_profile_picture(&self, username: &str, file_name: &str) -> Result<(), AccountError> {
        self.update(|users| {
            let user = users.get_mut(username).ok_or(AccountError::UserNotFound)?;
            user.profile_picture = Some(file_name.to_string());
            Ok(())
        })
    }
}

fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AccountError::Hash)
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AccountError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AccountError::CorruptHash)?;

    // A mismatch is an error from argon2 but just `false` here
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Creates a session for an authenticated user and returns its id.
pub fn create_session(username: &str) -> String {
    let session_id = Uuid::new_v4().to_string();
    let now = SystemTime::now();

    let session = Session {
        user_id: username.to_string(),
        expires_at: now + Duration::from_secs(SESSION_DURATION),
    };

    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    // Expired sessions are dropped here; nothing else removes them
    sessions.retain(|_, session| session.expires_at > now);
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Returns the username for a live session.
pub fn validate_session(session_id: &str) -> Option<String> {
    let sessions = SESSIONS.read().unwrap_or_else(|e| e.into_inner());

    sessions
        .get(session_id)
        .filter(|session| session.expires_at > SystemTime::now())
        .map(|session| session.user_id.clone())
}

pub fn end_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    sessions.remove(session_id);
}

/// The signed-in user behind the request's session cookie, if any.
pub fn current_user(jar: &CookieJar) -> Option<UserReference> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| validate_session(cookie.value()))
        .map(UserReference::new)
}

fn session_cookie(session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn redirect_with(path: &str, key: &str, message: &str) -> Response {
    Redirect::to(&format!("{}?{}={}", path, key, urlencoding::encode(message))).into_response()
}

pub async fn serve_login_page(
    State(state): State<SharedState>,
    Query(notice): Query<Notice>,
) -> Response {
    render(&state.templates, "login", &json!({ "notice": notice }))
}

pub async fn serve_signup_page(
    State(state): State<SharedState>,
    Query(notice): Query<Notice>,
) -> Response {
    render(&state.templates, "signup", &json!({ "notice": notice }))
}

/// Verifies credentials and starts a session.
#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    match state
        .users
        .verify_user(&credentials.username, &credentials.password)
    {
        Ok(true) => {
            info!("user {} logged in", credentials.username);
            let session_id = create_session(&credentials.username);
            (jar.add(session_cookie(session_id)), Redirect::to("/")).into_response()
        }
        Ok(false) => {
            let page = render(
                &state.templates,
                "login",
                &json!({
                    "notice": Notice::error("Invalid username or password"),
                    "username": credentials.username,
                }),
            );
            (StatusCode::UNAUTHORIZED, page).into_response()
        }
        Err(e) => {
            warn!("login failed for {}: {}", credentials.username, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error").into_response()
        }
    }
}

pub async fn handle_signup(
    State(state): State<SharedState>,
    Form(credentials): Form<UserCredentials>,
) -> Response {
    match state.users.register_user(
        &credentials.username,
        &credentials.email,
        &credentials.password,
    ) {
        Ok(()) => Redirect::to("/login?success=Account+created%2C+please+log+in").into_response(),
        Err(e) if e.is_user_error() => {
            let page = render(
                &state.templates,
                "signup",
                &json!({
                    "notice": Notice::error(e.to_string()),
                    "username": credentials.username,
                    "email": credentials.email,
                }),
            );
            (StatusCode::BAD_REQUEST, page).into_response()
        }
        Err(e) => {
            warn!("signup failed for {}: {}", credentials.username, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Registration error").into_response()
        }
    }
}

/// Ends the session and clears the cookie.
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        end_session(cookie.value());
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResetPageQuery {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub notice: Notice,
}

pub async fn serve_forgot_password_page(
    State(state): State<SharedState>,
    Query(notice): Query<Notice>,
) -> Response {
    render(
        &state.templates,
        "password",
        &json!({ "mode_forgot": true, "notice": notice }),
    )
}

pub async fn serve_reset_password_page(
    State(state): State<SharedState>,
    Query(query): Query<ResetPageQuery>,
) -> Response {
    render(
        &state.templates,
        "password",
        &json!({ "mode_reset": true, "email": query.email, "notice": query.notice }),
    )
}

/// Issues a reset code and mails it.
pub async fn handle_forgot_password(
    State(state): State<SharedState>,
    Form(reset_req): Form<PasswordResetRequest>,
) -> Response {
    let reset_code = match state.users.start_password_reset(&reset_req.email) {
        Ok(code) => code,
        // Unknown addresses get the same redirect as known ones
        Err(AccountError::EmailNotFound) => {
            info!("password reset requested for unknown email");
            return reset_code_sent(&reset_req.email);
        }
        Err(e) if e.is_user_error() => {
            return redirect_with("/forgot-password", "error", &e.to_string());
        }
        Err(e) => {
            warn!("password reset failed: {}", e);
            return redirect_with("/forgot-password", "error", "Server error");
        }
    };

    let to = reset_req.email.clone();
    let sent = mailer::deliver(state.config.mail.clone(), move |mailer| {
        mailer.send_password_reset(&to, &reset_code)
    })
    .await;

    if let Err(e) = sent {
        warn!("failed to send reset code to {}: {}", reset_req.email, e);
        return redirect_with("/forgot-password", "error", "Failed to send email");
    }

    info!("sent password reset code to {}", reset_req.email);
    reset_code_sent(&reset_req.email)
}

fn reset_code_sent(email: &str) -> Response {
    Redirect::to(&format!(
        "/reset-password?success=Reset+code+sent&email={}",
        urlencoding::encode(email)
    ))
    .into_response()
}

pub async fn handle_reset_password(
    State(state): State<SharedState>,
    Form(reset_confirm): Form<PasswordResetConfirm>,
) -> Response {
    match state.users.confirm_password_reset(
        &reset_confirm.email,
        &reset_confirm.reset_code,
        &reset_confirm.new_password,
    ) {
        Ok(()) => redirect_with("/login", "success", "Password reset successful"),
        Err(e) => {
            let message = if e.is_user_error() {
                e.to_string()
            } else {
                warn!("password reset confirmation failed: {}", e);
                "Server error".to_string()
            };
            Redirect::to(&format!(
                "/reset-password?error={}&email={}",
                urlencoding::encode(&message),
                urlencoding::encode(&reset_confirm.email)
            ))
            .into_response()
        }
    }
}

pub async fn serve_change_password_page(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(notice): Query<Notice>,
) -> Response {
    let Some(user) = current_user(&jar) else {
        return Redirect::to("/login").into_response();
    };

    render(
        &state.templates,
        "password",
        &json!({ "mode_change": true, "user": user.username(), "notice": notice }),
    )
}

pub async fn handle_change_password(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(change_req): Form<PasswordChangeRequest>,
) -> Response {
    let Some(user) = current_user(&jar) else {
        return Redirect::to("/login").into_response();
    };

    match state.users.change_password(
        user.username(),
        &change_req.old_password,
        &change_req.new_password,
        &change_req.confirm_password,
    ) {
        Ok(()) => {
            info!("user {} changed their password", user.username());
            redirect_with("/change-password", "success", "Password changed successfully")
        }
        Err(e) if e.is_user_error() => redirect_with("/change-password", "error", &e.to_string()),
        Err(e) => {
            warn!("password change failed for {}: {}", user.username(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to change password").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, UserDatabase) {
        let tmp = TempDir::new().unwrap();
        let db = UserDatabase::open(tmp.path().join("database")).unwrap();
        (tmp, db)
    }

    #[test]
    fn test_register_and_verify() {
        let (_tmp, db) = open_db();
        db.register_user("alice", "alice@example.com", "hunter2")
            .unwrap();

        assert!(db.verify_user("alice", "hunter2").unwrap());
        assert!(!db.verify_user("alice", "wrong").unwrap());
        assert!(!db.verify_user("nobody", "hunter2").unwrap());
        assert!(db.user_dir("alice").is_dir());

        let stored = db.get_user("alice").unwrap().unwrap();
        assert_ne!(stored.password_hash, "hunter2");
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_input() {
        let (_tmp, db) = open_db();
        db.register_user("alice", "alice@example.com", "pw").unwrap();

        assert!(matches!(
            db.register_user("alice", "other@example.com", "pw"),
            Err(AccountError::UsernameTaken)
        ));
        assert!(matches!(
            db.register_user("Alice", "other@example.com", "pw"),
            Err(AccountError::UsernameTaken)
        ));
        assert!(matches!(
            db.register_user("alice2", "ALICE@example.com", "pw"),
            Err(AccountError::EmailTaken)
        ));
        assert!(matches!(
            db.register_user("", "x@example.com", "pw"),
            Err(AccountError::MissingFields)
        ));
        assert!(matches!(
            db.register_user("../root", "x@example.com", "pw"),
            Err(AccountError::InvalidUsername)
        ));
        assert!(matches!(
            db.register_user("bob", "not-an-email", "pw"),
            Err(AccountError::InvalidEmail)
        ));
    }

    #[test]
    fn test_password_reset_flow() {
        let (_tmp, db) = open_db();
        db.register_user("alice", "alice@example.com", "old").unwrap();

        assert!(matches!(
            db.confirm_password_reset("alice@example.com", "ANY", "new"),
            Err(AccountError::NoResetCode)
        ));

        let code = db.start_password_reset("alice@example.com").unwrap();
        assert_eq!(code.len(), 8);

        assert!(matches!(
            db.confirm_password_reset("alice@example.com", "WRONG000", "new"),
            Err(AccountError::InvalidResetCode)
        ));

        db.confirm_password_reset("alice@example.com", &code, "new")
            .unwrap();
        assert!(db.verify_user("alice", "new").unwrap());
        assert!(!db.verify_user("alice", "old").unwrap());

        // Codes are single use
        assert!(matches!(
            db.confirm_password_reset("alice@example.com", &code, "again"),
            Err(AccountError::NoResetCode)
        ));
    }

    #[test]
    fn test_expired_reset_code() {
        let (_tmp, db) = open_db();
        db.register_user("alice", "alice@example.com", "old").unwrap();
        let code = db.start_password_reset("alice@example.com").unwrap();

        let later = SystemTime::now() + Duration::from_secs(RESET_CODE_DURATION + 60);
        assert!(matches!(
            db.confirm_password_reset_at("alice@example.com", &code, "new", later),
            Err(AccountError::ResetCodeExpired)
        ));
        assert!(db.verify_user("alice", "old").unwrap());
    }

    #[test]
    fn test_reset_unknown_email() {
        let (_tmp, db) = open_db();
        assert!(matches!(
            db.start_password_reset("ghost@example.com"),
            Err(AccountError::EmailNotFound)
        ));
    }

    #[test]
    fn test_change_password() {
        let (_tmp, db) = open_db();
        db.register_user("alice", "alice@example.com", "old").unwrap();

        assert!(matches!(
            db.change_password("alice", "bad", "new", "new"),
            Err(AccountError::WrongPassword)
        ));
        assert!(matches!(
            db.change_password("alice", "old", "new", "neww"),
            Err(AccountError::PasswordMismatch)
        ));

        db.change_password("alice", "old", "new", "new").unwrap();
        assert!(db.verify_user("alice", "new").unwrap());
    }

    #[test]
    fn test_expired_sessions_are_pruned() {
        let stale = "expired-session-for-pruning".to_string();
        {
            let mut sessions = SESSIONS.write().unwrap();
            sessions.insert(
                stale.clone(),
                Session {
                    user_id: "ghost".to_string(),
                    expires_at: SystemTime::now() - Duration::from_secs(1),
                },
            );
        }
        assert_eq!(validate_session(&stale), None);

        let fresh = create_session("ghost");
        let sessions = SESSIONS.read().unwrap();
        assert!(!sessions.contains_key(&stale));
        assert!(sessions.contains_key(&fresh));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_sessions() {
        let id = create_session("alice");
        assert_eq!(validate_session(&id), Some("alice".to_string()));

        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, id.clone()));
        assert_eq!(current_user(&jar), Some(UserReference::new("alice")));

        end_session(&id);
        assert_eq!(validate_session(&id), None);
        assert_eq!(current_user(&jar), None);
        assert_eq!(current_user(&CookieJar::new()), None);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email(""));
    }
}
