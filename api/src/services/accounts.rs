use crate::{
    auth::{CurrentUser, create_token, decode_token},
    config::Config,
    dto::{LoginForm, SignupForm},
    errors::{ApiError, FieldErrors},
    models::User,
    repository::{Inserted, UserRepository},
};
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{collections::HashMap, sync::Arc};
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
const PASSWORD_TOO_SHORT: &str = "This password is too short. It must contain at least 8 characters.";
const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
const PASSWORD_LIKE_USERNAME: &str = "The password is too similar to the username.";
const PASSWORD_LIKE_EMAIL: &str = "The password is too similar to the email address.";

const USERNAME_MAX_LENGTH: usize = 150;
const PASSWORD_MIN_LENGTH: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;
const LOCKOUT_SECONDS: i64 = 60;

/// A freshly issued session.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Identity collaborator: signup, credential checks and session tokens.
pub struct Accounts {
    users: Arc<dyn UserRepository>,
    jwt_secret: String,
    token_ttl_hours: i64,
    bcrypt_cost: u32,
    // jti -> exp of tokens revoked by logout
    revoked: DashMap<String, usize>,
    // charged by failed logins of existing users only
    login_limiter: DefaultKeyedRateLimiter<String>,
    lockouts: DashMap<String, DateTime<Utc>>,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserRepository>, config: &Config) -> Self {
        Self {
            users,
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_hours: config.token_ttl_hours,
            bcrypt_cost: config.bcrypt_cost,
            revoked: DashMap::new(),
            login_limiter: RateLimiter::keyed(Quota::per_minute(config.login_attempts_per_minute)),
            lockouts: DashMap::new(),
        }
    }

    pub fn token_ttl_hours(&self) -> i64 {
        self.token_ttl_hours
    }

    pub async fn signup(&self, form: SignupForm) -> Result<Session, ApiError> {
        let form = SignupForm {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            ..form
        };

        let mut errors = match form.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };

        if !errors.has("username") {
            if form.username.chars().count() > USERNAME_MAX_LENGTH {
                errors.add(
                    "username",
                    format!("Ensure this value has at most {USERNAME_MAX_LENGTH} characters."),
                );
            } else if !form.username.chars().all(is_username_char) {
                errors.add("username", INVALID_USERNAME);
            } else if self.users.find_by_username(&form.username).is_some() {
                errors.add("username", DUPLICATE_USERNAME);
            }
        }

        if !errors.has("password1") && !errors.has("password2") {
            if form.password1 != form.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                for problem in password_problems(&form.password2, &form.username, &form.email) {
                    errors.add("password2", problem);
                }
            }
        }

        errors.into_result()?;

        let cost = self.bcrypt_cost;
        let password = form.password1.clone();
        let hashed_password = task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| ApiError::InternalError(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))?;

        let user = User {
            id: Uuid::new_v4(),
            username: form.username,
            email: form.email,
            hashed_password,
            created_at: Utc::now(),
        };

        if self.users.insert_user(user.clone()) == Inserted::AlreadyExists {
            let mut errors = FieldErrors::new();
            errors.add("username", DUPLICATE_USERNAME);
            return Err(ApiError::Validation(errors));
        }

        info!("New user registered: {}", user.username);

        self.issue(user)
    }

    /// Only failed attempts against an existing account count towards the
    /// per-minute quota. Once it is spent the account is locked for a minute,
    /// whatever password is sent.
    pub async fn login(&self, form: LoginForm) -> Result<Session, ApiError> {
        let form = LoginForm {
            username: form.username.trim().to_string(),
            ..form
        };
        form.validate()
            .map_err(|e| ApiError::Validation(e.into()))?;

        if self.is_locked_out(&form.username) {
            warn!("Login throttled for {}", form.username);
            return Err(ApiError::RateLimited);
        }

        match self.authenticate(&form.username, &form.password).await? {
            Some(user) => {
                info!("User logged in: {}", user.username);
                self.issue(user)
            }
            None => Err(self.failed_login(&form.username)),
        }
    }

    /// `Ok(None)` when the username is unknown or the password is wrong.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, ApiError> {
        let Some(user) = self.users.find_by_username(username) else {
            return Ok(None);
        };

        let password = password.to_string();
        let hashed = user.hashed_password.clone();
        let valid = task::spawn_blocking(move || verify(password, &hashed))
            .await
            .map_err(|e| ApiError::InternalError(format!("Password verification task failed: {}", e)))?
            .map_err(|e| ApiError::InternalError(format!("Password verification failed: {}", e)))?;

        Ok(valid.then_some(user))
    }

    /// Drops throttle state that no longer limits anyone. Run periodically.
    pub fn prune_login_throttle(&self) {
        self.login_limiter.retain_recent();
        self.login_limiter.shrink_to_fit();
        let now = Utc::now();
        self.lockouts.retain(|_, until| *until > now);
        self.lockouts.shrink_to_fit();
        debug!(
            "Login throttle pruned: {} tracked, {} locked",
            self.login_limiter.len(),
            self.lockouts.len()
        );
    }

    /// Usernames the login limiter currently keeps state for.
    pub fn throttled_usernames(&self) -> usize {
        self.login_limiter.len()
    }

    /// Resolves a session token. Invalid, expired and revoked tokens, and
    /// tokens whose user is gone, are all anonymous.
    pub fn current_user(&self, token: &str) -> Option<CurrentUser> {
        let claims = decode_token(token, &self.jwt_secret).ok()?;
        if self.revoked.contains_key(&claims.jti) {
            return None;
        }
        let id = Uuid::parse_str(&claims.sub).ok()?;
        let user = self.users.find_user(id)?;
        Some(CurrentUser { user, claims })
    }

    pub fn logout(&self, session: &CurrentUser) {
        let now = Utc::now().timestamp().max(0) as usize;
        self.revoked.retain(|_, exp| *exp >= now);
        self.revoked
            .insert(session.claims.jti.clone(), session.claims.exp);

        info!("User logged out: {}", session.user.username);
    }

    pub fn find_by_username(&self, username: &str) -> Result<User, ApiError> {
        self.users
            .find_by_username(username)
            .ok_or_else(|| ApiError::NotFound("User not found".into()))
    }

    /// Administrative removal; posts, likes and follow edges go with the user.
    pub fn delete_user(&self, id: Uuid) -> bool {
        let deleted = self.users.delete_user(id);
        if deleted {
            info!("User deleted: {}", id);
        }
        deleted
    }

    fn is_locked_out(&self, username: &str) -> bool {
        self.lockouts
            .get(username)
            .is_some_and(|until| *until > Utc::now())
    }

    fn failed_login(&self, username: &str) -> ApiError {
        warn!("Failed login for {}", username);

        // unknown names get no limiter state
        if self.users.find_by_username(username).is_none() {
            return ApiError::form(INVALID_LOGIN);
        }
        if self.login_limiter.check_key(&username.to_string()).is_err() {
            let until = Utc::now() + Duration::seconds(LOCKOUT_SECONDS);
            self.lockouts.insert(username.to_string(), until);
            warn!("Login throttled for {} until {}", username, until);
            return ApiError::RateLimited;
        }
        ApiError::form(INVALID_LOGIN)
    }

    fn issue(&self, user: User) -> Result<Session, ApiError> {
        let token = create_token(&user, &self.jwt_secret, self.token_ttl_hours)?;
        Ok(Session { token, user })
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

fn password_problems(password: &str, username: &str, email: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();

    if password.chars().count() < PASSWORD_MIN_LENGTH {
        problems.push(PASSWORD_TOO_SHORT);
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push(PASSWORD_NUMERIC);
    }
    if too_similar(password, username) {
        problems.push(PASSWORD_LIKE_USERNAME);
    }
    if too_similar(password, email) {
        problems.push(PASSWORD_LIKE_EMAIL);
    }

    problems
}

/// Compares the password with the attribute and with each of its word
/// parts, ignoring case.
fn too_similar(password: &str, attribute: &str) -> bool {
    let password = password.to_lowercase();
    let attribute = attribute.to_lowercase();
    if attribute.is_empty() {
        return false;
    }

    attribute
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .chain(std::iter::once(attribute.as_str()))
        .filter(|part| !exceeds_length_ratio(&password, part))
        .any(|part| quick_ratio(part, &password) >= MAX_SIMILARITY)
}

/// A password ten times longer than the attribute can't be similar to it.
fn exceeds_length_ratio(password: &str, part: &str) -> bool {
    let password_len = password.chars().count();
    let part_len = part.chars().count();
    password_len >= 10 * part_len && (part_len as f64) < MAX_SIMILARITY / 2.0 * password_len as f64
}

/// Upper bound on the matching-blocks ratio: shared characters counted as a
/// multiset, `2 * shared / (len(a) + len(b))`.
fn quick_ratio(a: &str, b: &str) -> f64 {
    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }
    let shared = a
        .chars()
        .filter(|c| match available.get_mut(c) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        })
        .count();

    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    2.0 * shared as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;
    use rstest::{fixture, rstest};
    use std::{num::NonZeroU32, time::Instant};

    fn accounts_with(cost: u32, logins_per_minute: NonZeroU32) -> Accounts {
        let mut config = Config::new("test-secret");
        config.bcrypt_cost = cost;
        config.login_attempts_per_minute = logins_per_minute;
        Accounts::new(Arc::new(MemoryStore::new()), &config)
    }

    #[fixture]
    fn accounts() -> Accounts {
        accounts_with(4, NonZeroU32::new(3).unwrap())
    }

    fn signup_form(username: &str, email: &str, password1: &str, password2: &str) -> SignupForm {
        SignupForm {
            username: username.into(),
            email: email.into(),
            password1: password1.into(),
            password2: password2.into(),
        }
    }

    fn login_form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.into(),
            password: password.into(),
        }
    }

    fn field_errors(result: Result<Session, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    async fn register(accounts: &Accounts, username: &str) -> Session {
        accounts
            .signup(signup_form(
                username,
                &format!("{username}@example.com"),
                "testpassword",
                "testpassword",
            ))
            .await
            .unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn signup_creates_user_and_session(accounts: Accounts) {
        let session = register(&accounts, "tester").await;
        assert_eq!(session.user.username, "tester");
        assert_ne!(session.user.hashed_password, "testpassword");
        let current = accounts.current_user(&session.token).unwrap();
        assert_eq!(current.user.id, session.user.id);
    }

    #[rstest]
    #[tokio::test]
    async fn empty_form_reports_every_field(accounts: Accounts) {
        let errors = field_errors(accounts.signup(signup_form("", "", "", "")).await);
        for field in ["username", "email", "password1", "password2"] {
            assert_eq!(errors.get(field), ["This field is required."], "{field}");
        }
    }

    #[rstest]
    #[case("tester", "not-an-email", "testpassword", "testpassword", "email", "Enter a valid email address.")]
    #[case("tester", "t@example.com", "ghdag", "ghdag", "password2", PASSWORD_TOO_SHORT)]
    #[case("testuser", "t@example.com", "testuser1", "testuser1", "password2", PASSWORD_LIKE_USERNAME)]
    #[case("testuser", "t@example.com", "testusr12", "testusr12", "password2", PASSWORD_LIKE_USERNAME)]
    #[case("tester", "jsmith@example.com", "jsmith.example", "jsmith.example", "password2", PASSWORD_LIKE_EMAIL)]
    #[case("tester", "t@example.com", "149596396", "149596396", "password2", PASSWORD_NUMERIC)]
    #[case("tester", "t@example.com", "testuser", "testuser1", "password2", PASSWORD_MISMATCH)]
    #[case("bad name", "t@example.com", "testpassword", "testpassword", "username", INVALID_USERNAME)]
    #[tokio::test]
    async fn signup_rejects(
        accounts: Accounts,
        #[case] username: &str,
        #[case] email: &str,
        #[case] password1: &str,
        #[case] password2: &str,
        #[case] field: &str,
        #[case] message: &str,
    ) {
        let errors = field_errors(
            accounts
                .signup(signup_form(username, email, password1, password2))
                .await,
        );
        assert!(
            errors.get(field).iter().any(|m| m == message),
            "{field}: {:?}",
            errors.get(field)
        );
        assert!(accounts.find_by_username(username.trim()).is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_username_is_a_field_error(accounts: Accounts) {
        register(&accounts, "tester").await;
        let errors = field_errors(
            accounts
                .signup(signup_form("tester", "b@example.com", "otherpassword", "otherpassword"))
                .await,
        );
        assert_eq!(errors.get("username"), [DUPLICATE_USERNAME]);
    }

    #[rstest]
    #[tokio::test]
    async fn login_checks_credentials(accounts: Accounts) {
        register(&accounts, "tester").await;

        let ok = accounts.login(login_form("tester", "testpassword")).await;
        assert_eq!(ok.unwrap().user.username, "tester");

        let errors = field_errors(accounts.login(login_form("tester", "wrong")).await);
        assert_eq!(errors.get("__all__"), [INVALID_LOGIN]);
    }

    #[rstest]
    #[tokio::test]
    async fn login_requires_password(accounts: Accounts) {
        let errors = field_errors(accounts.login(login_form("tester", "")).await);
        assert_eq!(errors.get("password"), ["This field is required."]);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_logins_lock_the_account(accounts: Accounts) {
        register(&accounts, "tester").await;

        for _ in 0..3 {
            let result = accounts.login(login_form("tester", "wrongpassword")).await;
            assert!(matches!(result, Err(ApiError::Validation(_))));
        }
        let result = accounts.login(login_form("tester", "wrongpassword")).await;
        assert!(matches!(result, Err(ApiError::RateLimited)));

        // locked, so even the right password is refused
        let result = accounts.login(login_form("tester", "testpassword")).await;
        assert!(matches!(result, Err(ApiError::RateLimited)));
    }

    #[rstest]
    #[tokio::test]
    async fn successful_logins_are_not_charged(accounts: Accounts) {
        register(&accounts, "tester").await;

        for _ in 0..10 {
            assert!(accounts.login(login_form("tester", "testpassword")).await.is_ok());
        }
        assert_eq!(accounts.throttled_usernames(), 0);

        let result = accounts.login(login_form("tester", "wrongpassword")).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_usernames_leave_no_throttle_state(accounts: Accounts) {
        for i in 0..50 {
            let result = accounts.login(login_form(&format!("ghost{i}"), "whatever")).await;
            assert!(matches!(result, Err(ApiError::Validation(_))));
        }
        for _ in 0..5 {
            let result = accounts.login(login_form("ghost", "whatever")).await;
            assert!(matches!(result, Err(ApiError::Validation(_))));
        }
        assert_eq!(accounts.throttled_usernames(), 0);
    }

    #[tokio::test]
    async fn pruning_drops_stale_throttle_state() {
        // a quota this large replenishes within nanoseconds
        let accounts = accounts_with(4, NonZeroU32::MAX);
        register(&accounts, "tester").await;

        let result = accounts.login(login_form("tester", "wrongpassword")).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert_eq!(accounts.throttled_usernames(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        accounts.prune_login_throttle();
        assert_eq!(accounts.throttled_usernames(), 0);
        assert!(accounts.login(login_form("tester", "testpassword")).await.is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn pruning_keeps_active_lockouts(accounts: Accounts) {
        register(&accounts, "tester").await;
        for _ in 0..4 {
            let _ = accounts.login(login_form("tester", "wrongpassword")).await;
        }
        accounts.prune_login_throttle();
        assert_eq!(accounts.throttled_usernames(), 1);
        let result = accounts.login(login_form("tester", "testpassword")).await;
        assert!(matches!(result, Err(ApiError::RateLimited)));
    }

    #[tokio::test]
    async fn hashing_does_not_stall_the_runtime() {
        // current-thread runtime: a hash run inline would hold the timer
        // back until it finished
        let accounts = accounts_with(10, NonZeroU32::new(3).unwrap());
        let signup = async {
            let session = register(&accounts, "tester").await;
            (session, Instant::now())
        };
        let tick = async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            Instant::now()
        };
        let ((session, signed_up_at), ticked_at) = tokio::join!(signup, tick);
        assert_eq!(session.user.username, "tester");
        assert!(ticked_at < signed_up_at);
    }

    #[rstest]
    #[tokio::test]
    async fn logout_revokes_the_token(accounts: Accounts) {
        let session = register(&accounts, "tester").await;
        let current = accounts.current_user(&session.token).unwrap();
        accounts.logout(&current);
        assert!(accounts.current_user(&session.token).is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn deleted_user_session_is_anonymous(accounts: Accounts) {
        let session = register(&accounts, "tester").await;
        assert!(accounts.delete_user(session.user.id));
        assert!(accounts.current_user(&session.token).is_none());
        assert!(!accounts.delete_user(session.user.id));
    }

    #[rstest]
    #[case("TestUser1", "testuser", true)]
    #[case("testusr12", "testuser", true)]
    #[case("Password1", "bob.password@example.com", true)]
    #[case("correcthorse", "ab", false)]
    #[case("correcthorse", "alice", false)]
    #[case("correcthorse", "alice@example.com", false)]
    #[case("testpassword", "", false)]
    fn similarity_is_a_character_ratio(
        #[case] password: &str,
        #[case] attribute: &str,
        #[case] similar: bool,
    ) {
        assert_eq!(too_similar(password, attribute), similar);
    }

    #[test]
    fn long_passwords_skip_short_attributes() {
        assert!(exceeds_length_ratio("abababababababababababab", "ab"));
        assert!(!too_similar("abababababababababababab", "ab"));
    }
}
