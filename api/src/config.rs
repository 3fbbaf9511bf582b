use std::{
    fmt,
    num::{NonZeroU32, NonZeroUsize},
    ops::RangeInclusive,
    str::FromStr,
};

/// One year.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;
/// bcrypt accepts costs 4 through 31.
const BCRYPT_COSTS: RangeInclusive<u32> = 4..=31;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Maximum post length, counted in characters.
    pub post_max_length: usize,
    pub bcrypt_cost: u32,
    pub login_attempts_per_minute: NonZeroU32,
    pub max_concurrent_requests: NonZeroUsize,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, value } => write!(f, "invalid value for {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Settings with defaults for everything but the secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: jwt_secret.into(),
            token_ttl_hours: 24,
            post_max_length: 50,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            login_attempts_per_minute: NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
            max_concurrent_requests: NonZeroUsize::new(512).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let mut config = Self::new(secret);

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(v) = parse_within(&lookup, "TOKEN_TTL_HOURS", 1..=MAX_TOKEN_TTL_HOURS)? {
            config.token_ttl_hours = v;
        }
        if let Some(v) = parse_within(&lookup, "POST_MAX_LENGTH", 1..=usize::MAX)? {
            config.post_max_length = v;
        }
        if let Some(v) = parse_within(&lookup, "BCRYPT_COST", BCRYPT_COSTS)? {
            config.bcrypt_cost = v;
        }
        if let Some(v) = parse(&lookup, "LOGIN_ATTEMPTS_PER_MINUTE")? {
            config.login_attempts_per_minute = v;
        }
        if let Some(v) = parse(&lookup, "MAX_CONCURRENT_REQUESTS")? {
            config.max_concurrent_requests = v;
        }

        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Like [`parse`], but values outside `range` are invalid too.
fn parse_within<F, T>(
    lookup: &F,
    key: &'static str,
    range: RangeInclusive<T>,
) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd,
{
    match parse::<F, T>(lookup, key)? {
        Some(v) if !range.contains(&v) => Err(ConfigError::Invalid {
            key,
            value: lookup(key).unwrap_or_default(),
        }),
        parsed => Ok(parsed),
    }
}
