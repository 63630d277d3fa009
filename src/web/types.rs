//! Most of the structs in `web` module and their implementations live here.
//! Includes the waitlist submission as received over the wire, its validated counterpart,
//! the parsing implementations and tests for those.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Utc};
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

// ###################################
// ->   STRUCTS
// ###################################

/// Deserializable waitlist submission.
/// Every field can be missing, `null` or hold any JSON scalar, nothing is validated yet.
#[derive(Debug, Default, Deserialize)]
pub struct WaitlistSubmission {
    pub email: Option<Scalar>,
    pub audience: Option<Scalar>,
    pub org: Option<Scalar>,
}

impl WaitlistSubmission {
    /// Parses the raw request body. An empty body is treated as an empty JSON object.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, DataParsingError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|er| DataParsingError::MalformedRequest(er.to_string()))
    }
}

/// A JSON scalar that gets coerced into a string.
/// Arrays and objects don't deserialize into it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl Scalar {
    /// Coerces the scalar into a string, falsy values (`false`, `0`, `""`) become `None`.
    pub fn into_text(self) -> Option<String> {
        match self {
            Scalar::Text(s) if s.is_empty() => None,
            Scalar::Text(s) => Some(s),
            Scalar::Number(n) if n.as_f64() == Some(0.0) => None,
            Scalar::Number(n) => Some(number_text(&n)),
            Scalar::Flag(true) => Some("true".to_string()),
            Scalar::Flag(false) => None,
        }
    }
}

/// Renders a number the way `String(n)` does in JavaScript:
/// `1.0` is `"1"`, `1e21` is `"1e+21"`, `1.5e-7` stays in exponent form.
fn number_text(n: &serde_json::Number) -> String {
    let Some(f) = n.as_f64().filter(|_| n.is_f64()) else {
        return n.to_string();
    };
    let abs = f.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        let exp = format!("{f:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    // `f64`'s Display drops a zero fraction, unlike `Number`'s.
    f.to_string()
}

fn coerce(value: Option<Scalar>) -> String {
    value.and_then(Scalar::into_text).unwrap_or_default()
}

/// Validated waitlist signup.
/// Serializes into the `saved` part of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidSignup {
    pub email: ValidEmail,
    pub audience: Audience,
    pub org: Org,
}

impl TryFrom<WaitlistSubmission> for ValidSignup {
    type Error = DataParsingError;

    fn try_from(submission: WaitlistSubmission) -> Result<Self, Self::Error> {
        let WaitlistSubmission {
            email,
            audience,
            org,
        } = submission;

        // Email is validated before the audience so that a submission with both fields
        // invalid is reported as an invalid email.
        let email = ValidEmail::parse(coerce(email))?;
        let audience = Audience::parse(coerce(audience))?;
        let org = Org::parse(coerce(org));

        Ok(ValidSignup {
            email,
            audience,
            org,
        })
    }
}

/// Validated, normalized (trimmed + lowercased) email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidEmail(String);

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ValidEmail {
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref().trim().to_lowercase();

        if regex_is_match!(r"^[^\s@]+@[^\s@]+\.[^\s@]+$", &value) {
            Ok(ValidEmail(value))
        } else {
            Err(DataParsingError::EmailInvalid)
        }
    }
}

/// The submitter's self-declared category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Audience {
    #[default]
    Company,
    Individual,
    Personal,
}

impl Audience {
    /// Normalizes the raw audience, maps the `app` alias and only then validates it.
    /// An empty value falls back to the default audience.
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref().trim().to_lowercase();
        if value.is_empty() {
            return Ok(Audience::default());
        }

        let value = match value.as_str() {
            "app" => "individual",
            other => other,
        };

        match value {
            "company" => Ok(Audience::Company),
            "individual" => Ok(Audience::Individual),
            "personal" => Ok(Audience::Personal),
            _ => Err(DataParsingError::AudienceInvalid(value.to_string())),
        }
    }
}

/// Trimmed organization name, no other constraints. An empty name is stored as `NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Org(Option<String>);

impl Org {
    pub fn parse<S>(value: S) -> Self
    where
        S: AsRef<str>,
    {
        let value = value.as_ref().trim();
        Org((!value.is_empty()).then(|| value.to_string()))
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Request metadata stored alongside the signup.
/// Both values are opaque and never validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl RequestMeta {
    pub const FORWARDED_FOR_HEADER: &'static str = "x-forwarded-for";

    /// Takes the first hop of `X-Forwarded-For` if present, otherwise the socket's remote address.
    pub fn from_headers(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
        };

        let user_agent = header_str(header::USER_AGENT.as_str()).map(str::to_string);

        let ip = header_str(Self::FORWARDED_FOR_HEADER)
            .map(|hops| hops.split(',').next().unwrap_or_default().trim().to_string())
            .or_else(|| remote_addr.map(|addr| addr.ip().to_string()))
            .filter(|ip| !ip.is_empty());

        RequestMeta { user_agent, ip }
    }
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(RequestMeta::from_headers(&parts.headers, remote_addr))
    }
}

/// A full waitlist row, as written to the `waitlist` table.
#[derive(Debug, Clone)]
pub struct WaitlistEntry {
    pub signup: ValidSignup,
    pub ts: DateTime<Utc>,
    pub meta: RequestMeta,
}

impl WaitlistEntry {
    pub fn new(signup: ValidSignup, meta: RequestMeta, ts: DateTime<Utc>) -> Self {
        Self { signup, ts, meta }
    }
}

/// The body of a successful waitlist response.
#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub ok: bool,
    pub saved: ValidSignup,
}

impl From<ValidSignup> for SavedResponse {
    fn from(saved: ValidSignup) -> Self {
        SavedResponse { ok: true, saved }
    }
}

// ###################################
// ->   ERROR
// ###################################
#[derive(Debug, thiserror::Error)]
pub enum DataParsingError {
    #[error("malformed request body: {0}")]
    MalformedRequest(String),

    #[error("email invalid")]
    EmailInvalid,

    #[error("audience invalid: {0}")]
    AudienceInvalid(String),
}
