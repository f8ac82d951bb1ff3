use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use thiserror::Error;

use heartline_common::{
    CreateUserRequest, ErrorBody, MatchDetails, MatchState, RatingSubmission, SignInRequest,
    SurveyForm, SurveySubmission, UserProfile,
};

const SESSION_COOKIE: &str = "sessid";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("password must contain an uppercase letter, a special character, and no whitespace")]
    InvalidPassword,

    #[error("this username is already taken")]
    UsernameTaken,

    /// Deliberately does not distinguish an unknown user from a wrong
    /// password.
    #[error("incorrect username or password")]
    Unauthorized,

    #[error("your session has expired; sign in again")]
    SessionExpired,

    #[error("the server did not hand back a session credential")]
    MissingCredential,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Typed client for the REST side of the backend. The session credential is
/// held explicitly and attached per request; the same raw token feeds the
/// live-channel handshake.
pub struct Api {
    base: String,
    client: reqwest::Client,
    sessid: Option<String>,
}

impl Api {
    pub fn new(base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            base: base.into(),
            client,
            sessid: None,
        }
    }

    pub fn with_session(mut self, sessid: impl Into<String>) -> Self {
        self.sessid = Some(sessid.into());
        self
    }

    pub fn session_token(&self) -> Option<&str> {
        self.sessid.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authed(self.client.post(self.url(path)))
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.sessid {
            Some(sessid) => req.header(COOKIE, format!("{SESSION_COOKIE}={sessid}")),
            None => req,
        }
    }

    /// POST /users/create — field problems come back as typed variants so
    /// they can be shown inline.
    pub async fn create_user(
        &self,
        username: &str,
        name: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let resp = self
            .post("/users/create")
            .json(&CreateUserRequest {
                username: username.to_string(),
                name: name.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let reason = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(match reason.as_str() {
            "invalid password" => ApiError::InvalidPassword,
            "username taken" => ApiError::UsernameTaken,
            _ => ApiError::Rejected(reason),
        })
    }

    /// POST /users/signin — on success the session credential is read out of
    /// the `Set-Cookie` header and returned to the caller; nothing is stashed
    /// implicitly.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let resp = self
            .post("/users/signin")
            .json(&SignInRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Unauthorized);
        }

        resp.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_cookie_value)
            .ok_or(ApiError::MissingCredential)
    }

    /// GET /user
    pub async fn user_profile(&self) -> Result<UserProfile, ApiError> {
        Ok(expect_ok(self.get("/user").send().await?)?.json().await?)
    }

    /// GET /survey
    pub async fn survey(&self) -> Result<SurveyForm, ApiError> {
        Ok(expect_ok(self.get("/survey").send().await?)?.json().await?)
    }

    /// POST /survey/submit
    pub async fn submit_survey(&self, submission: &SurveySubmission) -> Result<(), ApiError> {
        expect_ok(self.post("/survey/submit").json(submission).send().await?)?;
        Ok(())
    }

    /// GET /matching/state — the point-in-time poll.
    pub async fn match_state(&self) -> Result<MatchState, ApiError> {
        Ok(expect_ok(self.get("/matching/state").send().await?)?
            .json()
            .await?)
    }

    /// GET /matching/details
    pub async fn match_details(&self) -> Result<MatchDetails, ApiError> {
        Ok(expect_ok(self.get("/matching/details").send().await?)?
            .json()
            .await?)
    }

    /// POST /rating — callers validate the range before this goes out.
    pub async fn submit_rating(&self, rating: u8) -> Result<(), ApiError> {
        expect_ok(
            self.post("/rating")
                .json(&RatingSubmission { rating })
                .send()
                .await?,
        )?;
        Ok(())
    }
}

fn expect_ok(resp: Response) -> Result<Response, ApiError> {
    if resp.status() == StatusCode::UNAUTHORIZED {
        return Err(ApiError::SessionExpired);
    }
    Ok(resp.error_for_status()?)
}

/// Pull the session token out of one `Set-Cookie` header line.
fn session_cookie_value(header: &str) -> Option<String> {
    let (name, rest) = header.split_once('=')?;
    if name.trim() != SESSION_COOKIE {
        return None;
    }
    let value = rest.split(';').next().unwrap_or(rest).trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}
