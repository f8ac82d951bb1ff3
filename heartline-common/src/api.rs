use serde::{Deserialize, Serialize};

/// POST /users/create
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub name: String,
    pub password: String,
}

/// POST /users/signin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// Error body on rejected account requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// GET /user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
    pub rating: f64,
}

/// GET /survey
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyForm {
    pub questions: Vec<SurveyQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub text: String,
    pub choices: Vec<SurveyChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyChoice {
    pub text: String,
}

/// POST /survey/submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySubmission {
    pub questions: Vec<SurveyAnswer>,
}

/// One answered question; `choice_id` is the index of the picked choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub question_text: String,
    pub choice_id: usize,
}

/// GET /matching/state
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchState {
    pub message: MatchStateKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStateKind {
    #[default]
    Waiting,
    Matched,
    Failed,
}

/// GET /matching/details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDetails {
    pub details: String,
}

/// POST /rating
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingSubmission {
    pub rating: u8,
}
