//! In-process stand-in for the backend: the REST routes and the live
//! channel endpoint the client talks to, with scriptable state.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};

use heartline_common::{
    CreateUserRequest, ErrorBody, MatchDetails, MatchState, MatchStateKind, RatingSubmission,
    SignInRequest, SurveyChoice, SurveyForm, SurveyQuestion, SurveySubmission, UserProfile,
};

pub const FIXTURE_PASSWORD: &str = "hunter2";
pub const FIXTURE_TOKEN: &str = "fixture-token";

/// Instructions for the live-channel end of the fixture.
pub enum ServerCmd {
    Send(String),
    Close,
}

#[derive(Clone, Default)]
pub struct Backend {
    pub match_state: Arc<RwLock<MatchStateKind>>,
    pub signup_error: Arc<Mutex<Option<String>>>,
    pub ratings: Arc<Mutex<Vec<u8>>>,
    /// Raw text frames received from the client, in arrival order.
    pub received: Arc<Mutex<Vec<String>>>,
    live: Arc<Mutex<Option<mpsc::Sender<ServerCmd>>>>,
}

impl Backend {
    pub async fn set_match_state(&self, kind: MatchStateKind) {
        *self.match_state.write().await = kind;
    }

    pub async fn set_signup_error(&self, error: &str) {
        *self.signup_error.lock().await = Some(error.to_string());
    }

    /// Handle to the connected live channel; waits for the client to show up.
    pub async fn live_sender(&self) -> mpsc::Sender<ServerCmd> {
        for _ in 0..500 {
            if let Some(tx) = self.live.lock().await.clone() {
                return tx;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("client never connected to the live channel");
    }

    pub async fn wait_for_received(&self, count: usize) -> Vec<String> {
        for _ in 0..500 {
            let received = self.received.lock().await.clone();
            if received.len() >= count {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} frames from the client");
    }
}

/// Boot the fixture and return (state, REST base URL, live channel URL).
pub async fn spawn() -> (Backend, String, String) {
    let backend = Backend::default();

    let app = Router::new()
        .route("/users/create", post(create_user))
        .route("/users/signin", post(sign_in))
        .route("/user", get(user_profile))
        .route("/survey", get(survey))
        .route("/survey/submit", post(survey_submit))
        .route("/matching/state", get(match_state))
        .route("/matching/details", get(match_details))
        .route("/rating", post(rating))
        .route("/live", get(live_upgrade))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (backend, format!("http://{addr}"), format!("ws://{addr}/live"))
}

async fn create_user(
    State(backend): State<Backend>,
    Json(_req): Json<CreateUserRequest>,
) -> Response {
    match backend.signup_error.lock().await.clone() {
        Some(error) => (StatusCode::BAD_REQUEST, Json(ErrorBody { error })).into_response(),
        None => StatusCode::OK.into_response(),
    }
}

async fn sign_in(Json(req): Json<SignInRequest>) -> Response {
    if req.password == FIXTURE_PASSWORD {
        (
            [(
                header::SET_COOKIE,
                format!("sessid={FIXTURE_TOKEN}; Path=/; HttpOnly"),
            )],
            StatusCode::OK,
        )
            .into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn user_profile() -> Json<UserProfile> {
    Json(UserProfile {
        username: "jane".into(),
        name: "Jane".into(),
        rating: 4.2,
    })
}

async fn survey() -> Json<SurveyForm> {
    Json(SurveyForm {
        questions: vec![SurveyQuestion {
            text: "Cats or dogs?".into(),
            choices: vec![
                SurveyChoice { text: "Cats".into() },
                SurveyChoice { text: "Dogs".into() },
            ],
        }],
    })
}

async fn survey_submit(Json(_submission): Json<SurveySubmission>) -> StatusCode {
    StatusCode::OK
}

async fn match_state(State(backend): State<Backend>) -> Json<MatchState> {
    Json(MatchState {
        message: *backend.match_state.read().await,
    })
}

async fn match_details() -> Json<MatchDetails> {
    Json(MatchDetails {
        details: "You matched with Sam.".into(),
    })
}

async fn rating(State(backend): State<Backend>, Json(body): Json<RatingSubmission>) -> StatusCode {
    backend.ratings.lock().await.push(body.rating);
    StatusCode::OK
}

async fn live_upgrade(State(backend): State<Backend>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| live_socket(socket, backend))
}

async fn live_socket(socket: WebSocket, backend: Backend) {
    let (mut sender, mut receiver) = socket.split();
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ServerCmd>(16);
    *backend.live.lock().await = Some(cmd_tx);

    // Task: push scripted frames to the client
    let send_task = tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                ServerCmd::Send(text) => {
                    if sender.send(WsMessage::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                ServerCmd::Close => {
                    let _ = sender.close().await;
                    break;
                }
            }
        }
    });

    // Task: record everything the client sends
    let received = backend.received.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let WsMessage::Text(text) = msg {
                received.lock().await.push(text.to_string());
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }
}
