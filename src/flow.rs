//! The CLI flows: account and survey round-trips, and the interactive
//! match-wait → chat → rating journey.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use heartline_common::{MatchStateKind, SurveyAnswer, SurveySubmission};

use crate::api::{Api, ApiError};
use crate::channel::{ChannelEvent, SessionChannel};
use crate::chat::{self, ChatEnd, ChatSession, ChatStep};
use crate::matching::{self, MatchOutcome};
use crate::session::Session;

pub async fn signup(api: &Api, username: &str, name: &str) -> Result<()> {
    let password = dialoguer::Password::new()
        .with_prompt("Choose a password")
        .interact()?;

    match api.create_user(username, name, &password).await {
        Ok(()) => {
            println!("Welcome, {name}! Sign in with `heartline signin -u {username}` to continue.");
            Ok(())
        }
        // Field problems are shown inline; fixing them is just re-running.
        Err(err @ (ApiError::InvalidPassword | ApiError::UsernameTaken)) => {
            eprintln!("{err}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn signin(api: &Api, username: &str) -> Result<Session> {
    let password = dialoguer::Password::new()
        .with_prompt("Password")
        .interact()?;

    let sessid = api.sign_in(username, &password).await?;
    let session = Session::new(username, sessid);
    session.save()?;
    println!("Signed in as {username}.");
    Ok(session)
}

pub fn signout() -> Result<()> {
    Session::clear()?;
    println!("Signed out.");
    Ok(())
}

pub async fn profile(api: &Api) -> Result<()> {
    let profile = api.user_profile().await?;
    println!("username: {}", profile.username);
    println!("name:     {}", profile.name);
    println!("rating:   {:.1}", profile.rating);
    Ok(())
}

pub async fn survey(api: &Api) -> Result<()> {
    let form = api.survey().await?;

    let mut answers = Vec::with_capacity(form.questions.len());
    for question in &form.questions {
        let choices: Vec<&str> = question.choices.iter().map(|c| c.text.as_str()).collect();
        let picked = dialoguer::Select::new()
            .with_prompt(question.text.clone())
            .items(&choices)
            .default(0)
            .interact()?;
        answers.push(SurveyAnswer {
            question_text: question.text.clone(),
            choice_id: picked,
        });
    }

    api.submit_survey(&SurveySubmission { questions: answers })
        .await?;
    println!("Survey submitted. Run `heartline match` to find your date.");
    Ok(())
}

/// The full live flow: wait for an outcome, then chat until the session
/// ends, then rate. Falls back to the profile summary on every exit.
pub async fn run_match(api: &Api, channel_url: &str, wait_timeout: Option<Duration>) -> Result<()> {
    let sessid = api
        .session_token()
        .context("not signed in; run `heartline signin` first")?
        .to_string();

    eprintln!("Waiting for a match... hang tight, this can take a while.");
    let channel = SessionChannel::open(channel_url, &sessid).await?;

    match matching::run(api, channel, wait_timeout).await? {
        MatchOutcome::Failed => {
            eprintln!("We couldn't find a match for you! Please try again.");
            show_profile(api).await;
            Ok(())
        }
        MatchOutcome::Matched => run_chat(api, channel_url, &sessid).await,
    }
}

async fn run_chat(api: &Api, channel_url: &str, sessid: &str) -> Result<()> {
    // The chat view gets its own connection; the handshake re-correlates the
    // session server-side.
    let mut channel = SessionChannel::open(channel_url, sessid).await?;

    // A point-in-time check before any chat I/O: the session may already be
    // over, or we can show who we got.
    match api.match_state().await {
        Ok(state) => match state.message {
            MatchStateKind::Failed => {
                channel.close();
                eprintln!("You are not in an active chatting session!");
                show_profile(api).await;
                return Ok(());
            }
            MatchStateKind::Matched => match api.match_details().await {
                Ok(details) => println!("Matched! {}", details.details),
                Err(err) => warn!("match details fetch failed: {err}"),
            },
            MatchStateKind::Waiting => {}
        },
        Err(err) => warn!("match state poll failed: {err}"),
    }

    println!("You're connected. Type a line to send it; /leave to end the chat.");

    let mut chat = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // None = the user chose to leave; Some = the session ended under us.
    let end = loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let text = line.trim();
                        if text.is_empty() {
                            continue;
                        }
                        if text == "/leave" {
                            break None;
                        }
                        let frame = chat.compose(text);
                        channel.send(frame);
                    }
                    // stdin is gone; treat it as leaving.
                    Ok(None) | Err(_) => break None,
                }
            }
            event = channel.next_event() => {
                match event {
                    Some(ChannelEvent::Frame(frame)) => match chat.apply_frame(&frame) {
                        ChatStep::Appended => {
                            if let Some(message) = chat.messages().last() {
                                println!("them: {}", message.text);
                            }
                        }
                        ChatStep::Ended(end) => break Some(end),
                        ChatStep::Ignored => {}
                    },
                    Some(ChannelEvent::Closed) | None => match chat.apply_close() {
                        ChatStep::Ended(end) => break Some(end),
                        _ => break Some(ChatEnd::Disconnected),
                    },
                }
            }
        }
    };
    channel.close();

    match end {
        Some(ChatEnd::Inactive) => {
            eprintln!("You are not in an active chatting session!");
            show_profile(api).await;
            return Ok(());
        }
        Some(ChatEnd::Disconnected) => eprintln!("Chat ended."),
        None => prompt_rating(api, &mut lines).await,
    }

    show_profile(api).await;
    Ok(())
}

/// Ask for the 1–5 rating. Submit failures are logged and retriable; an
/// empty line abandons the rating entirely.
async fn prompt_rating(api: &Api, lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>) {
    loop {
        eprintln!("Rate your date from 1 to 5 (or press enter to skip):");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => return,
        };
        let text = line.trim();
        if text.is_empty() {
            return;
        }
        let rating = match text.parse::<u8>() {
            Ok(rating) if (1..=5).contains(&rating) => rating,
            _ => {
                eprintln!("That's not a number between 1 and 5.");
                continue;
            }
        };
        match chat::submit_rating(api, rating).await {
            Ok(()) => {
                println!("Thanks for the feedback!");
                return;
            }
            Err(err) => {
                warn!("rating submit failed: {err}");
                eprintln!("Couldn't submit that rating — try again or press enter to skip.");
            }
        }
    }
}

/// The end-of-flow profile summary. A fetch problem here should not mask
/// how the flow itself went.
async fn show_profile(api: &Api) {
    if let Err(err) = profile(api).await {
        warn!("profile fetch failed: {err}");
    }
}
