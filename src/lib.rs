//! Client library for the heartline matching service: REST flows plus the
//! real-time match-wait and chat session over a live WebSocket channel.

pub mod api;
pub mod channel;
pub mod chat;
pub mod flow;
pub mod matching;
pub mod session;
