//! Gateway: HTTP endpoint the chat transport posts events to.
//!
//! `GET /` is a health probe; `POST /events` takes one transport event and answers with the
//! reply JSON (or 204 when there is nothing to send).

mod server;

pub use server::{router, run_gateway, serve};
