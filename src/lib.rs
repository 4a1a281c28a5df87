pub mod cli;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod server;
pub mod service;
pub mod storage;

pub use client::{Freshness, HttpNoteApi, NoteApi, NoteClient};
pub use config::Config;
pub use error::{MurmurError, Result};
pub use service::NoteService;
