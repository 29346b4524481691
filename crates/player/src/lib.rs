//! Player: the action provider behind spotkeys.
//!
//! Every bindable action lives in [`ActionTable`]. Transport controls go
//! through a [`LocalControl`] backend when the platform has one and fall back
//! to the [`WebApi`]; library and playlist actions always use the Web API.

mod actions;
mod error;
mod local;
mod spotify;
mod token;
mod web;

pub use actions::{ActionTable, KnownActions, action_names, is_action};
pub use error::{Error, Result};
pub use local::{LocalCommand, LocalControl, LocalOp};
pub use spotify::{Spotify, Track, monthly_playlist_name, next_repeat_state};
pub use token::{TokenStore, Tokens, unix_now};
pub use web::{Body, HttpClient, Method, Request, Response, UreqClient, WebApi};
