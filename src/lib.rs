//! tunesync - keep YouTube and Spotify playlists in step.
//!
//! Shared library for the `tunesync` and `replay-matches` binaries: title
//! normalization, fuzzy scoring, the cross-platform matcher and idempotent
//! playlist inserts.

pub mod config;
pub mod links;
pub mod matcher;
pub mod membership;
pub mod mirror;
pub mod models;
pub mod normalize;
pub mod platform;
pub mod progress;
pub mod scoring;
pub mod services;
pub mod session;

pub use config::MatchConfig;
pub use matcher::{explain_match, find_best_match};
pub use membership::{add_if_absent, MembershipCache};
pub use models::{AddOutcome, Candidate, PlaylistHandle, TrackDescriptor};
pub use normalize::{comparison_string, sanitize};
pub use platform::Platform;
