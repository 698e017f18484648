//! Integration test crate for Collab-Mix.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives `collabmix-session` against scriptable fake engines and
//! microphones so async completions can be released on demand.


#[cfg(test)]
mod lifecycle;


#[cfg(test)]
mod recording;


#[cfg(test)]
mod properties;
