//! Integration test crate for Timeshift.
//!
//! This crate exists solely to hold cross-crate integration tests. It
//! drives the engine through a recording host at simulated refresh rates.

#[cfg(test)]
mod support;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod lifecycle;

#[cfg(test)]
mod audio;

#[cfg(test)]
mod subtitles;
