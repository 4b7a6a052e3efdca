// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Real-time event playback core for game audio.
//!
//! This crate turns a triggered sound event into sample-accurate interleaved
//! float PCM. Each playing occurrence of an event is an
//! [`playback::EventInstance`]; an external voice manager calls
//! [`playback::EventInstance::render`] once per audio callback until the
//! instance reports completion. Gameplay code steers a live instance through
//! its lock-free [`playback::EventHandle`].
//!
//! Static data (event and sound definitions, raw PCM) lives in [`project`]
//! and is shared read-only between instances. Pluggable collaborators
//! (buffer-picking policies, streaming decoders, DSP units) plug in through
//! the traits in [`source`].

pub mod config;
pub mod playback;
pub mod project;
pub mod source;

#[cfg(test)]
mod testutil;

pub use playback::{EventHandle, EventInstance, PlaybackState};
pub use project::{AudioData, EventDefinition, SoundDefinition};
