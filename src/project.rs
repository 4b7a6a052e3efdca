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

//! Static, shareable project data: raw PCM buffers, sound playlists and
//! per-event-type descriptors.
//!
//! Everything in this module is read-only from the render engine's point of
//! view. Definitions are shared between all instances of the same event via
//! `Arc`; the external data provider builds them, this crate only consumes
//! them.

mod audio_data;
mod event;
mod sound;

pub use audio_data::{AudioData, SampleStorage};
pub use event::{
    ConeAttenuation, EventAudio, EventDefinition, EventType, MixBusId, RetriggerMode, Routing,
    StealingMode, StreamRef,
};
pub use sound::{PlaybackMode, SoundDefinition};
