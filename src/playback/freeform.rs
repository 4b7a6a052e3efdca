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

//! Freeform events: self-contained event/sound/audio-data triples built
//! from caller-supplied PCM or an audio file, bypassing the shared project
//! data graph.
//!
//! A freeform instance exclusively owns its definition chain, so dropping
//! it frees everything it allocated. Caller PCM passed to [`from_buffer`]
//! is reference counted and never freed out from under the caller.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::instance::EventInstance;
use crate::config::Playback;
use crate::project::{
    AudioData, EventAudio, EventDefinition, EventType, PlaybackMode, Routing, SampleStorage,
    SoundDefinition,
};
use crate::source::FileLoadError;

/// Errors from freeform event construction. A failed construction leaves
/// no partially built event behind.
#[derive(Debug, thiserror::Error)]
pub enum FreeformError {
    #[error("invalid freeform PCM: {0}")]
    InvalidParameter(String),

    #[error("positional events must use mono audio, got {0} channels")]
    PositionalMustBeMono(u16),

    #[error("failed to load audio file: {0}")]
    Load(#[from] FileLoadError),
}

/// Creates a freeform event playing caller-supplied 16-bit PCM. The
/// samples are shared, not copied; the caller's allocation stays valid
/// after the event is released.
pub fn from_buffer(
    samples: Arc<[i16]>,
    channel_count: u16,
    frame_count: usize,
    event_type: EventType,
) -> Result<EventInstance, FreeformError> {
    if frame_count < 1 {
        return Err(FreeformError::InvalidParameter(
            "at least one frame is required".to_string(),
        ));
    }
    if !(1..=2).contains(&channel_count) {
        return Err(FreeformError::InvalidParameter(format!(
            "expected 1 or 2 channels, got {}",
            channel_count
        )));
    }
    if samples.len() != frame_count * channel_count as usize {
        return Err(FreeformError::InvalidParameter(format!(
            "expected {} samples for {} frames x {} channels, got {}",
            frame_count * channel_count as usize,
            frame_count,
            channel_count,
            samples.len()
        )));
    }

    debug!(
        frames = frame_count,
        channels = channel_count,
        "Creating freeform event from caller PCM"
    );
    from_audio_data(
        AudioData::new(SampleStorage::Shared(samples), channel_count, frame_count),
        event_type,
    )
}

/// Creates a freeform event from an audio file, decoded to 16-bit PCM at
/// the configured engine sample rate. Positional events must be mono.
pub fn from_file<P: AsRef<Path>>(
    path: P,
    event_type: EventType,
    config: &Playback,
) -> Result<EventInstance, FreeformError> {
    let audio = crate::source::load_audio_file(path.as_ref(), config.sample_rate())?;
    if event_type == EventType::Positional && audio.channel_count() != 1 {
        return Err(FreeformError::PositionalMustBeMono(audio.channel_count()));
    }

    debug!(path = ?path.as_ref(), "Creating freeform event from file");
    from_audio_data(audio, event_type)
}

/// Creates a freeform event from an already-built PCM descriptor.
pub fn from_audio_data(
    audio: AudioData,
    event_type: EventType,
) -> Result<EventInstance, FreeformError> {
    if audio.frame_count() < 1 {
        return Err(FreeformError::InvalidParameter(
            "at least one frame is required".to_string(),
        ));
    }
    if !(1..=2).contains(&audio.channel_count()) {
        return Err(FreeformError::InvalidParameter(format!(
            "expected 1 or 2 channels, got {}",
            audio.channel_count()
        )));
    }

    // Freeform events always play their single buffer once, with no
    // gain or pitch variation.
    let sound = SoundDefinition::new(vec![Arc::new(audio)], PlaybackMode::Sequential, 1);
    let definition = EventDefinition::new(
        "freeform",
        EventAudio::Sound(Arc::new(sound)),
        Routing::Freeform,
    )
    .with_event_type(event_type);

    Ok(EventInstance::new(Arc::new(definition)))
}

/// Releases a freeform event and the definition chain it exclusively
/// owns. Dropping the instance is equivalent; this entry point exists for
/// symmetry with the voice manager's recycle-or-release contract.
pub fn release(instance: EventInstance) {
    if !instance.is_freeform() {
        warn!(
            event = instance.definition().id(),
            "release called on a managed event instance"
        );
    } else {
        debug!("Releasing freeform event");
    }
    drop(instance);
}
