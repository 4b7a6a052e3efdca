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
use std::sync::Arc;

use super::sound::SoundDefinition;

/// Identifies a mix bus in the external bus hierarchy.
pub type MixBusId = u32;

/// Whether an event participates in 3D positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    NonPositional,
    Positional,
}

/// Behavior when an event is triggered while an instance is still playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetriggerMode {
    /// Restart the playing instance.
    Retrigger,
    /// Ignore the trigger.
    DontRetrigger,
}

/// Voice stealing policy when the instance limit is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StealingMode {
    StealQuietest,
    StealRandom,
    DontSteal,
}

/// Directional cone attenuation parameters for positional events.
///
/// Angles are stored as cosines. The defaults describe an omnidirectional
/// event (full gain everywhere).
#[derive(Debug, Clone, Copy)]
pub struct ConeAttenuation {
    pub inner_cos_angle: f32,
    pub outer_cos_angle: f32,
    pub outer_gain: f32,
}

impl Default for ConeAttenuation {
    fn default() -> ConeAttenuation {
        ConeAttenuation {
            inner_cos_angle: 1.0,
            outer_cos_angle: -1.0,
            outer_gain: 1.0,
        }
    }
}

/// Reference to streaming audio in a wave bank, resolved by the external
/// decoder rather than by this crate.
#[derive(Debug, Clone)]
pub struct StreamRef {
    wave_bank: String,
    entry_index: usize,
}

impl StreamRef {
    pub fn new(wave_bank: impl Into<String>, entry_index: usize) -> StreamRef {
        StreamRef {
            wave_bank: wave_bank.into(),
            entry_index,
        }
    }

    pub fn wave_bank(&self) -> &str {
        &self.wave_bank
    }

    pub fn entry_index(&self) -> usize {
        self.entry_index
    }
}

/// The audio backing an event: either a sound playlist held in memory or a
/// streaming reference decoded on the fly.
pub enum EventAudio {
    Sound(Arc<SoundDefinition>),
    Stream(StreamRef),
}

/// Where an event's output is routed.
///
/// Freeform events are built ad hoc from caller audio and are not part of
/// the shared mix graph; the explicit variant is what the render engine and
/// the release logic key off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    Bus(MixBusId),
    Freeform,
}

/// A static per-event-type descriptor, shared read-only across all
/// instances of the same event.
pub struct EventDefinition {
    id: String,
    gain: f32,
    pitch: f32,
    cone: ConeAttenuation,
    event_type: EventType,
    instance_limit: u32,
    retrigger_mode: RetriggerMode,
    stealing_mode: StealingMode,
    audio: EventAudio,
    routing: Routing,
}

impl EventDefinition {
    /// Creates an event definition with unit gain/pitch, an instance limit
    /// of one and an omnidirectional cone.
    pub fn new(id: impl Into<String>, audio: EventAudio, routing: Routing) -> EventDefinition {
        EventDefinition {
            id: id.into(),
            gain: 1.0,
            pitch: 1.0,
            cone: ConeAttenuation::default(),
            event_type: EventType::NonPositional,
            instance_limit: 1,
            retrigger_mode: RetriggerMode::Retrigger,
            stealing_mode: StealingMode::DontSteal,
            audio,
            routing,
        }
    }

    /// Sets the base gain and pitch.
    pub fn with_gain_and_pitch(mut self, gain: f32, pitch: f32) -> EventDefinition {
        self.gain = gain;
        self.pitch = pitch;
        self
    }

    /// Sets the event type.
    pub fn with_event_type(mut self, event_type: EventType) -> EventDefinition {
        self.event_type = event_type;
        self
    }

    /// Sets the cone attenuation parameters.
    pub fn with_cone(mut self, cone: ConeAttenuation) -> EventDefinition {
        self.cone = cone;
        self
    }

    /// Sets the instance limit.
    pub fn with_instance_limit(mut self, limit: u32) -> EventDefinition {
        self.instance_limit = limit;
        self
    }

    /// Sets the retrigger and stealing policies.
    pub fn with_policies(
        mut self,
        retrigger_mode: RetriggerMode,
        stealing_mode: StealingMode,
    ) -> EventDefinition {
        self.retrigger_mode = retrigger_mode;
        self.stealing_mode = stealing_mode;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn cone(&self) -> ConeAttenuation {
        self.cone
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn is_positional(&self) -> bool {
        self.event_type == EventType::Positional
    }

    pub fn instance_limit(&self) -> u32 {
        self.instance_limit
    }

    pub fn retrigger_mode(&self) -> RetriggerMode {
        self.retrigger_mode
    }

    pub fn stealing_mode(&self) -> StealingMode {
        self.stealing_mode
    }

    /// Returns the sound playlist backing this event, if it is not a
    /// streaming event.
    pub fn sound(&self) -> Option<&Arc<SoundDefinition>> {
        match &self.audio {
            EventAudio::Sound(sound) => Some(sound),
            EventAudio::Stream(_) => None,
        }
    }

    /// Returns the streaming reference, if this is a streaming event.
    pub fn stream(&self) -> Option<&StreamRef> {
        match &self.audio {
            EventAudio::Sound(_) => None,
            EventAudio::Stream(stream) => Some(stream),
        }
    }

    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// Returns true when this event was built ad hoc from caller audio
    /// rather than from the shared project data graph.
    pub fn is_freeform(&self) -> bool {
        self.routing == Routing::Freeform
    }
}

impl std::fmt::Debug for EventDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDefinition")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("routing", &self.routing)
            .field("streaming", &self.stream().is_some())
            .finish()
    }
}
