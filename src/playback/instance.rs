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

//! Event instances: the mutable per-playback state of a triggered event.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use rand::Rng;

use super::param::{EventControl, EventHandle};
use crate::project::{AudioData, EventDefinition};
use crate::source::{DspUnit, StreamDecoder};

/// Pitch values below this floor are clamped up to it, and pitch within
/// this distance of 1.0 selects the non-resampling mix path.
pub const PITCH_EPSILON: f32 = 1e-3;

/// Sentinel for "no previous effective gain yet": the first gain ramp
/// after a start snaps instead of ramping from a stale value.
pub(super) const NO_PREV_GAIN: f32 = -1.0;

/// The playback state of an event instance, evaluated at the top of every
/// render call. The paused flag is orthogonal and only consulted while
/// `Playing`; stop requests always win over pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    /// Stop as soon as the sound permits; sounds with deferred stop finish
    /// their current buffer first.
    StopRequested,
    /// The buffer now playing (after a one-time skip ahead) is the last.
    PlayLastBufferAndStopRequested,
    /// Produce no further audio at all; the caller is unloading wave data.
    StopAndUnloadRequested,
}

/// The render-thread-owned source cursor: which PCM buffer is playing and
/// how far into it playback has advanced.
pub struct RenderCursor {
    buffer: Option<Arc<AudioData>>,
    frame_index: usize,
    pitch_accumulator: f32,
    buffers_played: u32,
    entry_index: usize,
}

impl RenderCursor {
    pub fn new() -> RenderCursor {
        RenderCursor {
            buffer: None,
            frame_index: 0,
            pitch_accumulator: 0.0,
            buffers_played: 0,
            entry_index: 0,
        }
    }

    /// Makes the given buffer current and rewinds the frame index. The
    /// fractional pitch accumulator is kept so phase stays continuous
    /// across buffer boundaries.
    pub fn install(&mut self, buffer: Arc<AudioData>) {
        self.buffer = Some(buffer);
        self.frame_index = 0;
    }

    /// Returns the current PCM buffer, if any.
    pub fn buffer(&self) -> Option<&Arc<AudioData>> {
        self.buffer.as_ref()
    }

    /// Returns the current source frame index.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Returns the fractional source position carried between calls.
    pub fn pitch_accumulator(&self) -> f32 {
        self.pitch_accumulator
    }

    /// Returns how many buffers have finished playing.
    pub fn buffers_played(&self) -> u32 {
        self.buffers_played
    }

    /// Returns the playlist position of the current buffer.
    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Sets the playlist position; used by buffer-picking policies.
    pub fn set_entry_index(&mut self, entry_index: usize) {
        self.entry_index = entry_index;
    }

    pub(crate) fn note_buffer_played(&mut self) {
        self.buffers_played += 1;
    }

    pub(super) fn advance_to(&mut self, frame_index: usize, pitch_accumulator: f32) {
        self.frame_index = frame_index;
        self.pitch_accumulator = pitch_accumulator;
    }

    pub(super) fn reset(&mut self) {
        self.buffer = None;
        self.frame_index = 0;
        self.pitch_accumulator = 0.0;
        self.buffers_played = 0;
        self.entry_index = 0;
    }
}

impl Default for RenderCursor {
    fn default() -> RenderCursor {
        RenderCursor::new()
    }
}

/// One currently-playing (or paused, or stopping) occurrence of an event.
///
/// The instance is owned by the render side; gameplay code steers it
/// through the [`EventHandle`]. All fields the mix loop reads are either
/// private cursor state or snapshots taken at [`EventInstance::sync_mixer_state`],
/// so a control-thread write is never observed torn mid-buffer.
pub struct EventInstance {
    pub(super) definition: Arc<EventDefinition>,
    pub(super) control: Arc<EventControl>,
    pub(super) dsp_rx: Receiver<Option<Arc<dyn DspUnit>>>,

    // Mixer snapshots, refreshed once per mix tick.
    pub(super) pitch_mixer: f32,
    pub(super) gain_mixer: [f32; 2],
    pub(super) dsp_mixer: Option<Arc<dyn DspUnit>>,

    // Render-thread-private state.
    pub(super) cursor: RenderCursor,
    pub(super) fade_gain: f32,
    pub(super) prev_effective_gain: [f32; 2],
    pub(super) sound_pitch: f32,
    pub(super) sound_gain: f32,
    pub(super) state: PlaybackState,
    pub(super) decoder: Option<Box<dyn StreamDecoder>>,
}

impl EventInstance {
    /// Creates an instance in the stopped state with default parameters.
    pub fn new(definition: Arc<EventDefinition>) -> EventInstance {
        let (control, dsp_rx) = EventControl::new();
        EventInstance {
            definition,
            control: Arc::new(control),
            dsp_rx,
            pitch_mixer: 1.0,
            gain_mixer: [1.0, 1.0],
            dsp_mixer: None,
            cursor: RenderCursor::new(),
            fade_gain: 1.0,
            prev_effective_gain: [NO_PREV_GAIN, NO_PREV_GAIN],
            sound_pitch: 1.0,
            sound_gain: 1.0,
            state: PlaybackState::Stopped,
            decoder: None,
        }
    }

    /// Returns a control handle for the gameplay thread.
    pub fn handle(&self) -> EventHandle {
        EventHandle::new(self.control.clone())
    }

    /// Returns the shared definition this instance plays.
    pub fn definition(&self) -> &Arc<EventDefinition> {
        &self.definition
    }

    /// Returns true when this instance plays a freeform event.
    pub fn is_freeform(&self) -> bool {
        self.definition.is_freeform()
    }

    /// Resets the render cursor and ramp sentinels, draws this take's
    /// randomized sound gain and pitch, and switches to playing. The first
    /// buffer is installed lazily on the next render call.
    pub fn start(&mut self) {
        self.cursor.reset();
        self.prev_effective_gain = [NO_PREV_GAIN, NO_PREV_GAIN];
        self.state = PlaybackState::Playing;

        let (pitch, gain) = match self.definition.sound() {
            Some(sound) => {
                let mut rng = rand::thread_rng();
                (
                    vary(sound.pitch(), sound.pitch_variation(), &mut rng).max(PITCH_EPSILON),
                    vary(sound.gain(), sound.gain_variation(), &mut rng).max(0.0),
                )
            }
            None => (1.0, 1.0),
        };
        self.sound_pitch = pitch;
        self.sound_gain = gain;
    }

    /// Copies the control-thread parameters into the mixer snapshots.
    /// Called by the voice manager once per mix tick, before the render
    /// calls of that tick; until then the render loop keeps mixing with
    /// the previous values.
    pub fn sync_mixer_state(&mut self) {
        self.pitch_mixer = self.control.pitch();
        self.gain_mixer = [self.control.gain_left(), self.control.gain_right()];
        while let Ok(dsp) = self.dsp_rx.try_recv() {
            self.dsp_mixer = dsp;
        }
    }

    /// Attaches a streaming decoder. A decoder-backed instance chains
    /// buffers through the decoder and never consults the sound's
    /// buffer-picking policy.
    pub fn set_decoder(&mut self, decoder: Box<dyn StreamDecoder>) {
        self.decoder = Some(decoder);
    }

    /// Detaches the streaming decoder.
    pub fn clear_decoder(&mut self) {
        self.decoder = None;
    }

    /// Returns the current playback state.
    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    /// Returns the current fade gain in [0, 1].
    pub fn fade_gain(&self) -> f32 {
        self.fade_gain
    }

    /// Sets the fade gain directly; used by the voice manager to prime a
    /// fade-in before starting the instance.
    pub fn set_fade_gain(&mut self, fade_gain: f32) {
        self.fade_gain = fade_gain.clamp(0.0, 1.0);
    }

    /// Returns the render cursor.
    pub fn cursor(&self) -> &RenderCursor {
        &self.cursor
    }

    /// Returns the render cursor mutably; used to install ad-hoc PCM
    /// buffers on instances without a sound or decoder.
    pub fn cursor_mut(&mut self) -> &mut RenderCursor {
        &mut self.cursor
    }

    /// True when the active sound permits stopping mid-buffer. Instances
    /// without a sound always stop immediately.
    pub(super) fn allows_immediate_stop(&self) -> bool {
        self.definition.sound().map_or(true, |s| !s.defer_stop())
    }
}

impl std::fmt::Debug for EventInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventInstance")
            .field("event", &self.definition.id())
            .field("state", &self.state)
            .field("buffers_played", &self.cursor.buffers_played())
            .field("fade_gain", &self.fade_gain)
            .finish()
    }
}

/// True when the pitch is close enough to 1.0 that resampling can be
/// skipped.
pub(super) fn is_unit_pitch(pitch: f32) -> bool {
    (pitch - 1.0).abs() < PITCH_EPSILON
}

fn vary<R: Rng>(base: f32, variation: f32, rng: &mut R) -> f32 {
    if variation <= 0.0 {
        base
    } else {
        base + rng.gen_range(-variation..=variation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{
        EventAudio, PlaybackMode, Routing, SampleStorage, SoundDefinition,
    };

    fn sound_event(sound: SoundDefinition) -> EventInstance {
        let definition = EventDefinition::new(
            "test/event",
            EventAudio::Sound(Arc::new(sound)),
            Routing::Bus(0),
        );
        EventInstance::new(Arc::new(definition))
    }

    fn plain_sound() -> SoundDefinition {
        let entry = Arc::new(AudioData::new(SampleStorage::Owned(vec![0; 8]), 1, 8));
        SoundDefinition::new(vec![entry], PlaybackMode::Sequential, 1)
    }

    #[test]
    fn test_new_instance_defaults() {
        let instance = sound_event(plain_sound());

        assert_eq!(instance.playback_state(), PlaybackState::Stopped);
        assert_eq!(instance.fade_gain(), 1.0);
        assert_eq!(instance.pitch_mixer, 1.0);
        assert_eq!(instance.gain_mixer, [1.0, 1.0]);
        assert!(instance.cursor().buffer().is_none());
        assert_eq!(instance.sound_pitch, 1.0);
        assert_eq!(instance.sound_gain, 1.0);
    }

    #[test]
    fn test_start_resets_cursor_and_ramp() {
        let mut instance = sound_event(plain_sound());
        instance.cursor.advance_to(5, 0.5);
        instance.cursor.note_buffer_played();
        instance.prev_effective_gain = [0.7, 0.7];

        instance.start();

        assert_eq!(instance.playback_state(), PlaybackState::Playing);
        assert_eq!(instance.cursor().frame_index(), 0);
        assert_eq!(instance.cursor().pitch_accumulator(), 0.0);
        assert_eq!(instance.cursor().buffers_played(), 0);
        assert_eq!(instance.prev_effective_gain, [NO_PREV_GAIN, NO_PREV_GAIN]);
    }

    #[test]
    fn test_start_randomizes_within_variation() {
        let sound = plain_sound().with_gain(0.8, 0.1).with_pitch(1.0, 0.2);
        let mut instance = sound_event(sound);

        for _ in 0..50 {
            instance.start();
            assert!(instance.sound_pitch >= 0.8 - 1e-6);
            assert!(instance.sound_pitch <= 1.2 + 1e-6);
            assert!(instance.sound_gain >= 0.7 - 1e-6);
            assert!(instance.sound_gain <= 0.9 + 1e-6);
        }
    }

    #[test]
    fn test_start_without_variation_is_deterministic() {
        let mut instance = sound_event(plain_sound());
        instance.start();
        assert_eq!(instance.sound_pitch, 1.0);
        assert_eq!(instance.sound_gain, 1.0);
    }

    #[test]
    fn test_sync_snapshots_parameters() {
        let mut instance = sound_event(plain_sound());
        let handle = instance.handle();

        handle.set_pitch(2.0);
        handle.set_gain(0.5, 0.25);
        // Not visible until the mix-tick snapshot.
        assert_eq!(instance.pitch_mixer, 1.0);
        assert_eq!(instance.gain_mixer, [1.0, 1.0]);

        instance.sync_mixer_state();
        assert_eq!(instance.pitch_mixer, 2.0);
        assert_eq!(instance.gain_mixer, [0.5, 0.25]);
    }

    #[test]
    fn test_unit_pitch_classification() {
        assert!(is_unit_pitch(1.0));
        assert!(is_unit_pitch(1.0 + PITCH_EPSILON / 2.0));
        assert!(is_unit_pitch(1.0 - PITCH_EPSILON / 2.0));
        assert!(!is_unit_pitch(1.1));
        assert!(!is_unit_pitch(0.9));
    }

    #[test]
    fn test_instance_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<EventInstance>();
        assert_send::<EventHandle>();
    }
}
