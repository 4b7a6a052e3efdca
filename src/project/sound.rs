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

use super::audio_data::AudioData;

/// How a sound advances through its audio data playlist.
///
/// Only the sequential modes are interpreted inside this crate (see the
/// reference picker); the random modes are carried for external
/// buffer-picking policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Sequential,
    SequentialLoop,
    Random,
    RandomNoRepeat,
    InRandomOrder,
    InRandomOrderLoop,
}

/// A static, shareable descriptor of a playable unit: an ordered playlist
/// of PCM buffers plus gain/pitch base values and variation ranges.
pub struct SoundDefinition {
    entries: Vec<Arc<AudioData>>,
    playback_mode: PlaybackMode,
    /// Total number of buffers to play before the sound finishes.
    /// Zero means unlimited.
    playback_count: u32,
    /// When set, stop requests must wait for the current buffer to finish.
    defer_stop: bool,
    gain: f32,
    gain_variation: f32,
    pitch: f32,
    pitch_variation: f32,
}

impl SoundDefinition {
    /// Creates a sound playing the given entries with unit gain and pitch
    /// and no variation.
    pub fn new(
        entries: Vec<Arc<AudioData>>,
        playback_mode: PlaybackMode,
        playback_count: u32,
    ) -> SoundDefinition {
        SoundDefinition {
            entries,
            playback_mode,
            playback_count,
            defer_stop: false,
            gain: 1.0,
            gain_variation: 0.0,
            pitch: 1.0,
            pitch_variation: 0.0,
        }
    }

    /// Sets the base gain and the per-take variation range.
    pub fn with_gain(mut self, gain: f32, variation: f32) -> SoundDefinition {
        self.gain = gain;
        self.gain_variation = variation;
        self
    }

    /// Sets the base pitch and the per-take variation range.
    pub fn with_pitch(mut self, pitch: f32, variation: f32) -> SoundDefinition {
        self.pitch = pitch;
        self.pitch_variation = variation;
        self
    }

    /// Forbids stopping this sound mid-buffer.
    pub fn with_defer_stop(mut self, defer_stop: bool) -> SoundDefinition {
        self.defer_stop = defer_stop;
        self
    }

    /// Returns the ordered audio data playlist.
    pub fn entries(&self) -> &[Arc<AudioData>] {
        &self.entries
    }

    /// Returns the playback mode.
    pub fn playback_mode(&self) -> PlaybackMode {
        self.playback_mode
    }

    /// Returns the total number of buffers to play (zero = unlimited).
    pub fn playback_count(&self) -> u32 {
        self.playback_count
    }

    /// Returns true when stop requests must wait for the current buffer.
    pub fn defer_stop(&self) -> bool {
        self.defer_stop
    }

    /// Returns the base gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Returns the per-take gain variation range.
    pub fn gain_variation(&self) -> f32 {
        self.gain_variation
    }

    /// Returns the base pitch.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Returns the per-take pitch variation range.
    pub fn pitch_variation(&self) -> f32 {
        self.pitch_variation
    }
}

impl std::fmt::Debug for SoundDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundDefinition")
            .field("entries", &self.entries.len())
            .field("playback_mode", &self.playback_mode)
            .field("playback_count", &self.playback_count)
            .field("defer_stop", &self.defer_stop)
            .finish()
    }
}
