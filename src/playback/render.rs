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

//! The render loop: fills one callback's worth of interleaved float PCM
//! from an event instance, advancing all of its cursors.

use std::sync::Arc;

use super::instance::{is_unit_pitch, EventInstance, PlaybackState, PITCH_EPSILON};
use super::mix;
use super::param::StopRequest;
use crate::source::BufferPicker;

impl EventInstance {
    /// Renders one buffer of interleaved float PCM.
    ///
    /// Fills `frames * out_channels` samples of `out` (all of them, unless
    /// playback completes mid-call, in which case the tail is zeroed) and
    /// returns true when the instance has finished and should be recycled
    /// or released. A true return means no audio was necessarily produced
    /// this call; the caller must not accumulate the buffer blindly.
    ///
    /// `bus_pitch` is the accumulated pitch of the mix bus hierarchy,
    /// computed externally. Buffer chaining goes through `picker` for
    /// sound-backed instances and through the attached decoder for
    /// streaming ones.
    ///
    /// Never blocks, locks or allocates; callable from a real-time
    /// deadline.
    pub fn render(
        &mut self,
        out: &mut [f32],
        out_channels: usize,
        frames: usize,
        bus_pitch: f32,
        picker: &dyn BufferPicker,
    ) -> bool {
        let out_len = frames * out_channels;
        debug_assert!(out.len() >= out_len);

        // Fold any pending stop request into the state machine. Requests
        // are edges: the skip-ahead below must run exactly once.
        let mut skip_to_last_buffer = false;
        if let Some(request) = self.control.take_stop_request() {
            self.state = match request {
                StopRequest::Stop => PlaybackState::StopRequested,
                StopRequest::PlayLastBufferAndStop => {
                    skip_to_last_buffer = true;
                    PlaybackState::PlayLastBufferAndStopRequested
                }
                StopRequest::StopAndUnload => PlaybackState::StopAndUnloadRequested,
            };
        }

        match self.state {
            PlaybackState::StopAndUnloadRequested => {
                return true;
            }
            PlaybackState::StopRequested if self.allows_immediate_stop() => {
                self.state = PlaybackState::Stopped;
                return true;
            }
            PlaybackState::PlayLastBufferAndStopRequested
                if skip_to_last_buffer && self.allows_immediate_stop() =>
            {
                // Skip ahead once so the buffer now playing is the final one.
                if self.chain_next_buffer(picker, false) {
                    mix::clear(&mut out[..out_len]);
                    self.state = PlaybackState::Stopped;
                    return true;
                }
            }
            PlaybackState::Playing if self.control.is_paused() => {
                mix::clear(&mut out[..out_len]);
                return false;
            }
            PlaybackState::Playing => {
                // Keep the snapshot out of division-degenerate territory.
                if self.pitch_mixer < PITCH_EPSILON {
                    self.pitch_mixer = PITCH_EPSILON;
                }
            }
            _ => {}
        }

        // Fade progress for the whole buffer. Hitting silence terminates
        // the voice even if source audio remains.
        self.fade_gain += self.control.fade_incr_per_frame() * frames as f32;
        if self.fade_gain > 1.0 {
            self.fade_gain = 1.0;
        } else if self.fade_gain <= 0.0 {
            self.fade_gain = 0.0;
            return true;
        }

        let mut out_frame_idx = 0;
        let mut done_playing = false;

        // Fill the output from the current source buffer, chaining to the
        // next one whenever the source runs out mid-call.
        loop {
            if self.cursor.buffer().is_none() {
                // First buffer after a start is installed lazily.
                if self.chain_next_buffer(picker, true) {
                    mix::clear(&mut out[out_frame_idx * out_channels..out_len]);
                    done_playing = true;
                    break;
                }
            }

            let mut effective_pitch = self.pitch_mixer * self.sound_pitch * bus_pitch;
            if effective_pitch < PITCH_EPSILON {
                effective_pitch = PITCH_EPSILON;
            }
            let unit_pitch = is_unit_pitch(effective_pitch);

            let requested = frames - out_frame_idx;
            let source_frames_left = self.remaining_out_frames(effective_pitch);
            let mut end_of_source = false;
            let mut pass_frames = requested;
            if source_frames_left < requested {
                end_of_source = true;
                pass_frames = source_frames_left;
                if !unit_pitch {
                    // A fractional tail still inside the buffer yields one
                    // more output frame.
                    let buffer = self.cursor.buffer().expect("buffer installed above");
                    let consumed = self.cursor.frame_index() as f32
                        + self.cursor.pitch_accumulator()
                        + source_frames_left as f32 * effective_pitch;
                    if (consumed as usize) < buffer.frame_count() {
                        pass_frames += 1;
                    }
                }
                pass_frames = pass_frames.min(requested);
            }

            if pass_frames > 0 {
                let buffer = self
                    .cursor
                    .buffer()
                    .expect("buffer installed above")
                    .clone();
                let src_channels = buffer.channel_count() as usize;
                let out_slice = &mut out[out_frame_idx * out_channels
                    ..(out_frame_idx + pass_frames) * out_channels];

                if unit_pitch {
                    let new_index = mix::mix_unit_pitch(
                        buffer.samples(),
                        src_channels,
                        self.cursor.frame_index(),
                        out_slice,
                        out_channels,
                        self.sound_gain,
                    );
                    let accumulator = self.cursor.pitch_accumulator();
                    self.cursor.advance_to(new_index, accumulator);
                } else {
                    let (new_index, accumulator) = mix::mix_pitched(
                        buffer.samples(),
                        src_channels,
                        self.cursor.frame_index(),
                        self.cursor.pitch_accumulator(),
                        out_slice,
                        out_channels,
                        self.sound_gain,
                        effective_pitch,
                    );
                    self.cursor.advance_to(new_index, accumulator);
                }
                out_frame_idx += pass_frames;
            }

            if end_of_source {
                self.cursor.note_buffer_played();
                let finished = if matches!(
                    self.state,
                    PlaybackState::StopRequested | PlaybackState::PlayLastBufferAndStopRequested
                ) {
                    // A deferred stop ends once the current buffer has
                    // finished.
                    true
                } else {
                    self.chain_next_buffer(picker, false)
                };

                if finished {
                    mix::clear(&mut out[out_frame_idx * out_channels..out_len]);
                    done_playing = true;
                    break;
                }
                // A new source buffer was installed; keep filling the
                // rest of the output this same call.
            } else {
                debug_assert_eq!(out_frame_idx, frames);
                break;
            }
        }

        // Feed the mixed output through the instance's DSP unit, if any.
        if let Some(dsp) = &self.dsp_mixer {
            dsp.process(&mut out[..out_len], out_channels, frames);
        }

        // Apply the per-buffer output gain with a ramp. The sentinel snaps
        // the previous value on the first buffer after a start so playback
        // never ramps in from a stale gain.
        let effective_gain = [
            self.fade_gain * self.gain_mixer[0],
            self.fade_gain * self.gain_mixer[1],
        ];
        if self.prev_effective_gain[0] < 0.0 {
            self.prev_effective_gain = effective_gain;
        }
        mix::apply_gain_ramp(
            &mut out[..out_len],
            out_channels,
            frames,
            self.prev_effective_gain,
            effective_gain,
        );
        self.prev_effective_gain = effective_gain;

        done_playing
    }

    /// Returns how many output frames the current source buffer can still
    /// produce at the given pitch. Never negative, even with a cursor at
    /// or past the end of the buffer.
    pub fn remaining_out_frames(&self, pitch: f32) -> usize {
        let Some(buffer) = self.cursor.buffer() else {
            return 0;
        };
        let total = buffer.frame_count();
        if is_unit_pitch(pitch) {
            total.saturating_sub(self.cursor.frame_index())
        } else {
            let remaining = (total as f32
                - self.cursor.frame_index() as f32
                - self.cursor.pitch_accumulator())
                / pitch.max(PITCH_EPSILON);
            if remaining <= 0.0 {
                0
            } else {
                remaining as usize
            }
        }
    }

    /// Obtains the next source buffer: from the streaming decoder if one
    /// is attached, otherwise from the sound's buffer-picking policy.
    /// Instances with neither finish when their ad-hoc buffer runs out.
    /// Returns true when playback has finished.
    fn chain_next_buffer(&mut self, picker: &dyn BufferPicker, first: bool) -> bool {
        if let Some(decoder) = self.decoder.as_mut() {
            return decoder.decode_next(&mut self.cursor);
        }
        let definition = Arc::clone(&self.definition);
        match definition.sound() {
            Some(sound) => picker.pick_next(sound, &mut self.cursor, first),
            None => true,
        }
    }
}
