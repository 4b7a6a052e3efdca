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

//! Lock-free parameter handoff between the control thread and the render
//! thread.
//!
//! The control thread writes through an [`EventHandle`]; the render thread
//! copies the values it mixes with into private snapshots at the mix-tick
//! boundary. Scalar parameters are plain atomic cells, so a write is never
//! observed torn; the DSP unit pointer crosses over on a channel drained
//! with `try_recv` so the render thread never blocks.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::source::DspUnit;

/// An f32 cell written by one thread and read by another without locks.
pub(crate) struct ParamCell {
    bits: AtomicU32,
}

impl ParamCell {
    pub(crate) fn new(value: f32) -> ParamCell {
        ParamCell {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub(crate) fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// A stop request posted by the control thread, consumed once by the
/// render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopRequest {
    /// Stop as soon as the sound permits.
    Stop,
    /// Skip ahead one buffer and let that buffer finish before stopping.
    PlayLastBufferAndStop,
    /// Stop without producing any further audio at all.
    StopAndUnload,
}

const STOP_REQUEST_NONE: u8 = 0;
const STOP_REQUEST_STOP: u8 = 1;
const STOP_REQUEST_PLAY_LAST: u8 = 2;
const STOP_REQUEST_UNLOAD: u8 = 3;

/// The shared control block of one event instance.
pub(crate) struct EventControl {
    pitch: ParamCell,
    gain_left: ParamCell,
    gain_right: ParamCell,
    fade_incr_per_frame: ParamCell,
    position: [ParamCell; 3],
    velocity: [ParamCell; 3],
    direction: [ParamCell; 3],
    balance: ParamCell,
    paused: AtomicBool,
    stop_request: AtomicU8,
    dsp_tx: Sender<Option<Arc<dyn DspUnit>>>,
}

impl EventControl {
    /// Creates a control block and the render-side receiving end of the
    /// DSP handoff.
    pub(crate) fn new() -> (EventControl, Receiver<Option<Arc<dyn DspUnit>>>) {
        let (dsp_tx, dsp_rx) = crossbeam_channel::unbounded();
        let control = EventControl {
            pitch: ParamCell::new(1.0),
            gain_left: ParamCell::new(1.0),
            gain_right: ParamCell::new(1.0),
            fade_incr_per_frame: ParamCell::new(0.0),
            position: [ParamCell::new(0.0), ParamCell::new(0.0), ParamCell::new(0.0)],
            velocity: [ParamCell::new(0.0), ParamCell::new(0.0), ParamCell::new(0.0)],
            direction: [ParamCell::new(0.0), ParamCell::new(0.0), ParamCell::new(0.0)],
            balance: ParamCell::new(0.0),
            paused: AtomicBool::new(false),
            stop_request: AtomicU8::new(STOP_REQUEST_NONE),
            dsp_tx,
        };
        (control, dsp_rx)
    }

    pub(crate) fn pitch(&self) -> f32 {
        self.pitch.get()
    }

    pub(crate) fn gain_left(&self) -> f32 {
        self.gain_left.get()
    }

    pub(crate) fn gain_right(&self) -> f32 {
        self.gain_right.get()
    }

    pub(crate) fn fade_incr_per_frame(&self) -> f32 {
        self.fade_incr_per_frame.get()
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub(crate) fn post_stop_request(&self, request: StopRequest) {
        let encoded = match request {
            StopRequest::Stop => STOP_REQUEST_STOP,
            StopRequest::PlayLastBufferAndStop => STOP_REQUEST_PLAY_LAST,
            StopRequest::StopAndUnload => STOP_REQUEST_UNLOAD,
        };
        self.stop_request.store(encoded, Ordering::SeqCst);
    }

    /// Consumes the pending stop request, if any. Requests are edges: the
    /// render thread acts on each exactly once.
    pub(crate) fn take_stop_request(&self) -> Option<StopRequest> {
        match self.stop_request.swap(STOP_REQUEST_NONE, Ordering::SeqCst) {
            STOP_REQUEST_STOP => Some(StopRequest::Stop),
            STOP_REQUEST_PLAY_LAST => Some(StopRequest::PlayLastBufferAndStop),
            STOP_REQUEST_UNLOAD => Some(StopRequest::StopAndUnload),
            _ => None,
        }
    }
}

/// The control thread's view of a live event instance.
///
/// Handles are cheap to clone and never block: every operation is an
/// atomic store or a channel send. Parameter changes become audible after
/// the next mix-tick snapshot, giving at most one buffer of latency.
#[derive(Clone)]
pub struct EventHandle {
    control: Arc<EventControl>,
}

impl EventHandle {
    pub(crate) fn new(control: Arc<EventControl>) -> EventHandle {
        EventHandle { control }
    }

    /// Sets the user pitch multiplier.
    pub fn set_pitch(&self, pitch: f32) {
        self.control.pitch.set(pitch);
    }

    /// Sets the per-channel output gains.
    pub fn set_gain(&self, left: f32, right: f32) {
        self.control.gain_left.set(left);
        self.control.gain_right.set(right);
    }

    /// Sets the world position of the event.
    pub fn set_position(&self, x: f32, y: f32, z: f32) {
        set_vec3(&self.control.position, x, y, z);
    }

    /// Returns the world position of the event.
    pub fn position(&self) -> [f32; 3] {
        get_vec3(&self.control.position)
    }

    /// Sets the velocity of the event.
    pub fn set_velocity(&self, x: f32, y: f32, z: f32) {
        set_vec3(&self.control.velocity, x, y, z);
    }

    /// Returns the velocity of the event.
    pub fn velocity(&self) -> [f32; 3] {
        get_vec3(&self.control.velocity)
    }

    /// Sets the facing direction of the event (for cone attenuation).
    pub fn set_direction(&self, x: f32, y: f32, z: f32) {
        set_vec3(&self.control.direction, x, y, z);
    }

    /// Returns the facing direction of the event.
    pub fn direction(&self) -> [f32; 3] {
        get_vec3(&self.control.direction)
    }

    /// Sets the stereo balance in [-1, 1].
    pub fn set_balance(&self, balance: f32) {
        self.control.balance.set(balance);
    }

    /// Returns the stereo balance.
    pub fn balance(&self) -> f32 {
        self.control.balance.get()
    }

    /// Pauses playback. The instance renders silence but stays alive.
    pub fn pause(&self) {
        self.control.paused.store(true, Ordering::Relaxed);
    }

    /// Resumes a paused instance.
    pub fn resume(&self) {
        self.control.paused.store(false, Ordering::Relaxed);
    }

    /// Returns true when the instance is paused.
    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Requests a stop. Takes effect at the next render call; sounds with
    /// deferred stop finish their current buffer first.
    pub fn stop(&self) {
        self.control.post_stop_request(StopRequest::Stop);
    }

    /// Requests a stop after one more buffer: the playlist advances once
    /// and the buffer then playing becomes the last one.
    pub fn stop_after_current(&self) {
        self.control.post_stop_request(StopRequest::PlayLastBufferAndStop);
    }

    /// Requests an unconditional stop with no further audio, used when the
    /// instance's wave data is about to be unloaded.
    pub fn stop_and_unload(&self) {
        self.control.post_stop_request(StopRequest::StopAndUnload);
    }

    /// Sets the raw fade-gain increment applied per rendered frame.
    pub fn set_fade_increment(&self, incr_per_frame: f32) {
        self.control.fade_incr_per_frame.set(incr_per_frame);
    }

    /// Fades in over the given number of frames.
    pub fn fade_in(&self, frames: u64) {
        self.set_fade_increment(fade_increment(frames));
    }

    /// Fades out over the given number of frames. When the fade reaches
    /// silence the instance reports completion.
    pub fn fade_out(&self, frames: u64) {
        self.set_fade_increment(-fade_increment(frames));
    }

    /// Attaches a DSP unit, replacing any current one. The unit becomes
    /// active at the next mix-tick snapshot.
    pub fn attach_dsp(&self, dsp: Arc<dyn DspUnit>) {
        // A send only fails when the instance is gone, which is fine.
        let _ = self.control.dsp_tx.send(Some(dsp));
    }

    /// Detaches the DSP unit at the next mix-tick snapshot.
    pub fn clear_dsp(&self) {
        let _ = self.control.dsp_tx.send(None);
    }
}

fn set_vec3(cells: &[ParamCell; 3], x: f32, y: f32, z: f32) {
    cells[0].set(x);
    cells[1].set(y);
    cells[2].set(z);
}

fn get_vec3(cells: &[ParamCell; 3]) -> [f32; 3] {
    [cells[0].get(), cells[1].get(), cells[2].get()]
}

/// A per-frame increment that crosses the full fade range in `frames`
/// frames. Zero frames means an immediate fade.
fn fade_increment(frames: u64) -> f32 {
    if frames == 0 {
        1.0
    } else {
        1.0 / frames as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_cell_round_trip() {
        let cell = ParamCell::new(1.0);
        assert_eq!(cell.get(), 1.0);
        cell.set(0.25);
        assert_eq!(cell.get(), 0.25);
        cell.set(-3.5);
        assert_eq!(cell.get(), -3.5);
    }

    #[test]
    fn test_stop_request_consumed_once() {
        let (control, _dsp_rx) = EventControl::new();
        assert_eq!(control.take_stop_request(), None);

        control.post_stop_request(StopRequest::Stop);
        assert_eq!(control.take_stop_request(), Some(StopRequest::Stop));
        assert_eq!(control.take_stop_request(), None);
    }

    #[test]
    fn test_later_stop_request_wins() {
        let (control, _dsp_rx) = EventControl::new();
        control.post_stop_request(StopRequest::Stop);
        control.post_stop_request(StopRequest::StopAndUnload);
        assert_eq!(
            control.take_stop_request(),
            Some(StopRequest::StopAndUnload)
        );
    }

    #[test]
    fn test_handle_pause_resume() {
        let (control, _dsp_rx) = EventControl::new();
        let handle = EventHandle::new(Arc::new(control));

        assert!(!handle.is_paused());
        handle.pause();
        assert!(handle.is_paused());
        handle.resume();
        assert!(!handle.is_paused());
    }

    #[test]
    fn test_fade_increment_derivation() {
        let (control, _dsp_rx) = EventControl::new();
        let handle = EventHandle::new(Arc::new(control));

        handle.fade_out(100);
        assert_eq!(handle.control.fade_incr_per_frame(), -0.01);
        handle.fade_in(100);
        assert_eq!(handle.control.fade_incr_per_frame(), 0.01);
        handle.fade_out(0);
        assert_eq!(handle.control.fade_incr_per_frame(), -1.0);
    }

    #[test]
    fn test_spatial_round_trip() {
        let (control, _dsp_rx) = EventControl::new();
        let handle = EventHandle::new(Arc::new(control));

        handle.set_position(1.0, 2.0, 3.0);
        assert_eq!(handle.position(), [1.0, 2.0, 3.0]);
        handle.set_velocity(-1.0, 0.0, 0.5);
        assert_eq!(handle.velocity(), [-1.0, 0.0, 0.5]);
        handle.set_direction(0.0, 0.0, 1.0);
        assert_eq!(handle.direction(), [0.0, 0.0, 1.0]);
        handle.set_balance(-0.5);
        assert_eq!(handle.balance(), -0.5);
    }
}
