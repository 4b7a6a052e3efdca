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
use super::traits::BufferPicker;
use crate::playback::RenderCursor;
use crate::project::{PlaybackMode, SoundDefinition};

/// The reference buffer-picking policy: walks the playlist in order,
/// honoring the sound's playback count and the looping modes.
///
/// Freeform events and tests use this policy directly; the randomized
/// playback modes are implemented by external policies and fall back to
/// sequential order here.
pub struct SequentialPicker;

impl BufferPicker for SequentialPicker {
    fn pick_next(&self, sound: &SoundDefinition, cursor: &mut RenderCursor, first: bool) -> bool {
        let entries = sound.entries();
        if entries.is_empty() {
            return true;
        }

        let count = sound.playback_count();
        if !first && count != 0 && cursor.buffers_played() >= count {
            return true;
        }

        let index = if first {
            0
        } else {
            let next = cursor.entry_index() + 1;
            if next < entries.len() {
                next
            } else if looping(sound.playback_mode()) {
                0
            } else {
                return true;
            }
        };

        cursor.set_entry_index(index);
        cursor.install(entries[index].clone());
        false
    }
}

fn looping(mode: PlaybackMode) -> bool {
    matches!(
        mode,
        PlaybackMode::SequentialLoop | PlaybackMode::InRandomOrderLoop
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::project::{AudioData, SampleStorage};

    fn sound(num_entries: usize, mode: PlaybackMode, count: u32) -> SoundDefinition {
        let entries = (0..num_entries)
            .map(|i| {
                Arc::new(AudioData::new(
                    SampleStorage::Owned(vec![i as i16; 4]),
                    1,
                    4,
                ))
            })
            .collect();
        SoundDefinition::new(entries, mode, count)
    }

    #[test]
    fn test_first_pick_restarts_playlist() {
        let sound = sound(3, PlaybackMode::Sequential, 0);
        let mut cursor = RenderCursor::new();
        cursor.set_entry_index(2);

        assert!(!SequentialPicker.pick_next(&sound, &mut cursor, true));
        assert_eq!(cursor.entry_index(), 0);
        assert_eq!(cursor.frame_index(), 0);
        assert!(cursor.buffer().is_some());
    }

    #[test]
    fn test_advances_in_order_and_ends() {
        let sound = sound(2, PlaybackMode::Sequential, 0);
        let mut cursor = RenderCursor::new();

        assert!(!SequentialPicker.pick_next(&sound, &mut cursor, true));
        assert_eq!(cursor.entry_index(), 0);
        assert!(!SequentialPicker.pick_next(&sound, &mut cursor, false));
        assert_eq!(cursor.entry_index(), 1);
        // Playlist exhausted.
        assert!(SequentialPicker.pick_next(&sound, &mut cursor, false));
    }

    #[test]
    fn test_playback_count_limits_total_buffers() {
        let sound = sound(3, PlaybackMode::Sequential, 1);
        let mut cursor = RenderCursor::new();

        assert!(!SequentialPicker.pick_next(&sound, &mut cursor, true));
        cursor.note_buffer_played();
        assert!(SequentialPicker.pick_next(&sound, &mut cursor, false));
    }

    #[test]
    fn test_loop_mode_wraps() {
        let sound = sound(2, PlaybackMode::SequentialLoop, 0);
        let mut cursor = RenderCursor::new();

        assert!(!SequentialPicker.pick_next(&sound, &mut cursor, true));
        assert!(!SequentialPicker.pick_next(&sound, &mut cursor, false));
        assert_eq!(cursor.entry_index(), 1);
        assert!(!SequentialPicker.pick_next(&sound, &mut cursor, false));
        assert_eq!(cursor.entry_index(), 0);
    }

    #[test]
    fn test_empty_playlist_finishes_immediately() {
        let sound = SoundDefinition::new(Vec::new(), PlaybackMode::Sequential, 1);
        let mut cursor = RenderCursor::new();
        assert!(SequentialPicker.pick_next(&sound, &mut cursor, true));
    }
}
