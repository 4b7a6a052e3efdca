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
use std::{error::Error, time::Duration};

use duration_string::DurationString;
use serde::Deserialize;

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_FADE: Duration = Duration::from_millis(50);

/// A YAML representation of the playback engine configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Playback {
    /// Engine sample rate in Hz (default: 44100). Audio files loaded for
    /// freeform events are converted to this rate.
    sample_rate: Option<u32>,

    /// Default fade duration for fade-in/fade-out requests that don't
    /// specify one, e.g. "50ms".
    default_fade: Option<String>,
}

impl Playback {
    /// Creates a playback configuration with all defaults.
    pub fn new() -> Playback {
        Playback::default()
    }

    /// Returns the engine sample rate (default: 44100).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the default fade duration (default: 50ms).
    pub fn default_fade(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.default_fade {
            Some(fade) => Ok(DurationString::from_string(fade.clone())?.into()),
            None => Ok(DEFAULT_FADE),
        }
    }

    /// Returns the default fade length in frames at the engine sample rate.
    pub fn default_fade_frames(&self) -> Result<u64, Box<dyn Error>> {
        let fade = self.default_fade()?;
        Ok((fade.as_secs_f64() * self.sample_rate() as f64).round() as u64)
    }
}

/// Parses a playback configuration from a YAML string.
pub fn parse_playback(contents: &str) -> Result<Playback, Box<dyn Error>> {
    Ok(serde_yml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Playback::new();
        assert_eq!(config.sample_rate(), 44100);
        assert_eq!(
            config.default_fade().expect("default fade"),
            Duration::from_millis(50)
        );
        assert_eq!(config.default_fade_frames().expect("fade frames"), 2205);
    }

    #[test]
    fn test_parse_yaml() {
        let config = parse_playback(
            r#"
sample_rate: 48000
default_fade: 100ms
"#,
        )
        .expect("config should parse");

        assert_eq!(config.sample_rate(), 48000);
        assert_eq!(
            config.default_fade().expect("fade"),
            Duration::from_millis(100)
        );
        assert_eq!(config.default_fade_frames().expect("fade frames"), 4800);
    }

    #[test]
    fn test_parse_empty_yaml() {
        let config = parse_playback("{}").expect("empty config should parse");
        assert_eq!(config.sample_rate(), 44100);
    }

    #[test]
    fn test_bad_fade_duration() {
        let config = parse_playback("default_fade: not-a-duration").expect("parses as string");
        assert!(config.default_fade().is_err());
    }
}
