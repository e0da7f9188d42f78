use serde::{Deserialize, Serialize};

/// Audio container/codec identifier for a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// MPEG-4 AAC (the default profile's format id)
    Mpeg4Aac,
    /// Uncompressed 16-bit PCM in a WAV container
    PcmWav,
}

/// Encoder quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
}

/// Immutable encoding configuration applied to every recording.
///
/// Every session uses the fixed default profile (AAC id, 44.1kHz stereo,
/// high quality); callers cannot currently override it. The format id is
/// carried through to the recorder engine, which decides how to honor it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingProfile {
    /// Format identifier
    pub format: AudioFormat,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Encoder quality tier
    pub quality: Quality,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            format: AudioFormat::Mpeg4Aac,
            sample_rate: 44100,
            channels: 2,
            quality: Quality::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_aac_44100_stereo_high() {
        let profile = EncodingProfile::default();

        assert_eq!(profile.format, AudioFormat::Mpeg4Aac);
        assert_eq!(profile.sample_rate, 44100);
        assert_eq!(profile.channels, 2);
        assert_eq!(profile.quality, Quality::High);
    }
}
