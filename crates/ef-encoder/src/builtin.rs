//! Encoder kinds shipped with encodeforged.
//!
//! `ffmpeg` is the base kind: a generic ffmpeg recipe and handlers for the
//! common settings. `mp4` (H.264/AAC) and `webm` (VP9/Opus) inherit from it
//! and add a file extension and `low`/`high`/`default` presets.

use std::sync::Arc;

use ef_core::{settings, SettingValue, Settings};

use crate::flags::FlagHandler;
use crate::kind::EncoderKind;

/// Rounding modulus for encoded dimensions. Codecs compress best on
/// multiples of 16.
pub const DIMENSION_MODULUS: u32 = 16;

pub const FFMPEG_RECIPE: &str = "ffmpeg -i %{input} %{video_codec} %{video_bit_rate} %{dimensions} \
%{frame_rate} %{audio_codec} %{audio_bit_rate} %{audio_sample_rate} %{audio_channels} \
%{extra_flags} -threads 0 -y %{output}";

/// The base ffmpeg kind.
pub fn ffmpeg() -> EncoderKind {
    EncoderKind::builder("ffmpeg")
        .recipe(FFMPEG_RECIPE)
        .flag("video_codec", FlagHandler::template("-c:v {value}"))
        .flag("video_bit_rate", FlagHandler::template("-b:v {value}"))
        .flag("audio_codec", FlagHandler::template("-c:a {value}"))
        .flag("audio_bit_rate", FlagHandler::template("-b:a {value}"))
        .flag("audio_sample_rate", FlagHandler::template("-ar {value}"))
        .flag("audio_channels", FlagHandler::template("-ac {value}"))
        .flag(
            "dimensions",
            FlagHandler::new(|_, scope| {
                format!("-s {}", scope.profile.dimensions(DIMENSION_MODULUS))
            }),
        )
        .flag(
            "frame_rate",
            FlagHandler::new(|value, scope| {
                // A list of acceptable rates picks the one fitting the input.
                let rate = match value {
                    SettingValue::Text(list) if list.contains(',') => {
                        let candidates: Vec<f64> = list
                            .split(',')
                            .filter_map(|r| r.trim().parse().ok())
                            .collect();
                        match scope.input.and_then(|i| i.matching_frame_rate(&candidates)) {
                            Some(rate) => rate.to_string(),
                            None => return String::new(),
                        }
                    }
                    other => other.to_string(),
                };
                format!("-r {rate}")
            }),
        )
        .build()
}

fn av_presets(
    video_codec: &str,
    audio_codec: &str,
    low: (i64, i64),
    high: (i64, i64),
) -> [(&'static str, Settings); 3] {
    let preset = |(video, audio): (i64, i64), dimensions: &str| {
        settings! {
            "video_codec" => video_codec,
            "audio_codec" => audio_codec,
            "video_bit_rate" => video,
            "audio_bit_rate" => audio,
            "dimensions" => dimensions,
        }
    };
    let high = preset(high, "1280x720");
    [
        ("low", preset(low, "640x360")),
        ("default", high.clone()),
        ("high", high),
    ]
}

/// H.264/AAC in an MP4 container.
pub fn mp4(parent: Arc<EncoderKind>) -> EncoderKind {
    let mut builder = EncoderKind::builder("mp4")
        .parent(parent)
        .file_extension("mp4")
        .flag("extra_flags", FlagHandler::template("{value}"));
    let presets = av_presets("libx264", "aac", (600_000, 96_000), (2_500_000, 128_000));
    for (name, mut settings) in presets {
        settings.insert("extra_flags".into(), "-movflags +faststart".into());
        builder = builder.preset(name, settings);
    }
    builder.build()
}

/// VP9/Opus in a WebM container.
pub fn webm(parent: Arc<EncoderKind>) -> EncoderKind {
    let mut builder = EncoderKind::builder("webm")
        .parent(parent)
        .file_extension("webm");
    let presets = av_presets("libvpx-vp9", "libopus", (500_000, 64_000), (2_000_000, 128_000));
    for (name, settings) in presets {
        builder = builder.preset(name, settings);
    }
    builder.build()
}
