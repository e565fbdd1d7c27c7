use clap::{Parser, Subcommand};
use ef_core::SettingValue;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "encodeforged")]
#[command(author, version, about = "Profile-driven media transcoding")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a media file with one or more profiles
    Encode {
        /// Input file to encode
        #[arg(required = true)]
        input: PathBuf,

        /// Output file or directory
        #[arg(short, long)]
        output: PathBuf,

        /// Format (encoder kind) to encode with
        #[arg(short, long, default_value = "mp4")]
        format: String,

        /// Profile to encode; repeat for several profiles
        #[arg(short, long = "profile", conflicts_with = "set")]
        profiles: Vec<String>,

        /// Inline profile setting as key=value; repeat for several settings
        #[arg(short, long, value_parser = parse_setting)]
        set: Vec<(String, SettingValue)>,

        /// Print the rendered commands without executing them
        #[arg(long)]
        dry_run: bool,

        /// Do not probe the input; its properties are treated as unknown
        #[arg(long)]
        no_probe: bool,
    },

    /// Probe a media file and display its properties
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available formats and their profiles
    Formats,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Parse `key=value`, typing the value as integer, float, boolean or text.
pub fn parse_setting(arg: &str) -> Result<(String, SettingValue), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {arg:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {arg:?}"));
    }

    let raw = raw.trim();
    let value = if let Ok(i) = raw.parse::<i64>() {
        SettingValue::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        SettingValue::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        SettingValue::Bool(b)
    } else {
        SettingValue::Text(raw.to_string())
    };
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_settings() {
        assert_eq!(
            parse_setting("video_bit_rate=110000").unwrap(),
            ("video_bit_rate".to_string(), SettingValue::Integer(110000))
        );
        assert_eq!(
            parse_setting("frame_rate=29.97").unwrap().1,
            SettingValue::Float(29.97)
        );
        assert_eq!(
            parse_setting("dimensions=240x160").unwrap().1,
            SettingValue::Text("240x160".into())
        );
        assert_eq!(parse_setting("two_pass=true").unwrap().1, SettingValue::Bool(true));
    }

    #[test]
    fn rejects_malformed_settings() {
        assert!(parse_setting("video_bit_rate").is_err());
        assert!(parse_setting("=5").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
