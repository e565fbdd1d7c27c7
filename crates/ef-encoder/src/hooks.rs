//! Per-kind customization points of the encoding run.

use std::path::PathBuf;

use async_trait::async_trait;
use ef_av::{ToolOutput, Workspace};
use ef_core::Result;

use crate::input::Input;
use crate::job::Job;
use crate::profile::Profile;

/// Bit rates within this factor of the input's are left untouched.
pub const BIT_RATE_TOLERANCE: f64 = 1.05;

/// Steps an encoder kind may override.
///
/// The run calls them in this order, once per profile in ascending bit rate:
/// [`should_process`](Self::should_process), [`preprocess`](Self::preprocess),
/// the command itself followed by [`handle_response`](Self::handle_response),
/// and [`postprocess`](Self::postprocess). [`finish`](Self::finish) runs
/// once after the last profile.
#[async_trait]
pub trait EncoderHooks: Send + Sync {
    /// Whether `profile` should be encoded at all.
    fn should_process(&self, _profile: &Profile, _job: &Job) -> bool {
        true
    }

    /// Adjust a profile before its command is rendered.
    ///
    /// The default lowers the video bit rate to the input's bit rate so the
    /// output is never encoded at a higher rate than its source.
    async fn preprocess(&self, profile: Profile, job: &Job) -> Result<Profile> {
        Ok(downgrade_video_bit_rate(profile, job.input()))
    }

    /// Inspect what the command printed. Called before the exit status is
    /// checked.
    async fn handle_response(&self, _profile: &Profile, _output: &ToolOutput) -> Result<()> {
        Ok(())
    }

    async fn postprocess(&self, _profile: &Profile, _job: &Job) -> Result<()> {
        Ok(())
    }

    /// Collect the encoded files. The default copies the workspace contents
    /// into the output directory.
    async fn finish(&self, job: &Job, workspace: &Workspace) -> Result<Vec<PathBuf>> {
        job.output().copy_files(workspace)
    }
}

/// Hooks with every default behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl EncoderHooks for DefaultHooks {}

/// Replace `video_bit_rate` by the input's bit rate when it exceeds it by
/// more than [`BIT_RATE_TOLERANCE`]. Unknown rates leave the profile as is.
pub fn downgrade_video_bit_rate(profile: Profile, input: &Input) -> Profile {
    let Some(input_rate) = input.bit_rate() else {
        return profile;
    };
    let Some(wanted) = profile.get("video_bit_rate").and_then(|v| v.as_f64()) else {
        return profile;
    };

    if wanted > input_rate as f64 * BIT_RATE_TOLERANCE {
        tracing::info!(
            "Lowering video bit rate of profile {} from {wanted} to input bit rate {input_rate}",
            profile.name()
        );
        profile.with_setting("video_bit_rate", input_rate)
    } else {
        profile
    }
}
