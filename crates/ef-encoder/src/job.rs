//! A validated encoding job.

use std::path::Path;
use std::sync::Arc;

use ef_core::{Error, JobId, Result};

use crate::flags::{FlagRenderer, FlagScope};
use crate::input::Input;
use crate::kind::EncoderKind;
use crate::output::Output;
use crate::profile::Profile;
use crate::profiles::ProfileSet;

/// Everything one run needs, checked and resolved.
///
/// Only [`Encoder::validate`](crate::Encoder::validate) builds a `Job`, so
/// holding one means input, output, profiles and flag handlers are usable.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    kind: Arc<EncoderKind>,
    input: Input,
    output: Output,
    profiles: ProfileSet,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        kind: Arc<EncoderKind>,
        input: Input,
        output: Output,
        profiles: ProfileSet,
    ) -> Self {
        Self {
            id,
            kind,
            input,
            output,
            profiles,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> &Arc<EncoderKind> {
        &self.kind
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    /// Render the kind's recipe for `profile`.
    ///
    /// Without a `workspace` the `%{output}` placeholder stays unresolved and
    /// is removed.
    ///
    /// # Errors
    ///
    /// A recipe error when neither the kind nor its ancestors define a recipe.
    pub fn render(&self, profile: &Profile, workspace: Option<&Path>) -> Result<String> {
        let recipe = self.kind.recipe().ok_or_else(|| {
            Error::recipe("Please define an encoding recipe inside your encoder class")
        })?;

        let mut scope = FlagScope::new(profile)
            .input(&self.input)
            .output(&self.output);
        if let Some(workspace) = workspace {
            scope = scope.workspace(workspace);
        }
        Ok(FlagRenderer::new(self.kind.flags(), scope).render(recipe))
    }
}
