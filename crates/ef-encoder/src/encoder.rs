//! The encoding run: validate, prepare, process each profile, finish.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ef_av::{ShellCommand, Workspace};
use ef_core::config::Config;
use ef_core::{Error, JobId, Result};
use tracing::Instrument;

use crate::input::Input;
use crate::job::Job;
use crate::kind::EncoderKind;
use crate::output::Output;
use crate::profile::Profile;
use crate::profiles::{ProfileRequest, ProfileSet};

/// A recipe rendered for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub profile: String,
    pub command: String,
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Delivered files; empty for a dry run.
    pub files: Vec<PathBuf>,
    /// Rendered commands in processing order.
    pub commands: Vec<RenderedCommand>,
}

/// Drives one encoding job.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use ef_av::FfprobeProber;
/// use ef_encoder::{Encoder, FormatRegistry, Input, ProfileRequest};
///
/// # async fn example() -> ef_core::Result<()> {
/// let formats = FormatRegistry::with_builtins();
/// let prober = FfprobeProber::from_config(None)?;
/// let files = Encoder::new(formats.require("mp4")?)
///     .with_input(Input::probe("movie.avi", &prober)?)
///     .with_output("/srv/media")
///     .with_profile(ProfileRequest::Names(vec!["low".into(), "high".into()]))
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Encoder {
    id: JobId,
    kind: Arc<EncoderKind>,
    input: Option<Input>,
    output: Option<Output>,
    profiles: ProfileRequest,
    workspace_root: PathBuf,
    timeout: Option<Duration>,
    dry_run: bool,
}

impl Encoder {
    pub fn new(kind: Arc<EncoderKind>) -> Self {
        Self {
            id: JobId::new(),
            kind,
            input: None,
            output: None,
            profiles: ProfileRequest::Default,
            workspace_root: std::env::temp_dir().join("encodeforged"),
            timeout: None,
            dry_run: false,
        }
    }

    /// Apply workspace and tool settings from the application config.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.workspace_root = config.workspace.root.clone();
        self.timeout = config.tools.command_timeout();
        self
    }

    pub fn with_input(mut self, input: Input) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(Output::new(output));
        self
    }

    pub fn with_profile(mut self, request: impl Into<ProfileRequest>) -> Self {
        self.profiles = request.into();
        self
    }

    /// Directory job workspaces are created in.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Upper bound for each transcoder invocation.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render and log commands without running them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> &Arc<EncoderKind> {
        &self.kind
    }

    /// Check input, output, profiles and flag handlers, in that order.
    ///
    /// # Errors
    ///
    /// The configuration error of the first check that fails.
    pub fn validate(&self) -> Result<Job> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| Error::input("No input defined"))?;
        input.validate()?;

        let output = self
            .output
            .as_ref()
            .ok_or_else(|| Error::output("No output defined"))?;
        output.validate()?;

        let source = Arc::new(input.properties().clone());
        let profiles = ProfileSet::resolve(&self.profiles, &self.kind, Some(source))?;
        profiles.validate()?;

        self.kind.flags().validate()?;

        Ok(Job::new(
            self.id,
            Arc::clone(&self.kind),
            input.clone(),
            output.clone(),
            profiles,
        ))
    }

    /// Run the job and return the paths of the delivered files.
    ///
    /// Profiles are encoded one at a time, lowest bit rate first. The first
    /// error aborts the remaining steps. The workspace is removed on every
    /// exit path.
    pub async fn run(&self) -> Result<Vec<PathBuf>> {
        self.execute().await.map(|report| report.files)
    }

    /// Run the job like [`run`](Self::run) and also report every command
    /// rendered along the way.
    ///
    /// In a dry run the commands are rendered after the kind's
    /// `should_process` and `preprocess` hooks, exactly as a real run would
    /// execute them, but nothing is executed or delivered.
    pub async fn execute(&self) -> Result<RunReport> {
        let span = tracing::info_span!("encode", job = %self.id, format = %self.kind.name());
        self.run_job().instrument(span).await
    }

    async fn run_job(&self) -> Result<RunReport> {
        let job = self.validate()?;
        tracing::info!(
            "Encoding {} into {} with {} profile(s)",
            job.input(),
            job.output(),
            job.profiles().len()
        );

        let workspace = self.prepare(&job)?;
        let mut commands = Vec::new();

        let result = match self.process_all(&job, &workspace, &mut commands).await {
            Ok(()) if self.dry_run => Ok(Vec::new()),
            Ok(()) => self.kind.hooks().finish(&job, &workspace).await,
            Err(e) => Err(e),
        };

        let removal = workspace.remove();
        match (result, removal) {
            (Ok(files), Ok(())) => {
                tracing::info!("Finished job, {} file(s) delivered", files.len());
                Ok(RunReport { files, commands })
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                tracing::warn!("Failed to remove workspace after error: {cleanup}");
                Err(e)
            }
        }
    }

    fn prepare(&self, job: &Job) -> Result<Workspace> {
        if !self.dry_run {
            job.output().make_dir()?;
        }
        Workspace::create(&self.workspace_root, job.id())
    }

    async fn process_all(
        &self,
        job: &Job,
        workspace: &Workspace,
        commands: &mut Vec<RenderedCommand>,
    ) -> Result<()> {
        let hooks = self.kind.hooks();
        for profile in job.profiles().sorted() {
            if !hooks.should_process(profile, job) {
                tracing::info!("Skipping profile {}", profile.name());
                continue;
            }
            let profile = hooks.preprocess(profile.clone(), job).await?;
            self.process(job, &profile, workspace, commands).await?;
            hooks.postprocess(&profile, job).await?;
        }
        Ok(())
    }

    async fn process(
        &self,
        job: &Job,
        profile: &Profile,
        workspace: &Workspace,
        commands: &mut Vec<RenderedCommand>,
    ) -> Result<()> {
        let command = job.render(profile, Some(workspace.path()))?;
        tracing::info!("Encoding profile {}", profile.name());
        tracing::info!("{command}");
        commands.push(RenderedCommand {
            profile: profile.name().to_string(),
            command: command.clone(),
        });

        if self.dry_run {
            tracing::info!("Dry run, not executing");
            return Ok(());
        }

        let mut shell = ShellCommand::new(command.as_str());
        shell.timeout(self.timeout);
        let output = shell.output().await?;

        self.kind.hooks().handle_response(profile, &output).await?;

        if !output.success() {
            return Err(Error::processing(command, output.stderr.trim_end()));
        }
        tracing::debug!("Profile {} done", profile.name());
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::hooks::EncoderHooks;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use ef_av::ToolOutput;
    use ef_core::{settings, ConfigurationError, ErrorKind, MediaProperties, Settings};
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::path::Path;

    struct Fixture {
        root: tempfile::TempDir,
        input: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let input = root.path().join("movie.avi");
            std::fs::write(&input, b"frames").unwrap();
            Self { root, input }
        }

        fn input(&self) -> Input {
            Input::new(
                &self.input,
                MediaProperties {
                    width: Some(720),
                    height: Some(480),
                    bit_rate: Some(1_000_000),
                    ..Default::default()
                },
            )
        }

        fn out(&self) -> PathBuf {
            self.root.path().join("out")
        }

        fn tmp(&self) -> PathBuf {
            self.root.path().join("tmp")
        }

        fn encoder(&self, kind: EncoderKind) -> Encoder {
            Encoder::new(Arc::new(kind))
                .with_input(self.input())
                .with_output(self.out())
                .with_workspace_root(self.tmp())
        }
    }

    fn copy_kind() -> EncoderKind {
        EncoderKind::builder("copy")
            .recipe("cp %{input} %{output}")
            .file_extension("bin")
            .preset("default", settings! { "video_bit_rate" => 1 })
            .build()
    }

    fn workspace_is_gone(tmp: &Path) -> bool {
        !tmp.exists() || std::fs::read_dir(tmp).unwrap().next().is_none()
    }

    fn two_profiles() -> BTreeMap<String, Settings> {
        let mut many = BTreeMap::new();
        many.insert("high".to_string(), settings! { "video_bit_rate" => 800000 });
        many.insert("low".to_string(), settings! { "video_bit_rate" => 110000 });
        many
    }

    #[tokio::test]
    async fn validate_requires_input() {
        let err = Encoder::new(Arc::new(copy_kind()))
            .with_output("/tmp/out")
            .validate()
            .unwrap_err();
        assert_matches!(err, Error::Configuration(ConfigurationError::Input(msg)) => {
            assert_eq!(msg, "No input defined");
        });
    }

    #[tokio::test]
    async fn validate_requires_output() {
        let fx = Fixture::new();
        let err = Encoder::new(Arc::new(copy_kind()))
            .with_input(fx.input())
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Output);
        assert_eq!(err.to_string(), "No output defined");
    }

    #[tokio::test]
    async fn validate_rejects_unknown_profile() {
        let fx = Fixture::new();
        let err = fx
            .encoder(copy_kind())
            .with_profile("ultra")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Profile \"ultra\" is undefined");
    }

    #[tokio::test]
    async fn run_delivers_file() {
        let fx = Fixture::new();
        let files = fx.encoder(copy_kind()).run().await.unwrap();
        assert_eq!(files, vec![fx.out().join("movie.bin")]);
        assert_eq!(std::fs::read(fx.out().join("movie.bin")).unwrap(), b"frames");
        assert!(workspace_is_gone(&fx.tmp()));
    }

    #[tokio::test]
    async fn missing_recipe_is_a_recipe_error() {
        let fx = Fixture::new();
        let kind = EncoderKind::builder("norecipe")
            .file_extension("bin")
            .preset("default", settings! { "video_bit_rate" => 1 })
            .build();
        let err = fx.encoder(kind).run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Recipe);
        assert!(workspace_is_gone(&fx.tmp()));
    }

    #[tokio::test]
    async fn failing_command_is_a_processing_error() {
        let fx = Fixture::new();
        let kind = EncoderKind::builder("broken")
            .recipe("echo bad codec >&2; exit 1")
            .file_extension("bin")
            .preset("default", settings! { "video_bit_rate" => 1 })
            .build();
        let err = fx.encoder(kind).run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);
        assert_eq!(err.to_string(), "Execution failed:\nbad codec");
        assert!(workspace_is_gone(&fx.tmp()));
        assert!(!fx.out().join("movie.bin").exists());
    }

    #[tokio::test]
    async fn dry_run_executes_nothing() {
        let fx = Fixture::new();
        let files = fx.encoder(copy_kind()).with_dry_run(true).run().await.unwrap();
        assert!(files.is_empty());
        assert!(workspace_is_gone(&fx.tmp()));
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EncoderHooks for Recorder {
        fn should_process(&self, profile: &Profile, _job: &Job) -> bool {
            profile.name() != "skipped"
        }

        async fn preprocess(&self, profile: Profile, _job: &Job) -> Result<Profile> {
            self.calls.lock().push(format!("pre:{}", profile.name()));
            Ok(profile)
        }

        async fn handle_response(&self, profile: &Profile, output: &ToolOutput) -> Result<()> {
            self.calls
                .lock()
                .push(format!("response:{}:{}", profile.name(), output.stdout.trim()));
            Ok(())
        }

        async fn postprocess(&self, profile: &Profile, _job: &Job) -> Result<()> {
            self.calls.lock().push(format!("post:{}", profile.name()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn profiles_run_lowest_bit_rate_first() {
        let fx = Fixture::new();
        let recorder = Arc::new(Recorder::default());
        let kind = EncoderKind::builder("echo")
            .recipe("echo %{video_bit_rate}")
            .file_extension("txt")
            .hooks(recorder.clone())
            .build();

        let mut many = two_profiles();
        many.insert("skipped".to_string(), settings! { "video_bit_rate" => 1 });

        fx.encoder(kind).with_profile(many).run().await.unwrap();

        assert_eq!(
            *recorder.calls.lock(),
            vec![
                "pre:low",
                "response:low:110000",
                "post:low",
                "pre:high",
                "response:high:800000",
                "post:high",
            ]
        );
    }

    #[tokio::test]
    async fn bit_rate_downgraded_to_input() {
        let fx = Fixture::new();
        let kind = EncoderKind::builder("echo")
            .recipe("echo %{video_bit_rate} > %{output}")
            .file_extension("txt")
            .build();
        let files = fx
            .encoder(kind)
            .with_profile(settings! { "video_bit_rate" => 5_000_000 })
            .run()
            .await
            .unwrap();
        let written = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(written.trim(), "1000000");
    }

    #[tokio::test]
    async fn dry_run_reports_preprocessed_commands() {
        let fx = Fixture::new();
        let kind = EncoderKind::builder("echo")
            .recipe("echo %{video_bit_rate} > %{output}")
            .file_extension("txt")
            .build();
        let mut many = BTreeMap::new();
        many.insert("high".to_string(), settings! { "video_bit_rate" => 5_000_000 });
        many.insert("low".to_string(), settings! { "video_bit_rate" => 110000 });

        let report = fx
            .encoder(kind)
            .with_profile(many)
            .with_dry_run(true)
            .execute()
            .await
            .unwrap();

        let names: Vec<_> = report.commands.iter().map(|c| c.profile.as_str()).collect();
        assert_eq!(names, vec!["low", "high"]);
        assert!(report.commands[0].command.starts_with("echo 110000 > "));
        assert!(report.commands[1].command.starts_with("echo 1000000 > "));
        assert!(report.commands[1].command.ends_with("movie-high.txt\""));
        assert!(report.files.is_empty());
        assert!(!fx.out().exists());
        assert!(workspace_is_gone(&fx.tmp()));
    }

    #[tokio::test]
    async fn dry_run_honors_skipped_profiles() {
        let fx = Fixture::new();
        let recorder = Arc::new(Recorder::default());
        let kind = EncoderKind::builder("echo")
            .recipe("echo %{video_bit_rate}")
            .file_extension("txt")
            .hooks(recorder.clone())
            .build();
        let mut many = two_profiles();
        many.insert("skipped".to_string(), settings! { "video_bit_rate" => 1 });

        let report = fx
            .encoder(kind)
            .with_profile(many)
            .with_dry_run(true)
            .execute()
            .await
            .unwrap();

        let names: Vec<_> = report.commands.iter().map(|c| c.profile.as_str()).collect();
        assert_eq!(names, vec!["low", "high"]);
        assert_eq!(
            *recorder.calls.lock(),
            vec!["pre:low", "post:low", "pre:high", "post:high"]
        );
    }

    #[tokio::test]
    async fn real_run_reports_commands_and_files() {
        let fx = Fixture::new();
        let report = fx.encoder(copy_kind()).execute().await.unwrap();
        assert_eq!(report.files, vec![fx.out().join("movie.bin")]);
        assert_eq!(report.commands.len(), 1);
        assert!(report.commands[0].command.starts_with("cp "));
    }

    #[tokio::test]
    async fn postprocess_skipped_after_failure() {
        let fx = Fixture::new();
        let recorder = Arc::new(Recorder::default());
        let kind = EncoderKind::builder("fail")
            .recipe("exit 2")
            .file_extension("txt")
            .hooks(recorder.clone())
            .build();

        let err = fx.encoder(kind).with_profile(two_profiles()).run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);
        assert_eq!(*recorder.calls.lock(), vec!["pre:low", "response:low:"]);
    }
}
