//! Integration tests running configured formats through the encoder.
//!
//! Recipes use `sh` builtins and coreutils so no media tools are required.

#![cfg(unix)]

use ef_core::config::Config;
use ef_core::{settings, ErrorKind, MediaProperties};
use ef_encoder::{Encoder, FormatRegistry, Input, ProfileRequest};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Scene {
    dir: TempDir,
    input: PathBuf,
}

impl Scene {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("movie.avi");
        fs::write(&input, b"frames").unwrap();
        Self { dir, input }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn input(&self) -> Input {
        Input::new(
            &self.input,
            MediaProperties {
                width: Some(720),
                height: Some(480),
                bit_rate: Some(1_000_000),
                frame_rate: Some(25.0),
                ..Default::default()
            },
        )
    }

    fn config(&self, formats: &str) -> Config {
        let toml = format!(
            "[workspace]\nroot = \"{}\"\n\n{formats}",
            self.path("work").display()
        );
        Config::from_toml(&toml).unwrap()
    }
}

fn workspace_is_empty(root: &Path) -> bool {
    !root.exists() || fs::read_dir(root).unwrap().next().is_none()
}

const COPY_FORMAT: &str = r#"
[formats.copy]
recipe = "cp %{input} %{output}"
file_extension = "bin"

[formats.copy.presets.low]
video_bit_rate = 110000

[formats.copy.presets.high]
video_bit_rate = 800000
"#;

#[tokio::test]
async fn configured_recipe_delivers_one_file_per_profile() {
    let scene = Scene::new();
    let config = scene.config(COPY_FORMAT);
    let formats = FormatRegistry::from_config(&config).unwrap();

    let files = Encoder::new(formats.require("copy").unwrap())
        .with_config(&config)
        .with_input(scene.input())
        .with_output(scene.path("out"))
        .with_profile(vec!["high".to_string(), "low".to_string()])
        .run()
        .await
        .unwrap();

    assert_eq!(
        files,
        vec![
            scene.path("out").join("movie-high.bin"),
            scene.path("out").join("movie-low.bin"),
        ]
    );
    assert!(workspace_is_empty(&scene.path("work")));
}

#[tokio::test]
async fn profiles_run_lowest_bit_rate_first() {
    let scene = Scene::new();
    let log = scene.path("order.log");
    let config = scene.config(&format!(
        r#"
[formats.trace]
recipe = "echo %{{tag}} >> {log} && touch %{{output}}"
file_extension = "txt"

[formats.trace.flags]
tag = "{{value}}"

[formats.trace.presets.high]
video_bit_rate = 800000
tag = "high"

[formats.trace.presets.low]
video_bit_rate = 110000
tag = "low"

[formats.trace.presets.mid]
video_bit_rate = 400000
tag = "mid"
"#,
        log = log.display()
    ));
    let formats = FormatRegistry::from_config(&config).unwrap();

    Encoder::new(formats.require("trace").unwrap())
        .with_config(&config)
        .with_input(scene.input())
        .with_output(scene.path("out"))
        .with_profile(vec!["high".to_string(), "mid".to_string(), "low".to_string()])
        .run()
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(&log).unwrap(), "low\nmid\nhigh\n");
}

#[tokio::test]
async fn child_format_inherits_recipe_and_presets() {
    let scene = Scene::new();
    let config = scene.config(&format!(
        "{COPY_FORMAT}\n[formats.archive]\nparent = \"copy\"\nfile_extension = \"arc\"\n"
    ));
    let formats = FormatRegistry::from_config(&config).unwrap();

    let files = Encoder::new(formats.require("archive").unwrap())
        .with_config(&config)
        .with_input(scene.input())
        .with_output(scene.path("out"))
        .with_profile("low")
        .run()
        .await
        .unwrap();

    assert_eq!(files, vec![scene.path("out").join("movie-low.arc")]);
}

#[tokio::test]
async fn explicit_output_file_name_is_kept() {
    let scene = Scene::new();
    let config = scene.config(COPY_FORMAT);
    let formats = FormatRegistry::from_config(&config).unwrap();

    let files = Encoder::new(formats.require("copy").unwrap())
        .with_config(&config)
        .with_input(scene.input())
        .with_output(scene.path("out/final.dat"))
        .with_profile(ProfileRequest::Inline(settings! { "video_bit_rate" => 1 }))
        .run()
        .await
        .unwrap();

    assert_eq!(files, vec![scene.path("out").join("final.dat")]);
    assert_eq!(fs::read(scene.path("out/final.dat")).unwrap(), b"frames");
}

#[tokio::test]
async fn failing_recipe_cleans_up_workspace() {
    let scene = Scene::new();
    let config = scene.config(
        r#"
[formats.broken]
recipe = "echo unsupported codec >&2; exit 1"
file_extension = "bin"

[formats.broken.presets.default]
video_bit_rate = 1
"#,
    );
    let formats = FormatRegistry::from_config(&config).unwrap();

    let err = Encoder::new(formats.require("broken").unwrap())
        .with_config(&config)
        .with_input(scene.input())
        .with_output(scene.path("out"))
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Processing);
    assert!(err.to_string().contains("unsupported codec"), "unexpected: {err}");
    assert!(workspace_is_empty(&scene.path("work")));
    assert!(!scene.path("out").join("movie.bin").exists());
}

#[tokio::test]
async fn builtin_mp4_renders_expected_command() {
    let scene = Scene::new();
    let formats = FormatRegistry::with_builtins();

    let job = Encoder::new(formats.require("mp4").unwrap())
        .with_input(scene.input())
        .with_output(scene.path("out"))
        .with_profile("low")
        .validate()
        .unwrap();
    let profile = job.profiles().get("low").unwrap();
    let command = job.render(profile, Some(Path::new("/ws"))).unwrap();

    assert!(command.starts_with(&format!("ffmpeg -i \"{}\"", scene.input.display())));
    assert!(command.contains("-c:v libx264"));
    assert!(command.ends_with("-threads 0 -y \"/ws/movie-low.mp4\""));
}
