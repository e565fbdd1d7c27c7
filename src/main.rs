mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ef_av::FfprobeProber;
use ef_core::config::Config;
use ef_core::{MediaProperties, Prober, SettingValue, Settings};
use ef_encoder::{Encoder, FormatRegistry, Input, ProfileRequest};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "encodeforged=debug,ef_encoder=debug,ef_av=debug,ef_core=debug".to_string()
        } else {
            "encodeforged=info,ef_encoder=info,ef_av=warn,ef_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode {
            input,
            output,
            format,
            profiles,
            set,
            dry_run,
            no_probe,
        } => {
            let request = profile_request(profiles, set);
            let job = EncodeArgs {
                input: &input,
                output,
                format: &format,
                request,
                dry_run,
                no_probe,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(encode(job, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => probe_file(&file, json, cli.config.as_deref()),
        Commands::Formats => list_formats(cli.config.as_deref()),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("encodeforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct EncodeArgs<'a> {
    input: &'a Path,
    output: PathBuf,
    format: &'a str,
    request: ProfileRequest,
    dry_run: bool,
    no_probe: bool,
}

/// Map the profile flags onto a request: inline settings, one named
/// profile, several named profiles, or the format's default.
fn profile_request(profiles: Vec<String>, set: Vec<(String, SettingValue)>) -> ProfileRequest {
    if !set.is_empty() {
        return ProfileRequest::Inline(set.into_iter().collect::<Settings>());
    }
    match profiles.len() {
        0 => ProfileRequest::Default,
        1 => profiles
            .into_iter()
            .next()
            .map_or(ProfileRequest::Default, ProfileRequest::Named),
        _ => ProfileRequest::Names(profiles),
    }
}

fn load_formats(config: &Config) -> Result<FormatRegistry> {
    for warning in config.validate(&FormatRegistry::with_builtins().names()) {
        tracing::warn!("{warning}");
    }
    Ok(FormatRegistry::from_config(config)?)
}

async fn encode(args: EncodeArgs<'_>, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let formats = load_formats(&config)?;
    let kind = formats.require(args.format)?;

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", args.input);
    }

    let input = if args.no_probe {
        Input::new(args.input, MediaProperties::default())
    } else {
        let prober = FfprobeProber::from_config(config.tools.ffprobe_path.as_deref())?;
        Input::probe(args.input, &prober)?
    };

    let encoder = Encoder::new(kind)
        .with_config(&config)
        .with_input(input)
        .with_output(args.output)
        .with_profile(args.request)
        .with_dry_run(args.dry_run);

    let report = encoder
        .execute()
        .await
        .with_context(|| format!("Encoding {} failed", args.input.display()))?;

    if args.dry_run {
        for rendered in &report.commands {
            println!("[{}] {}", rendered.profile, rendered.command);
        }
    } else {
        for file in &report.files {
            println!("{}", file.display());
        }
    }
    Ok(())
}

fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = Config::load_or_default(config_path)?;
    let prober = FfprobeProber::from_config(config.tools.ffprobe_path.as_deref())?;
    let props = prober.probe(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&props)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    if let (Some(w), Some(h)) = (props.width, props.height) {
        println!("Dimensions: {w}x{h}");
    }
    if let Some(bit_rate) = props.bit_rate {
        println!("Bit rate: {bit_rate} bit/s");
    }
    if let Some(fps) = props.frame_rate {
        println!("Frame rate: {fps:.3} fps");
    }
    if let Some(duration) = props.duration {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }
    if let Some(size) = props.size {
        println!("Size: {size} bytes");
    }
    Ok(())
}

fn list_formats(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let formats = load_formats(&config)?;

    for (name, kind) in formats.iter() {
        print!("{name}");
        if let Some(parent) = kind.parent() {
            print!(" (inherits {})", parent.name());
        }
        if let Some(ext) = kind.file_extension() {
            print!(" [.{ext}]");
        }
        println!();
        for (profile, settings) in kind.available_profiles() {
            let summary = settings
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            println!("  {profile}: {summary}");
        }
    }
    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ef_av::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p)?;
            let formats = FormatRegistry::from_config(&config)?;
            let warnings = config.validate(&FormatRegistry::with_builtins().names());
            println!("✓ Configuration is valid");
            println!("  Workspace root: {}", config.workspace.root.display());
            match config.tools.command_timeout() {
                Some(timeout) => println!("  Command timeout: {}s", timeout.as_secs()),
                None => println!("  Command timeout: none"),
            }
            println!("  Formats: {}", formats.names().join(", "));
            for warning in &warnings {
                println!("  ! {warning}");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Workspace root: {}", config.workspace.root.display());
            println!(
                "  Formats: {}",
                FormatRegistry::with_builtins().names().join(", ")
            );
        }
    }

    Ok(())
}
