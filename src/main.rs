//! Glint CLI: check and watch shader descriptors.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glint::descriptor::ShaderDescriptor;
use glint::monitor::{self, PollingMonitor, ReloadMonitor};
use glint::preamble::Preamble;
use glint::validate::{self, Validation};
use glint::{ShaderConfig, StageKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "glint")]
#[command(about = "Check and live-reload GLSL shader descriptors")]
struct Args {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a descriptor and validate every stage
    Check {
        descriptor: PathBuf,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Preprocessor define, NAME or NAME=INT
        #[arg(short = 'D', long = "define")]
        defines: Vec<String>,

        /// Prepend a #version directive
        #[arg(long)]
        glsl_version: Option<String>,
    },
    /// Re-check a descriptor whenever one of its files changes
    Watch {
        descriptor: PathBuf,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();
    } else {
        tracing_subscriber::fmt::init();
    }

    match args.command {
        Command::Check {
            descriptor,
            config,
            defines,
            glsl_version,
        } => {
            let config = load_config(config.as_deref())?;
            let mut preamble = Preamble::new();
            if let Some(version) = glsl_version {
                preamble.add_version(&version);
            }
            for define in &defines {
                add_define(&mut preamble, define)?;
            }
            if !check(&descriptor, &config, &preamble)? {
                bail!("{:?} has invalid stages", descriptor);
            }
            Ok(())
        }
        Command::Watch { descriptor, config } => {
            let config = load_config(config.as_deref())?;
            watch(&descriptor, &config)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ShaderConfig> {
    match path {
        Some(path) => ShaderConfig::load(path).with_context(|| format!("loading config {:?}", path)),
        None => Ok(ShaderConfig::default()),
    }
}

fn add_define(preamble: &mut Preamble, define: &str) -> Result<()> {
    match define.split_once('=') {
        Some((name, value)) => {
            let value: i32 = value
                .trim()
                .parse()
                .with_context(|| format!("define {:?} needs an integer value", name))?;
            preamble.add_define_value(name, value);
        }
        None => preamble.add_define(define),
    }
    Ok(())
}

/// Prints the descriptor and validates each stage. Returns false if any
/// stage is invalid.
fn check(path: &Path, config: &ShaderConfig, preamble: &Preamble) -> Result<bool> {
    let descriptor = ShaderDescriptor::from_file(path, config)?;

    println!("{}", path.display());
    for kind in StageKind::ALL {
        for file in descriptor.stage_files(kind) {
            println!("  {:<9}{}", kind.to_string(), file.display());
        }
    }
    for texture in descriptor.textures() {
        println!("  {:<9}{} = {}", texture.kind.to_string(), texture.name, texture.path.display());
    }
    for (name, value) in descriptor.uniforms() {
        println!("  {:<9}{} = {}", "uniform", name, value);
    }
    if !descriptor.skipped_lines().is_empty() {
        warn!("Skipped malformed lines {:?}", descriptor.skipped_lines());
    }
    if !descriptor.has_stages() {
        bail!("no shaders specified in {:?}", path);
    }

    let mut ok = true;
    for kind in StageKind::ALL {
        let files = descriptor.stage_files(kind);
        if files.is_empty() {
            continue;
        }
        let mut chunks = Vec::with_capacity(files.len());
        for file in files {
            chunks.push(fs::read_to_string(file).with_context(|| format!("reading {:?}", file))?);
        }
        match validate::validate_stage(kind, &preamble.apply(&chunks)) {
            Validation::Valid => println!("{} shader: ok", kind),
            Validation::Skipped(reason) => println!("{} shader: skipped ({})", kind, reason),
            Validation::Invalid(reason) => {
                error!("{} shader is invalid: {}", kind, reason);
                ok = false;
            }
        }
    }
    Ok(ok)
}

fn watch(path: &Path, config: &ShaderConfig) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut monitor: Box<dyn ReloadMonitor> = match monitor::from_config(config) {
        Some(monitor) => monitor,
        None => {
            warn!("Watching is off in the configuration, polling anyway");
            Box::new(PollingMonitor::with_clock(monitor::SystemClock, config.reload_interval()))
        }
    };

    let preamble = Preamble::new();
    let rebaseline = |monitor: &mut Box<dyn ReloadMonitor>| {
        if let Err(e) = check(path, config, &preamble) {
            error!("{:#}", e);
        }
        let files = match ShaderDescriptor::from_file(path, config) {
            Ok(descriptor) => descriptor.watched_files(),
            Err(_) => vec![path.to_path_buf()],
        };
        monitor.rebaseline(&files);
    };

    rebaseline(&mut monitor);
    info!("Watching {:?}, press Ctrl-C to stop", path);
    while running.load(Ordering::SeqCst) {
        if monitor.needs_reload() {
            rebaseline(&mut monitor);
        }
        thread::sleep(Duration::from_millis(100));
    }
    Ok(())
}
