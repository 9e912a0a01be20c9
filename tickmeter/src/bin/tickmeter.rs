use std::{fs::File, io::BufWriter, path::PathBuf};

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{info, Level};

use tickmeter::{
    code::utils::format_listing, invoke_timing_patch, DelayedPatches, InMemoryHost, MethodBody,
    PatchConfig,
};

/// Route scheduled invokes of a method body through the timing wrapper
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Method body as JSON
    body: PathBuf,

    /// Patch configuration as JSON, defaults target the invoke handler tick loop
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the rewritten body
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print the body listing before and after
    #[arg(long)]
    dump: bool,

    /// Keep the readiness gate closed so delayed patches are deferred
    #[arg(long)]
    not_ready: bool,

    /// More logging, repeat for trace output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match &args.config {
        Some(path) => PatchConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PatchConfig::default(),
    };

    let file = File::open(&args.body).with_context(|| format!("opening {}", args.body.display()))?;
    let mut body: MethodBody = serde_json::from_reader(file)?;
    if body.method != config.target {
        info!("Retargeting patch from {} to {}", config.target, body.method);
    }
    let config = PatchConfig {
        target: body.method.clone(),
        ..config
    };
    let target = config.target.clone();

    if args.dump {
        println!("{}", format_listing(&body));
    }

    let mut host = InMemoryHost::new();
    host.insert(body);

    let mut patches = DelayedPatches::new();
    patches.register(Box::new(invoke_timing_patch(&config)?));

    let mut reports = patches.apply_pending(&mut host);
    if !args.not_ready {
        reports.extend(patches.server_started(&mut host));
    }

    for name in patches.pending() {
        println!("{}: deferred until server start", name);
    }
    for report in &reports {
        println!(
            "{}: {} replacement(s) in {} ({:?}, installed: {})",
            report.patch, report.replacements, report.method, report.status, report.installed
        );
    }

    body = host
        .get(&target)
        .cloned()
        .ok_or_else(|| anyhow!("Host lost {}", target))?;

    if args.dump {
        println!("{}", format_listing(&body));
    }

    if let Some(out) = &args.out {
        let file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &body)?;
    }

    Ok(())
}
