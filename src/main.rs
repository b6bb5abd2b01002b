use clap::{Parser, Subcommand};
use ghostline::{ContainerReader, ScrubConfig, Scrubber};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ghostline", version = "0.1.0", about = "Inspect and transform .ghostline trace files")]
struct Cli {
    /// Increase log verbosity (-v, -vv); overridden by RUST_LOG if set
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show file header and summary statistics
    Info { input: PathBuf },
    /// List frames in order
    List {
        input: PathBuf,
        /// Print request/response sizes in bytes
        #[arg(short, long)]
        sizes: bool,
    },
    /// Recompute every frame's request hash and flag mismatches
    Verify { input: PathBuf },
    /// Derive a new file from frames [0, at_step] of an existing run
    Fork {
        input: PathBuf,
        at_step: u32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show what the default scrubber would redact in a frame's bytes
    ScrubPreview {
        input: PathBuf,
        frame_index: u32,
        /// Disable email redaction
        #[arg(long)]
        no_emails: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let file = std::fs::File::open(&input)?;
            let mut reader = ContainerReader::open(file)?;
            let header = reader.header();

            println!("── .ghostline file ──────────────────────────────────────");
            println!("  Path         {}", input.display());
            println!("  Format ver.  {}", header.version);
            println!("  Started at   {} ms", header.started_at);
            println!(
                "  Git SHA      {}",
                header.git_sha.map(|sha| hex::encode(sha)).unwrap_or_else(|| "—".into())
            );
            match &header.fork {
                Some(fork) => {
                    println!("  Forked from  {}", hex::encode(fork.parent_run_id));
                    println!("  Fork at step {}", fork.fork_at_step);
                }
                None => println!("  Forked from  —"),
            }
            println!("  Frames       {}", reader.frame_count());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, sizes } => {
            let file = std::fs::File::open(&input)?;
            let mut reader = ContainerReader::open(file)?;
            for (i, frame) in reader.iter().enumerate() {
                let frame = frame?;
                if sizes {
                    println!(
                        "[{i:4}] hash={}  req={}B  res={}B  latency={}ms  ts={}",
                        hex::encode(&frame.request_hash[..8]),
                        frame.request_bytes.len(),
                        frame.response_bytes.len(),
                        frame.latency_ms,
                        frame.timestamp,
                    );
                } else {
                    println!("[{i:4}] hash={}  ts={}", hex::encode(&frame.request_hash[..8]), frame.timestamp);
                }
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let file = std::fs::File::open(&input)?;
            let mut reader = ContainerReader::open(file)?;
            let mut bad = 0;
            for (i, frame) in reader.iter().enumerate() {
                let frame = frame?;
                if !frame.verify_hash() {
                    println!("[{i:4}] MISMATCH: stored hash does not match sha256(request_bytes)");
                    bad += 1;
                }
            }
            if bad == 0 {
                println!("All frames verified OK.");
            } else {
                println!("{bad} frame(s) failed verification.");
                std::process::exit(1);
            }
        }

        // ── Fork ─────────────────────────────────────────────────────────────
        Commands::Fork { input, at_step, output } => {
            let output_path = ghostline::fork_file(&input, at_step, output.as_deref())?;
            println!("Forked {} at step {} → {}", input.display(), at_step, output_path.display());
        }

        // ── ScrubPreview ─────────────────────────────────────────────────────
        Commands::ScrubPreview { input, frame_index, no_emails } => {
            let file = std::fs::File::open(&input)?;
            let mut reader = ContainerReader::open(file)?;
            let frame = reader.get_frame(frame_index)?;

            let config = ScrubConfig::builder().redact_emails(!no_emails).build();
            let scrubber = Scrubber::new(&config);

            println!("── request ──────────────────────────────────────────────");
            println!("{}", String::from_utf8_lossy(&scrubber.scrub(&frame.request_bytes)));
            println!("── response ─────────────────────────────────────────────");
            println!("{}", String::from_utf8_lossy(&scrubber.scrub(&frame.response_bytes)));
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
