use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use eho_core::{AccessFrequency, COORDINATE_DIM, Coordinate, MemoryQuery, MemoryType};
use eho_lattice::{LatticeSigner, Signature};
use eho_pulse::{MemoryEngine, PulseConfig, PulseScheduler};

#[derive(Parser)]
#[command(name = "eho", about = "Elephant-herding memory retrieval with post-quantum signatures")]
struct Cli {
    /// TOML config file (falls back to $EHO_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query through the full retrieval pipeline
    Query {
        text: String,

        #[arg(long)]
        identity: Option<String>,

        #[arg(long, value_enum)]
        memory_type: Option<MemoryTypeArg>,

        #[arg(long, value_enum)]
        access_frequency: Option<AccessFrequencyArg>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign a coordinate and print the signature as JSON
    Sign {
        #[arg(long)]
        identity: String,

        #[command(flatten)]
        coordinate: CoordinateArgs,
    },

    /// Verify a signature file against a coordinate (exit 1 when invalid)
    Verify {
        /// Signature JSON as printed by `eho sign`
        signature: PathBuf,

        // defaults to the signed snapshot
        #[command(flatten)]
        coordinate: CoordinateArgs,
    },

    /// Build the 4096-byte lattice digest for a coordinate
    Digest {
        #[arg(long)]
        identity: String,

        #[command(flatten)]
        coordinate: CoordinateArgs,

        /// Metadata as a JSON value
        #[arg(long, default_value = "{}")]
        metadata: String,

        /// Write raw bytes here instead of hex to stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Drive the pulse loop until Ctrl-C or the cycle limit
    Run {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Memory units to submit before the first cycle
        #[arg(long = "submit")]
        submit: Vec<String>,

        /// Identity for submitted units
        #[arg(long)]
        identity: Option<String>,
    },
}

#[derive(clap::Args)]
struct CoordinateArgs {
    /// 40 comma-separated components
    #[arg(long, conflicts_with = "splat")]
    coordinate: Option<String>,

    /// Use this value for all 40 components
    #[arg(long)]
    splat: Option<f64>,
}

impl CoordinateArgs {
    fn parse(&self) -> Result<Option<Coordinate>> {
        if let Some(v) = self.splat {
            return Ok(Some(Coordinate::splat(v)));
        }
        let Some(raw) = &self.coordinate else {
            return Ok(None);
        };
        let values = raw
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("coordinate components must be numbers")?;
        let coordinate = Coordinate::from_slice(&values)
            .with_context(|| format!("coordinate must have {COORDINATE_DIM} components"))?;
        Ok(Some(coordinate))
    }

    fn require(&self) -> Result<Coordinate> {
        match self.parse()? {
            Some(c) => Ok(c),
            None => bail!("pass --coordinate or --splat"),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MemoryTypeArg {
    Working,
    LongTerm,
    Cache,
}

impl From<MemoryTypeArg> for MemoryType {
    fn from(arg: MemoryTypeArg) -> Self {
        match arg {
            MemoryTypeArg::Working => MemoryType::Working,
            MemoryTypeArg::LongTerm => MemoryType::LongTerm,
            MemoryTypeArg::Cache => MemoryType::Cache,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AccessFrequencyArg {
    Hot,
    Warm,
    Cold,
}

impl From<AccessFrequencyArg> for AccessFrequency {
    fn from(arg: AccessFrequencyArg) -> Self {
        match arg {
            AccessFrequencyArg::Hot => AccessFrequency::Hot,
            AccessFrequencyArg::Warm => AccessFrequency::Warm,
            AccessFrequencyArg::Cold => AccessFrequency::Cold,
        }
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<PulseConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("EHO_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => PulseConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PulseConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Query {
            text,
            identity,
            memory_type,
            access_frequency,
            json,
        } => {
            let mut query = MemoryQuery::new(text.as_str());
            query.identity = identity.clone();
            query.memory_type = memory_type.map(Into::into);
            query.access_frequency = access_frequency.map(Into::into);
            cmd_query(&config, &query, *json)
        }
        Commands::Sign {
            identity,
            coordinate,
        } => cmd_sign(identity, &coordinate.require()?),
        Commands::Verify {
            signature,
            coordinate,
        } => cmd_verify(signature, coordinate.parse()?),
        Commands::Digest {
            identity,
            coordinate,
            metadata,
            out,
        } => cmd_digest(identity, &coordinate.require()?, metadata, out.as_deref()),
        Commands::Run {
            cycles,
            submit,
            identity,
        } => cmd_run(&config, *cycles, submit, identity.as_deref()).await,
    }
}

fn cmd_query(config: &PulseConfig, query: &MemoryQuery, json: bool) -> Result<()> {
    let mut engine = MemoryEngine::new(config);
    let result = engine.retrieve(query).context("retrieval failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("identity:    {}", result.payload.identity);
    println!("convergence: {:.4}", result.convergence);
    println!("verified:    {}", result.signature_verified);
    println!("latency_ms:  {:.2}", result.latency_ms);
    println!("cluster_id:  {:.6}", result.payload.cluster_id);
    let components: Vec<String> = result
        .coordinate
        .as_slice()
        .iter()
        .map(|v| format!("{v:.6}"))
        .collect();
    println!("coordinate:  [{}]", components.join(", "));
    Ok(())
}

fn cmd_sign(identity: &str, coordinate: &Coordinate) -> Result<()> {
    let signature = LatticeSigner::default()
        .sign(identity, coordinate)
        .context("signing failed")?;
    println!("{}", serde_json::to_string_pretty(&signature)?);
    Ok(())
}

fn cmd_verify(path: &Path, coordinate: Option<Coordinate>) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let signature: Signature =
        serde_json::from_str(&text).context("signature file is not valid JSON")?;
    let coordinate = coordinate.unwrap_or(signature.coordinate);

    let valid = LatticeSigner::default().verify(&signature, &coordinate);
    println!("verified: {valid}");
    if !valid {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_digest(
    identity: &str,
    coordinate: &Coordinate,
    metadata: &str,
    out: Option<&Path>,
) -> Result<()> {
    let metadata: serde_json::Value =
        serde_json::from_str(metadata).context("metadata must be valid JSON")?;
    let digest = LatticeSigner::default()
        .create_lattice_digest(identity, coordinate, &metadata)
        .context("digest failed")?;

    match out {
        Some(path) => {
            std::fs::write(path, digest.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {} bytes to {}", digest.len(), path.display());
        }
        None => println!("{}", digest.to_hex()),
    }
    Ok(())
}

async fn cmd_run(
    config: &PulseConfig,
    cycles: Option<u64>,
    submit: &[String],
    identity: Option<&str>,
) -> Result<()> {
    let scheduler = PulseScheduler::new(config);
    for text in submit {
        let mut query = MemoryQuery::new(text.as_str());
        query.identity = identity.map(str::to_string);
        scheduler.submit(query).await;
    }

    let stopper = scheduler.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current cycle");
            stopper.stop();
        }
    });

    let stats = match cycles {
        Some(n) => scheduler.run_cycles(n).await,
        None => scheduler.run().await,
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
