use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crunch_lib::cli::{
    AutoConfig, AutoTarget, BamCompressConfig, CramConfig, CramDecompressConfig,
    FastqCompressConfig, SpringConfig, SpringDecompressConfig, DEFAULT_THREADS,
};
use crunch_lib::error::PreconditionError;
use crunch_lib::integrity::{self, Algorithm};
use crunch_lib::tools::{SamtoolsProcess, SpringProcess};
use crunch_lib::{files, pipeline, CrunchError};

#[derive(Parser)]
#[command(name = "crunch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Integrity-checked compression of FASTQ and BAM files", long_about = None)]
struct Cli {
    /// Path to the spring binary
    #[arg(long, global = true, value_name = "PATH", default_value = "spring")]
    spring_binary: PathBuf,

    /// Path to the samtools binary
    #[arg(long, global = true, value_name = "PATH", default_value = "samtools")]
    samtools_binary: PathBuf,

    /// Number of threads spring may use
    #[arg(short = 't', long, global = true, default_value_t = DEFAULT_THREADS)]
    threads: usize,

    /// Reference genome for CRAM conversion
    #[arg(short = 'r', long, global = true, value_name = "FILE")]
    reference: Option<PathBuf>,

    /// Working directory for spring's temporary files
    #[arg(long, global = true, value_name = "DIR")]
    tmp_dir: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, value_enum, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress FASTQ pairs or BAM files
    #[command(subcommand)]
    Compress(CompressCommands),
    /// Decompress spring archives or CRAM files
    #[command(subcommand)]
    Decompress(DecompressCommands),
    /// Compare the checksum of a file with another file or a known checksum
    Compare(CompareArgs),
    /// Print checksums of files
    Checksum(ChecksumArgs),
    /// Compress, verify and delete the originals
    #[command(subcommand)]
    Auto(AutoCommands),
}

#[derive(Subcommand)]
enum CompressCommands {
    /// Compress a FASTQ pair into a spring archive
    Fastq(CompressFastqArgs),
    /// Convert a BAM file to CRAM
    Bam(CompressBamArgs),
}

#[derive(Subcommand)]
enum DecompressCommands {
    /// Decompress a spring archive into a FASTQ pair
    Spring(DecompressSpringArgs),
    /// Convert a CRAM file to BAM
    Cram(DecompressCramArgs),
}

#[derive(Subcommand)]
enum AutoCommands {
    /// Compress every FASTQ pair below a directory, or one explicit pair
    Fastq(AutoFastqArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum LogLevel {
    Debug,
    Info,
    Warning,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
        }
    }
}

/// Checksum algorithm
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum CliAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(algorithm: CliAlgorithm) -> Self {
        match algorithm {
            CliAlgorithm::Md5 => Algorithm::Md5,
            CliAlgorithm::Sha1 => Algorithm::Sha1,
            CliAlgorithm::Sha256 => Algorithm::Sha256,
        }
    }
}

#[derive(Args)]
struct CompressFastqArgs {
    /// First read in pair
    #[arg(short, long, value_name = "FILE")]
    first: PathBuf,

    /// Second read in pair
    #[arg(short, long, value_name = "FILE")]
    second: PathBuf,

    /// Output spring archive (derived from the first read when omitted)
    #[arg(short = 'o', long, value_name = "FILE")]
    spring_path: Option<PathBuf>,

    /// Decompress the archive and compare checksums with the originals
    #[arg(long)]
    check_integrity: bool,

    /// Write checksums of the originals next to the archive
    #[arg(long)]
    metadata_file: bool,

    #[arg(short, long, value_enum, default_value = "sha256")]
    algorithm: CliAlgorithm,

    /// Only validate and log what would happen
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct CompressBamArgs {
    /// Input BAM file
    #[arg(short, long, value_name = "FILE")]
    bam_path: PathBuf,

    /// Output CRAM file (BAM name with .cram when omitted)
    #[arg(short, long, value_name = "FILE")]
    cram_path: Option<PathBuf>,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct DecompressSpringArgs {
    /// Input spring archive
    spring_path: PathBuf,

    /// Output for the first read
    #[arg(short, long, value_name = "FILE")]
    first: Option<PathBuf>,

    /// Output for the second read
    #[arg(short, long, value_name = "FILE")]
    second: Option<PathBuf>,

    /// Expected checksum of the first read
    #[arg(long, requires = "second_checksum")]
    first_checksum: Option<String>,

    /// Expected checksum of the second read
    #[arg(long, requires = "first_checksum")]
    second_checksum: Option<String>,

    #[arg(short, long, value_enum, default_value = "sha256")]
    algorithm: CliAlgorithm,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct DecompressCramArgs {
    /// Input CRAM file
    cram_path: PathBuf,

    /// Output BAM file (CRAM name with .bam when omitted)
    #[arg(short, long, value_name = "FILE")]
    bam_path: Option<PathBuf>,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("other").required(true).args(["second", "checksum"])))]
struct CompareArgs {
    #[arg(short, long, value_name = "FILE")]
    first: PathBuf,

    #[arg(short, long, value_name = "FILE")]
    second: Option<PathBuf>,

    /// Known checksum of the first file
    #[arg(long)]
    checksum: Option<String>,

    #[arg(short, long, value_enum, default_value = "sha256")]
    algorithm: CliAlgorithm,
}

#[derive(Args)]
struct ChecksumArgs {
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value = "sha256")]
    algorithm: CliAlgorithm,

    /// Fail unless all checksums are equal
    #[arg(long)]
    compare: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("target").required(true).args(["indir", "first"])))]
struct AutoFastqArgs {
    /// Directory searched recursively for FASTQ pairs
    #[arg(long, value_name = "DIR")]
    indir: Option<PathBuf>,

    /// First read of a single pair
    #[arg(short, long, value_name = "FILE", requires = "second")]
    first: Option<PathBuf>,

    /// Second read of a single pair
    #[arg(short, long, value_name = "FILE", requires = "first")]
    second: Option<PathBuf>,

    /// Archive for a single pair (derived from the first read when omitted)
    #[arg(short = 'o', long, value_name = "FILE", requires = "first")]
    spring_path: Option<PathBuf>,

    /// Write checksums of the originals next to each archive
    #[arg(long)]
    metadata_file: bool,

    #[arg(short, long, value_enum, default_value = "sha256")]
    algorithm: CliAlgorithm,

    #[arg(long)]
    dry_run: bool,

    /// Do not ask before deleting originals
    #[arg(long)]
    yes: bool,
}

impl Cli {
    fn spring(&self) -> SpringProcess {
        SpringProcess::new(&SpringConfig {
            binary: self.spring_binary.clone(),
            threads: self.threads,
            tmp_dir: self.tmp_dir.clone(),
        })
    }

    fn samtools(&self) -> SamtoolsProcess {
        SamtoolsProcess::new(&CramConfig {
            binary: self.samtools_binary.clone(),
            reference: self.reference.clone(),
        })
    }
}

impl CompressFastqArgs {
    fn into_config(self) -> FastqCompressConfig {
        let spring_path = self
            .spring_path
            .unwrap_or_else(|| files::spring_outpath(&self.first));
        FastqCompressConfig {
            first: self.first,
            second: self.second,
            spring_path,
            check_integrity: self.check_integrity,
            metadata_file: self.metadata_file,
            algorithm: self.algorithm.into(),
            dry_run: self.dry_run,
        }
    }
}

impl CompressBamArgs {
    fn into_config(self) -> BamCompressConfig {
        BamCompressConfig {
            bam_path: self.bam_path,
            cram_path: self.cram_path,
            dry_run: self.dry_run,
        }
    }
}

impl DecompressSpringArgs {
    fn into_config(self) -> SpringDecompressConfig {
        SpringDecompressConfig {
            spring_path: self.spring_path,
            first: self.first,
            second: self.second,
            checksums: self.first_checksum.zip(self.second_checksum),
            algorithm: self.algorithm.into(),
            dry_run: self.dry_run,
        }
    }
}

impl DecompressCramArgs {
    fn into_config(self) -> CramDecompressConfig {
        CramDecompressConfig {
            cram_path: self.cram_path,
            bam_path: self.bam_path,
            dry_run: self.dry_run,
        }
    }
}

impl AutoFastqArgs {
    fn into_config(self) -> AutoConfig {
        let target = match (self.indir, self.first, self.second) {
            (Some(dir), _, _) => AutoTarget::Directory(dir),
            (None, Some(first), Some(second)) => AutoTarget::Pair {
                spring_path: self
                    .spring_path
                    .unwrap_or_else(|| files::spring_outpath(&first)),
                first,
                second,
            },
            (None, _, _) => unreachable!("clap requires --indir or both mates"),
        };
        AutoConfig {
            target,
            algorithm: self.algorithm.into(),
            metadata_file: self.metadata_file,
            dry_run: self.dry_run,
        }
    }
}

fn init_tracing(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter())),
        )
        .init();
}

fn require_input(path: &Path) -> Result<()> {
    if !path.is_file() {
        let missing = PreconditionError::InputMissing(path.to_path_buf());
        return Err(CrunchError::from(missing).into());
    }
    Ok(())
}

/// Ask on stderr, read the answer from stdin. End of input declines.
fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn run(cli: Cli) -> Result<()> {
    let spring = cli.spring();
    let samtools = cli.samtools();

    match cli.command {
        Commands::Compress(CompressCommands::Fastq(args)) => {
            let report = pipeline::compress_fastq(&spring, &args.into_config())?;
            if !report.dry_run {
                info!(
                    "Created {} (verified: {}, spring time: {})",
                    report.archive.display(),
                    report.verified,
                    report.elapsed
                );
            }
        }
        Commands::Compress(CompressCommands::Bam(args)) => {
            let cram = pipeline::compress_bam(&samtools, &args.into_config())?;
            info!("CRAM file {}", cram.display());
        }
        Commands::Decompress(DecompressCommands::Spring(args)) => {
            let (first, second) = pipeline::decompress_spring(&spring, &args.into_config())?;
            info!("FASTQ files {} and {}", first.display(), second.display());
        }
        Commands::Decompress(DecompressCommands::Cram(args)) => {
            let bam = pipeline::decompress_cram(&samtools, &args.into_config())?;
            info!("BAM file {}", bam.display());
        }
        Commands::Compare(args) => {
            let algorithm = Algorithm::from(args.algorithm);
            require_input(&args.first)?;
            let first = integrity::digest(&args.first, algorithm)?;
            let other = match (&args.second, args.checksum) {
                (Some(second), _) => {
                    require_input(second)?;
                    integrity::digest(second, algorithm)?
                }
                (None, Some(checksum)) => checksum.to_ascii_lowercase(),
                (None, None) => bail!("Provide a second file or a checksum"),
            };
            if !integrity::compare(&[&first, &other]) {
                return Err(CrunchError::Verification {
                    path: args.first,
                    expected: other,
                    actual: first,
                }
                .into());
            }
            info!("Checksums are the same");
        }
        Commands::Checksum(args) => {
            let algorithm = Algorithm::from(args.algorithm);
            let mut records = Vec::with_capacity(args.files.len());
            for path in &args.files {
                require_input(path)?;
                let record = integrity::checksum_record(path, algorithm)
                    .with_context(|| format!("Could not checksum {}", path.display()))?;
                println!("{}", record.checksum);
                records.push(record);
            }
            if args.compare {
                let checksums: Vec<&str> = records.iter().map(|r| r.checksum.as_str()).collect();
                if !integrity::compare(&checksums) {
                    bail!("Checksums differ");
                }
                info!("All checksums are the same");
            }
        }
        Commands::Auto(AutoCommands::Fastq(args)) => {
            let (yes, config) = (args.yes, args.into_config());
            if !(yes || config.dry_run) {
                let question = match &config.target {
                    AutoTarget::Directory(dir) => format!(
                        "This will recursively compress and delete fastqs in {}. Continue?",
                        dir.display()
                    ),
                    AutoTarget::Pair { first, second, .. } => format!(
                        "This will compress and delete {} and {}. Continue?",
                        first.display(),
                        second.display()
                    ),
                };
                if !confirm(&question)? {
                    bail!("Aborted by user");
                }
            }
            let summary = pipeline::auto(&spring, &config)?;
            if !summary.failed.is_empty() {
                for (archive, e) in &summary.failed {
                    warn!("{}: {}", archive.display(), e);
                }
                bail!(
                    "{} of {} pairs could not be compressed",
                    summary.failed.len(),
                    summary.total()
                );
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e.downcast_ref::<CrunchError>().map_or(1, CrunchError::exit_code);
            ExitCode::from(code)
        }
    }
}
