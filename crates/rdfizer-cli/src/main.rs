use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "vcf-rdfizer",
    about = "Convert VCF files to RDF and compress the results",
    after_help = "Examples:\n  \
        vcf-rdfizer -m full -i ./vcf_files -r ./rules/default_rules.ttl\n  \
        vcf-rdfizer -m compress -q ./out/sample/sample.nt -c gzip,brotli\n  \
        vcf-rdfizer -m decompress -C ./out/sample/sample.nt.gz"
)]
pub struct Cli {
    /// Run mode.
    #[arg(short, long, value_enum, default_value_t = Mode::Full)]
    pub mode: Mode,
    /// VCF file or directory (full mode).
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// RDF file (.nt or .nq) to compress.
    #[arg(short = 'q', long = "nq", visible_aliases = ["nt", "rdf"])]
    pub rdf: Option<PathBuf>,
    /// Compressed RDF (.gz, .br or .hdt) to decompress.
    #[arg(short = 'C', long)]
    pub compressed_input: Option<PathBuf>,
    /// Decompressed output path (default: <out>/<name>/<name>).
    #[arg(short = 'd', long)]
    pub decompress_out: Option<PathBuf>,
    /// Mapping rules template (.ttl).
    #[arg(short, long)]
    pub rules: Option<PathBuf>,
    /// RDF output directory.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// TSV intermediate directory.
    #[arg(short, long)]
    pub tsv: Option<PathBuf>,
    /// Metrics directory.
    #[arg(short = 'M', long)]
    pub metrics: Option<PathBuf>,
    /// Image repository, or a full reference with tag.
    #[arg(short = 'I', long)]
    pub image: Option<String>,
    /// Image tag. Defaults to `latest` when the image carries none.
    #[arg(short = 'v', long)]
    pub image_version: Option<String>,
    /// Force an image build.
    #[arg(short, long)]
    pub build: bool,
    /// Fail when the image is missing.
    #[arg(short = 'B', long)]
    pub no_build: bool,
    /// Compression methods: gzip,brotli,hdt or none.
    #[arg(short, long)]
    pub compression: Option<String>,
    /// Keep TSV intermediates and rendered rules.
    #[arg(short, long)]
    pub keep_tsv: bool,
    /// Keep raw RDF after compression in full mode.
    #[arg(short = 'R', long)]
    pub keep_rdf: bool,
    /// Print a rough storage estimate before converting.
    #[arg(short, long)]
    pub estimate_size: bool,
    /// YAML file with default settings; flags take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Full,
    Compress,
    Decompress,
}

impl Mode {
    pub fn total_steps(self) -> u8 {
        match self {
            Mode::Full => 5,
            Mode::Compress | Mode::Decompress => 3,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let info = err.info();
            error!(code = %info.code, "{}", info.message);
            for (key, value) in &info.context {
                error!("  {key}: {value}");
            }
            if let Some(hint) = &info.hint {
                error!("  hint: {hint}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}
