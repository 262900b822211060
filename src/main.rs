use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uniclass::{
    classifier_name, compile, CodeWidth, Error, Generator, GeneratorConfig, Language, UnicodeData,
};

#[derive(Parser)]
#[command(name = "uniclass", version)]
#[command(about = "Generates branch-minimal C/C++ classifiers for Unicode general categories", long_about = None)]
struct Cli {
    /// General categories to classify, e.g. `Lu` or `Lu,Ll,Lt` for a union
    #[arg(required = true)]
    categories: Vec<String>,

    /// Path to UnicodeData.txt
    #[arg(short, long, default_value = "UnicodeData.txt")]
    unicode_data: PathBuf,

    /// Directory for the generated sources
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output language
    #[arg(short, long, value_enum, default_value_t = Language::Cpp)]
    language: Language,

    /// Do not generate classifier tests
    #[arg(long)]
    no_tests: bool,

    /// Instrument classifiers with compare/jump counters
    #[arg(short, long)]
    profiler: bool,

    /// Bit width of the classified code values
    #[arg(short, long, default_value = "32", value_parser = parse_width)]
    width: CodeWidth,

    /// Log filter, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_width(s: &str) -> Result<CodeWidth, String> {
    let bits = s.parse::<u32>().map_err(|e| e.to_string())?;
    CodeWidth::new(bits).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let data = UnicodeData::load(&cli.unicode_data)?;
    info!(
        path = %cli.unicode_data.display(),
        values = data.len(),
        "read unicode data"
    );

    let mut generator = Generator::new(
        cli.language,
        GeneratorConfig {
            output_dir: cli.output_dir,
            tests: !cli.no_tests,
            profiler: cli.profiler,
            width: cli.width,
        },
    );

    for categories in &cli.categories {
        let values = data.filter(categories);
        let compiled = compile(values.iter().copied(), cli.width);
        info!(
            categories = categories.as_str(),
            matching = values.len(),
            comparisons = compiled.comparisons,
            worst_case = compiled.predicate.worst_case(),
            "compiled classifier"
        );

        let name = classifier_name(categories);
        generator.generate(&name, &compiled.predicate, &values)?;
    }

    generator.finalize()?;
    Ok(())
}
