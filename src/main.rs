use anyhow::Result;
use clap::{Parser, ValueEnum};
use leviso_deps::{
    resolve_dependencies, ElfIntrospector, Goblin, IntrospectError, Readelf,
};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leviso-deps")]
#[command(about = "Print the on-disk paths of an ELF executable's needed libraries")]
#[command(version)]
struct Cli {
    /// Executable to analyze
    executable: PathBuf,

    /// How to read the dynamic section
    #[arg(long, value_enum, default_value_t = Backend::Readelf)]
    backend: Backend,

    /// readelf program to run (e.g. a cross-binutils readelf)
    #[arg(long, env = "LEVISO_DEPS_READELF", default_value = "readelf")]
    readelf: String,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Shell out to `readelf -d`
    Readelf,
    /// Parse the file in-process
    Goblin,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let introspector: Box<dyn ElfIntrospector> = match cli.backend {
        Backend::Readelf => Box::new(Readelf::with_program(&cli.readelf)),
        Backend::Goblin => Box::new(Goblin),
    };

    let report = resolve_dependencies(introspector.as_ref(), &cli.executable)?;

    let mut stdout = io::stdout().lock();
    for path in report.resolved() {
        writeln!(stdout, "{}", path.display())?;
    }
    for missing in report.unresolved() {
        tracing::warn!(
            "could not find {} in search paths {:?}",
            missing.name(),
            report.search_paths
        );
    }
    stdout.flush()?;

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<IntrospectError>()
                .map_or(1, IntrospectError::exit_code);
            ExitCode::from(code)
        }
    }
}
