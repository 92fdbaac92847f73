use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use log::{LevelFilter, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use rs_chain_core::config::Config;
use rs_chain_core::io::for_each_line;
use rs_chain_core::model::generator::{ChainGenerator, Generator, SqliteGenerator};

/// Walk bound applied when neither the flag nor the configuration sets one.
const DEFAULT_MAX_STEPS: usize = 256;

#[derive(Parser, Debug)]
#[command(
    name = "rs-chain",
    version,
    about = "Word-chain text generator",
    arg_required_else_help = true
)]
struct Cli {
    /// Database path [default: $RS_CHAIN_DB, then $HOME/rs-chain.db]
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "PATH", env = "RS_CHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// TSV lexicon (`surface<TAB>feature,...`) extending the built-in one
    #[arg(long, global = true, value_name = "PATH")]
    lexicon: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register every line of a file, or of stdin
    Register(RegisterArgs),
    /// Generate a text from a trigger word
    Generate(GenerateArgs),
    /// Print the transition table
    Dump,
    /// Register this database's text log into another database
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    /// Input file, one text per line [default: stdin]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Trigger word, prompted for when missing
    trigger: Option<String>,

    /// Grammatical class of the trigger [default: configured class, 名詞]
    #[arg(short, long)]
    class: Option<String>,

    /// Seed of the random generator, for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of words of the generated text
    #[arg(long, value_name = "N")]
    max_steps: Option<usize>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Destination database
    #[arg(long, value_name = "PATH")]
    into: PathBuf,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if verbose > 0 {
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}

/// Opens a generator on `path` configured from `config`.
fn open_generator(config: &Config, path: &Path, max_steps: Option<usize>) -> Result<SqliteGenerator> {
    let mut settings = config.generator_settings()?;
    settings.set_max_steps(max_steps.or(config.max_steps).or(Some(DEFAULT_MAX_STEPS)))?;
    let tokenizer = config.tokenizer()?;

    let mut generator = ChainGenerator::with_tokenizer(tokenizer, settings);
    generator
        .open(path)
        .with_context(|| format!("could not open database [{}]", path.display()))?;
    Ok(generator)
}

fn register(config: &Config, args: RegisterArgs) -> Result<()> {
    let mut generator = open_generator(config, &config.database_path(), None)?;

    let count = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("could not open the input file [{}]", path.display()))?;
            let origin = path.display().to_string();
            for_each_line(BufReader::new(file), &origin, |line| generator.register(line))?
        }
        None => for_each_line(io::stdin().lock(), "stdin", |line| generator.register(line))?,
    };

    info!("registered {count} line(s)");
    generator.close()?;
    Ok(())
}

/// Asks for a trigger word until a non-empty one is given.
fn prompt_trigger() -> Result<String> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("Trigger word > ");
        stdout.flush()?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("could not read trigger word")?;
        if read == 0 {
            bail!("could not read trigger word: end of input");
        }

        let trigger = line.trim();
        if !trigger.is_empty() {
            return Ok(trigger.to_owned());
        }
    }
}

fn generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let mut generator = open_generator(config, &config.database_path(), args.max_steps)?;

    let trigger = match args.trigger {
        Some(trigger) => trigger,
        None => prompt_trigger()?,
    };
    let class = args
        .class
        .unwrap_or_else(|| generator.settings().default_class().to_owned());

    let text = match args.seed {
        Some(seed) => generator.generate_with_class(&trigger, &class, &mut StdRng::seed_from_u64(seed))?,
        None => generator.generate_with_class(&trigger, &class, &mut rand::rng())?,
    };
    println!("{text}");

    generator.close()?;
    Ok(())
}

fn dump(config: &Config) -> Result<()> {
    let mut generator = open_generator(config, &config.database_path(), None)?;

    let mut out = BufWriter::new(io::stdout().lock());
    generator.dump(&mut out)?;
    out.flush()?;

    generator.close()?;
    Ok(())
}

fn replay(config: &Config, args: ReplayArgs) -> Result<()> {
    let source_path = config.database_path();
    if source_path == args.into {
        bail!("cannot replay [{}] into itself", source_path.display());
    }

    let mut source = open_generator(config, &source_path, None)?;
    let mut target = open_generator(config, &args.into, None)?;

    let mut count = 0;
    source.texts(&mut |_, text| {
        count += 1;
        target.register(text)
    })?;
    info!("replayed {count} text(s) into {}", args.into.display());

    target.close()?;
    source.close()?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if cli.db.is_some() {
        config.database = cli.db;
    }
    if cli.lexicon.is_some() {
        config.lexicon = cli.lexicon;
    }

    match cli.command {
        Commands::Register(args) => register(&config, args),
        Commands::Generate(args) => generate(&config, args),
        Commands::Dump => dump(&config),
        Commands::Replay(args) => replay(&config, args),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if verbose > 0 {
                eprintln!("{err:?}");
            } else {
                eprintln!("{err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_accepts_class_and_seed() {
        let cli = Cli::try_parse_from(["rs-chain", "--db", "x.db", "generate", "犬", "--class", "名詞", "--seed", "4"])
            .unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.trigger.as_deref(), Some("犬"));
                assert_eq!(args.class.as_deref(), Some("名詞"));
                assert_eq!(args.seed, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
    }

    #[test]
    fn register_reads_stdin_without_input() {
        let cli = Cli::try_parse_from(["rs-chain", "register"]).unwrap();
        assert!(matches!(cli.command, Commands::Register(RegisterArgs { input: None })));
    }

    #[test]
    fn replay_into_the_same_database_is_refused() {
        let config = Config {
            database: Some(PathBuf::from("same.db")),
            ..Config::default()
        };
        let err = replay(&config, ReplayArgs { into: PathBuf::from("same.db") }).unwrap_err();
        assert!(err.to_string().contains("into itself"));
    }
}
