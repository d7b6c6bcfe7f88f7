use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use jackc::{CompileOptions, LookupMode, driver, logger};

#[derive(Debug, Parser)]
#[command(name = "jackc", version, about = "Compile Jack classes into VM code")]
struct Cli {
  /// A `.jack` file, or a directory whose `.jack` files are all compiled
  input: PathBuf,

  /// How references to undeclared variables are treated
  #[arg(long, value_enum, default_value_t = LookupMode::Strict)]
  lookup: LookupMode,

  /// Also write the token listing of each class as `<Name>T.xml`
  #[arg(long)]
  tokens: bool,

  /// Raise log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  logger::init(cli.verbose);
  let options = CompileOptions { lookup: cli.lookup };

  let report = match driver::compile_all(&cli.input, options, cli.tokens) {
    Ok(report) => report,
    Err(err) => {
      eprintln!("{err}");
      return ExitCode::FAILURE;
    }
  };
  for err in &report.failed {
    eprintln!("{err}");
  }

  if report.is_success() {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  }
}
