use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use eval_bind::evaluate;
use eval_bind::Boundary;
use eval_bind::Env;
use eval_bind::Outcome;
use parse_bind::parse;
use parse_bind::ParseMode;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

mod json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Parse and evaluate argument bindings")]
struct Cli {
  /// Log to stderr. `RUST_LOG` overrides the default `warn` filter.
  #[arg(long, global = true)]
  trace: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Parse a binding and describe its imports, parameters and options as JSON.
  Parse {
    source: String,

    #[arg(long, value_enum, default_value_t = ModeArg::Statement)]
    mode: ModeArg,
  },
  /// Evaluate a binding against parameters given as JSON and print the result as JSON.
  Eval {
    source: String,

    #[arg(long, value_enum, default_value_t = ModeArg::Expression)]
    mode: ModeArg,

    /// A parameter, as `name=json`. May be repeated.
    #[arg(long = "param", value_name = "NAME=JSON", value_parser = parse_param)]
    params: Vec<(String, serde_json::Value)>,

    #[arg(long, value_enum, default_value_t = BoundaryArg::Throw)]
    boundary: BoundaryArg,
  },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
  Statement,
  Expression,
  Embedded,
  Template,
}

impl From<ModeArg> for ParseMode {
  fn from(mode: ModeArg) -> ParseMode {
    match mode {
      ModeArg::Statement => ParseMode::Statement,
      ModeArg::Expression => ParseMode::Expression,
      ModeArg::Embedded => ParseMode::Embedded,
      ModeArg::Template => ParseMode::Template,
    }
  }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BoundaryArg {
  Throw,
  Data,
}

fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
  let (name, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected NAME=JSON, found `{raw}`"))?;
  let value = serde_json::from_str(value).map_err(|err| format!("invalid JSON for `{name}`: {err}"))?;
  Ok((name.to_string(), value))
}

fn init_tracing(enable: bool) {
  if !enable && std::env::var_os("RUST_LOG").is_none() {
    return;
  }
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  let builder = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);
  if let Err(err) = builder.try_init() {
    eprintln!("failed to install tracing subscriber: {err}");
  }
}

fn print_error(err: impl std::fmt::Display) -> ExitCode {
  eprintln!("error: {err}");
  ExitCode::from(1)
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.trace);

  match cli.command {
    Command::Parse { source, mode } => {
      let parsed = match parse(&source, mode.into()) {
        Ok(parsed) => parsed,
        Err(err) => return print_error(err.render(&source)),
      };
      println!("{}", json::describe(&parsed.binding, parsed.end));
      ExitCode::SUCCESS
    }
    Command::Eval {
      source,
      mode,
      params,
      boundary,
    } => {
      let parsed = match parse(&source, mode.into()) {
        Ok(parsed) => parsed,
        Err(err) => return print_error(err.render(&source)),
      };
      let binding = Arc::new(parsed.binding);
      let env = Env::new().with_params(params.into_iter().map(|(k, v)| (k, json::to_value(v))));
      let boundary = match boundary {
        BoundaryArg::Throw => Boundary::Throw,
        BoundaryArg::Data => Boundary::Data,
      };
      let outcome = match evaluate(&binding, &env, boundary) {
        Ok(outcome) => outcome,
        Err(err) => return print_error(err),
      };
      if let Outcome::Absent(nano) = &outcome {
        debug!(%nano, "no value");
      };
      match json::from_value(&outcome.into_value()) {
        Ok(value) => {
          println!("{value}");
          ExitCode::SUCCESS
        }
        Err(err) => print_error(err),
      }
    }
  }
}
