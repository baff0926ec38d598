use clap::{Parser as ClapParser, ValueEnum};
use jetpath::{JsonPath, OutputFormat, Value};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "jetpath")]
#[command(about = "Render a JSONPath template against a JSON document")]
#[command(version)]
struct Cli {
    /// The JSONPath template to render, e.g. '{range .items[*]}{.name} {end}'
    template: String,

    /// JSON input file (reads from stdin if not provided)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Yield empty output instead of an error when a key is missing
    #[arg(long)]
    allow_missing_keys: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "legacy")]
    format: FormatArg,

    /// printf-style float format, e.g. '%.2f'
    #[arg(long, default_value = "%g")]
    float_format: String,

    /// Trace parsing and execution steps to stderr
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Space-separated values (kubectl-compatible)
    Legacy,
    /// Pretty JSON array
    Json,
    /// Single-line JSON array
    Condensed,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Legacy => OutputFormat::Legacy,
            FormatArg::Json => OutputFormat::HumanJson,
            FormatArg::Condensed => OutputFormat::CondensedJson,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(io::stderr)
            .init();
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json_text = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let json: serde_json::Value = serde_json::from_str(&json_text)?;
    let data = Value::from(json);

    let mut jp = JsonPath::new("jetpath");
    jp.parse(&cli.template)?;
    jp.allow_missing_keys(cli.allow_missing_keys)
        .output_format(cli.format.into());
    jp.float_format(&cli.float_format)?;
    if cli.debug {
        jp.enable_debug();
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    jp.execute(&mut out, &data)?;
    out.flush()?;
    writeln!(out)?;
    Ok(())
}
