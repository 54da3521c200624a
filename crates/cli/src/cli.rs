//! Command-line interface definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mdocx_core::{CodeBlockStyle, ConversionOptions, ImageHandling, Orientation, ReferenceStyle};
use mdocx_worker::{ConfigError, EngineConfig};
use serde::de::DeserializeOwned;

/// Convert markdown documents to DOCX through the conversion engine.
#[derive(Parser, Debug)]
#[command(name = "mdocx")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Interpreter used to run the engine script (overrides MDOCX_ENGINE_PROGRAM).
    #[arg(long, global = true)]
    pub engine_program: Option<PathBuf>,

    /// Engine script (overrides MDOCX_ENGINE_SCRIPT).
    #[arg(long, global = true)]
    pub engine_script: Option<PathBuf>,

    /// Log format written to stderr.
    #[arg(
        long,
        env = "MDOCX_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    /// Print events and the result as JSON lines.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert one file.
    SubmitSingle(SingleArgs),

    /// Convert several files into an output directory, one after another.
    SubmitBatch(BatchArgs),

    /// Merge several files into one document.
    SubmitMerge(MergeArgs),

    /// Read JSON requests from stdin and stream events to stdout.
    Session,

    /// Print the version.
    GetVersion,
}

#[derive(Args, Debug)]
pub struct SingleArgs {
    /// Markdown file to convert.
    pub input: PathBuf,

    /// Output DOCX path.
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Markdown files to convert.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving one DOCX per input.
    #[arg(short, long)]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Markdown files to merge, in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output DOCX path.
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,
}

/// Formatting flags shared by every submit command.
#[derive(Args, Debug, Default, Clone)]
pub struct OptionArgs {
    /// Font size in points.
    #[arg(long)]
    pub font_size: Option<u32>,

    #[arg(long)]
    pub font_family: Option<String>,

    /// Line height multiplier.
    #[arg(long)]
    pub line_height: Option<f64>,

    /// Margins in centimetres.
    #[arg(long)]
    pub margin_top: Option<f64>,

    #[arg(long)]
    pub margin_bottom: Option<f64>,

    #[arg(long)]
    pub margin_left: Option<f64>,

    #[arg(long)]
    pub margin_right: Option<f64>,

    /// portrait or landscape.
    #[arg(long, value_parser = parse_keyword::<Orientation>)]
    pub orientation: Option<Orientation>,

    /// Insert a table of contents.
    #[arg(long)]
    pub generate_toc: bool,

    /// apa, mla, chicago or harvard.
    #[arg(long, value_parser = parse_keyword::<ReferenceStyle>)]
    pub reference_style: Option<ReferenceStyle>,

    /// embed or link.
    #[arg(long, value_parser = parse_keyword::<ImageHandling>)]
    pub image_handling: Option<ImageHandling>,

    /// fenced or indented.
    #[arg(long, value_parser = parse_keyword::<CodeBlockStyle>)]
    pub code_block_style: Option<CodeBlockStyle>,
}

impl From<OptionArgs> for ConversionOptions {
    fn from(args: OptionArgs) -> Self {
        ConversionOptions {
            font_size: args.font_size,
            font_family: args.font_family,
            line_height: args.line_height,
            margin_top: args.margin_top,
            margin_bottom: args.margin_bottom,
            margin_left: args.margin_left,
            margin_right: args.margin_right,
            orientation: args.orientation,
            generate_toc: args.generate_toc.then_some(true),
            reference_style: args.reference_style,
            image_handling: args.image_handling,
            code_block_style: args.code_block_style,
        }
    }
}

impl Cli {
    /// Engine config from the environment, with command-line overrides.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut config = EngineConfig::from_env()?;
        if let Some(program) = &self.engine_program {
            config.program = program.clone();
        }
        if let Some(script) = &self.engine_script {
            config.script = script.clone();
        }
        Ok(config)
    }
}

/// Parse a lowercase keyword into one of the option enums via its serde name.
fn parse_keyword<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("unsupported value '{value}'"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
