//! Engine argument encoding.
//!
//! The order is fixed so identical requests always produce byte-identical
//! argument lists:
//!
//! ```text
//! <script> --input <p> [--input <p> …] --output <p> [--merge]
//!          [--font-size N] [--font-family NAME] [--line-height F]
//!          [--margin-top F] [--margin-bottom F] [--margin-left F] [--margin-right F]
//!          [--orientation portrait|landscape] [--generate-toc]
//!          [--reference-style S] [--image-handling H] [--code-block-style C]
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use mdocx_core::ConversionOptions;

/// One engine call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Input files; exactly one unless `merge` is set.
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub merge: bool,
    pub options: ConversionOptions,
}

impl Invocation {
    pub fn single(input: PathBuf, output: PathBuf, options: ConversionOptions) -> Self {
        Self {
            inputs: vec![input],
            output,
            merge: false,
            options,
        }
    }

    pub fn merge(inputs: Vec<PathBuf>, output: PathBuf, options: ConversionOptions) -> Self {
        Self {
            inputs,
            output,
            merge: true,
            options,
        }
    }

    /// Full argument list passed to the engine program, script first.
    pub fn engine_args(&self, script: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(4 + self.inputs.len() * 2);
        args.push(script.as_os_str().to_owned());

        for input in &self.inputs {
            args.push("--input".into());
            args.push(input.as_os_str().to_owned());
        }

        args.push("--output".into());
        args.push(self.output.as_os_str().to_owned());

        if self.merge {
            args.push("--merge".into());
        }

        args.extend(option_args(&self.options).into_iter().map(OsString::from));
        args
    }
}

/// Flags for the options that are present, in encoding order.
pub fn option_args(options: &ConversionOptions) -> Vec<String> {
    let mut args = Vec::new();
    let mut push = |flag: &str, value: Option<String>| {
        if let Some(value) = value {
            args.push(flag.to_string());
            args.push(value);
        }
    };

    push("--font-size", options.font_size.map(|v| v.to_string()));
    push("--font-family", options.font_family.clone());
    push("--line-height", options.line_height.map(|v| v.to_string()));
    push("--margin-top", options.margin_top.map(|v| v.to_string()));
    push("--margin-bottom", options.margin_bottom.map(|v| v.to_string()));
    push("--margin-left", options.margin_left.map(|v| v.to_string()));
    push("--margin-right", options.margin_right.map(|v| v.to_string()));
    push("--orientation", options.orientation.map(|v| v.as_str().to_string()));

    if options.wants_toc() {
        args.push("--generate-toc".to_string());
    }

    let mut push = |flag: &str, value: Option<&str>| {
        if let Some(value) = value {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
    };
    push("--reference-style", options.reference_style.map(|v| v.as_str()));
    push("--image-handling", options.image_handling.map(|v| v.as_str()));
    push("--code-block-style", options.code_block_style.map(|v| v.as_str()));

    args
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
