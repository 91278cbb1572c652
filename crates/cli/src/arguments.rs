//! Command-line parsing for the `blockdelta` front end.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, builder::OsStringValueParser};

use checksums::WeakAlgorithm;
use checksums::strong::StrongAlgorithm;
use signature::{DEFAULT_BLOCK_SIZE, DEFAULT_BUFFER_SIZE};

use crate::error::CliError;

/// Program name used in usage output.
pub(crate) const PROGRAM_NAME: &str = "blockdelta";

pub(crate) const HELP_TEXT: &str = concat!(
    "blockdelta ",
    env!("CARGO_PKG_VERSION"),
    "\n",
    "\n",
    "Usage: blockdelta signature [OPTIONS] BASE\n",
    "       blockdelta delta [OPTIONS] BASE TARGET\n",
    "       blockdelta patch [OPTIONS] BASE DELTA\n",
    "\n",
    "Commands:\n",
    "  signature   Build a signature map of BASE and summarise it.\n",
    "  delta       Scan TARGET against BASE and write a delta.\n",
    "  patch       Apply DELTA to BASE and write the rebuilt target.\n",
    "\n",
    "Options:\n",
    "  -h, --help             Show this help message and exit.\n",
    "  -V, --version          Output version information and exit.\n",
    "  -B, --block-size=SIZE  Bytes per block (default 2048, or 'auto').\n",
    "      --buffer-size=SIZE Read-ahead buffer size (default 4M).\n",
    "      --weak=NAME        Weak checksum: adler32 (default) or rsync.\n",
    "      --strong=NAME      Strong hash: md4, md5, sha1 (default), sha256,\n",
    "                         sha384, xxh64 or xxh3.\n",
    "      --json             Emit JSON instead of the default output.\n",
    "  -o, --output=FILE      Write output to FILE instead of standard output.\n",
    "  -v, --verbose          Increase logging verbosity (repeatable).\n",
    "\n",
    "SIZE accepts an optional K, M or G suffix (powers of 1024).\n",
    "BASE, TARGET and DELTA may be '-' for standard input, except that\n",
    "patch needs a seekable BASE. BLOCKDELTA_LOG overrides -v with a\n",
    "tracing filter such as 'blockdelta::scan=trace'.\n",
);

/// A stream operand: a path or `-` for standard input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Input {
    Stdin,
    Path(PathBuf),
}

impl Input {
    fn from_os(value: OsString) -> Self {
        if value == "-" {
            Self::Stdin
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

/// Requested block size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BlockSize {
    Fixed(usize),
    /// Derived from the base length when the base is a file.
    Auto,
}

/// Sizing and algorithm choices shared by every command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct MapOptions {
    pub(crate) block_size: BlockSize,
    pub(crate) buffer_size: Option<usize>,
    pub(crate) weak: WeakAlgorithm,
    pub(crate) strong: StrongAlgorithm,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            block_size: BlockSize::Fixed(DEFAULT_BLOCK_SIZE),
            buffer_size: None,
            weak: WeakAlgorithm::default(),
            strong: StrongAlgorithm::default(),
        }
    }
}

impl MapOptions {
    /// Resolves the block and buffer sizes for a base of `base_len` bytes.
    ///
    /// Without an explicit buffer size the default is raised to twice the
    /// block size when needed.
    pub(crate) fn sizes(&self, base_len: Option<u64>) -> (usize, usize) {
        let block_size = match (self.block_size, base_len) {
            (BlockSize::Fixed(size), _) => size,
            (BlockSize::Auto, Some(len)) => signature::suggest_block_size(len),
            (BlockSize::Auto, None) => DEFAULT_BLOCK_SIZE,
        };
        let buffer_size = self
            .buffer_size
            .unwrap_or_else(|| DEFAULT_BUFFER_SIZE.max(block_size.saturating_mul(2)));
        (block_size, buffer_size)
    }
}

/// What the user asked for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Invocation {
    Help,
    Version,
    Signature {
        base: Input,
        options: MapOptions,
        json: bool,
        output: Option<PathBuf>,
    },
    Delta {
        base: Input,
        target: Input,
        options: MapOptions,
        json: bool,
        output: Option<PathBuf>,
    },
    Patch {
        base: Input,
        delta: Input,
        output: Option<PathBuf>,
    },
}

/// Parsed command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ParsedArgs {
    pub(crate) invocation: Invocation,
    pub(crate) verbosity: u8,
}

fn map_args() -> [Arg; 4] {
    [
        Arg::new("block-size")
            .long("block-size")
            .short('B')
            .value_name("SIZE")
            .action(ArgAction::Set)
            .value_parser(OsStringValueParser::new()),
        Arg::new("buffer-size")
            .long("buffer-size")
            .value_name("SIZE")
            .action(ArgAction::Set)
            .value_parser(OsStringValueParser::new()),
        Arg::new("weak")
            .long("weak")
            .value_name("NAME")
            .action(ArgAction::Set),
        Arg::new("strong")
            .long("strong")
            .value_name("NAME")
            .action(ArgAction::Set),
    ]
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .value_name("FILE")
        .action(ArgAction::Set)
        .value_parser(OsStringValueParser::new())
}

fn json_arg() -> Arg {
    Arg::new("json").long("json").action(ArgAction::SetTrue)
}

fn operand(name: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .allow_hyphen_values(true)
        .value_parser(OsStringValueParser::new())
}

/// Builds the `clap` command used for parsing.
fn clap_command() -> Command {
    let verbose = Arg::new("verbose")
        .long("verbose")
        .short('v')
        .action(ArgAction::Count)
        .global(true);

    Command::new(PROGRAM_NAME)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .arg(Arg::new("help").long("help").short('h').action(ArgAction::SetTrue))
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .action(ArgAction::SetTrue),
        )
        .arg(verbose)
        .subcommand(
            Command::new("signature")
                .disable_help_flag(true)
                .args(map_args())
                .arg(json_arg())
                .arg(output_arg())
                .arg(operand("base")),
        )
        .subcommand(
            Command::new("delta")
                .disable_help_flag(true)
                .args(map_args())
                .arg(json_arg())
                .arg(output_arg())
                .arg(operand("base"))
                .arg(operand("target")),
        )
        .subcommand(
            Command::new("patch")
                .disable_help_flag(true)
                .arg(output_arg())
                .arg(operand("base"))
                .arg(operand("delta")),
        )
}

/// Parses command-line arguments into a [`ParsedArgs`] structure.
pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command()
        .try_get_matches_from(args)
        .map_err(|error| CliError::Usage(error.to_string()))?;

    if matches.get_flag("help") {
        return Ok(ParsedArgs {
            invocation: Invocation::Help,
            verbosity: 0,
        });
    }
    if matches.get_flag("version") {
        return Ok(ParsedArgs {
            invocation: Invocation::Version,
            verbosity: 0,
        });
    }

    let Some((name, mut sub)) = matches.remove_subcommand() else {
        return Err(CliError::Usage(format!("missing command\n\n{HELP_TEXT}")));
    };
    let verbosity = sub.get_count("verbose");

    let invocation = match name.as_str() {
        "signature" => Invocation::Signature {
            base: take_input(&mut sub, "base"),
            options: map_options(&mut sub)?,
            json: sub.get_flag("json"),
            output: take_path(&mut sub, "output"),
        },
        "delta" => Invocation::Delta {
            base: take_input(&mut sub, "base"),
            target: take_input(&mut sub, "target"),
            options: map_options(&mut sub)?,
            json: sub.get_flag("json"),
            output: take_path(&mut sub, "output"),
        },
        "patch" => Invocation::Patch {
            base: take_input(&mut sub, "base"),
            delta: take_input(&mut sub, "delta"),
            output: take_path(&mut sub, "output"),
        },
        other => return Err(CliError::Usage(format!("unknown command '{other}'"))),
    };

    if let Invocation::Delta {
        base: Input::Stdin,
        target: Input::Stdin,
        ..
    } = invocation
    {
        return Err(CliError::Usage(
            "BASE and TARGET cannot both be read from standard input".to_string(),
        ));
    }

    Ok(ParsedArgs {
        invocation,
        verbosity,
    })
}

fn take_input(matches: &mut ArgMatches, name: &str) -> Input {
    matches
        .remove_one::<OsString>(name)
        .map_or(Input::Stdin, Input::from_os)
}

fn take_path(matches: &mut ArgMatches, name: &str) -> Option<PathBuf> {
    matches.remove_one::<OsString>(name).map(PathBuf::from)
}

fn map_options(matches: &mut ArgMatches) -> Result<MapOptions, CliError> {
    let mut options = MapOptions::default();
    if let Some(value) = matches.remove_one::<OsString>("block-size") {
        options.block_size = if value == "auto" {
            BlockSize::Auto
        } else {
            BlockSize::Fixed(parse_size_argument(&value, "--block-size")?)
        };
    }
    if let Some(value) = matches.remove_one::<OsString>("buffer-size") {
        options.buffer_size = Some(parse_size_argument(&value, "--buffer-size")?);
    }
    if let Some(name) = matches.remove_one::<String>("weak") {
        options.weak = name.parse().map_err(|error| CliError::Usage(format!("{error}")))?;
    }
    if let Some(name) = matches.remove_one::<String>("strong") {
        options.strong = name.parse().map_err(|error| CliError::Usage(format!("{error}")))?;
    }
    Ok(options)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SizeParseError {
    Empty,
    Negative,
    Invalid,
    TooLarge,
}

/// Parses a size option, rendering failures with the flag name.
pub(crate) fn parse_size_argument(value: &OsStr, flag: &str) -> Result<usize, CliError> {
    let text = value.to_string_lossy();
    let trimmed = text.trim();
    let reason = match parse_size_spec(trimmed) {
        Ok(size) => return Ok(size),
        Err(SizeParseError::Empty) => "value must not be empty",
        Err(SizeParseError::Negative) => "size must be non-negative",
        Err(SizeParseError::Invalid) => "expected a size with an optional K/M/G suffix",
        Err(SizeParseError::TooLarge) => "size exceeds the supported range",
    };
    Err(CliError::InvalidValue {
        option: flag.to_string(),
        value: trimmed.to_string(),
        reason,
    })
}

/// Parses `N`, `NK`, `NM` or `NG` (case insensitive, powers of 1024).
pub(crate) fn parse_size_spec(text: &str) -> Result<usize, SizeParseError> {
    if text.is_empty() {
        return Err(SizeParseError::Empty);
    }
    if text.starts_with('-') {
        return Err(SizeParseError::Negative);
    }

    let digits_end = text
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, suffix) = text.split_at(digits_end);
    if digits.is_empty() {
        return Err(SizeParseError::Invalid);
    }

    let shift = match suffix {
        "" | "b" | "B" => 0,
        "k" | "K" | "kb" | "KB" | "KiB" => 10,
        "m" | "M" | "mb" | "MB" | "MiB" => 20,
        "g" | "G" | "gb" | "GB" | "GiB" => 30,
        _ => return Err(SizeParseError::Invalid),
    };

    let base: usize = digits.parse().map_err(|_| SizeParseError::TooLarge)?;
    base.checked_mul(1usize << shift)
        .ok_or(SizeParseError::TooLarge)
}
