//! Execution of parsed invocations.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use checksums::strong::{StrongAlgorithm, StrongHash};
use checksums::{WeakAlgorithm, WeakChecksum};
use matching::{DeltaScanner, apply_delta, wire};
use signature::{
    BlockDescriptor, SignatureConfig, SignatureMap, SignatureMapBuilder, StreamStateError,
    open_readable,
};

use crate::arguments::{BlockSize, HELP_TEXT, Input, Invocation, MapOptions, PROGRAM_NAME};
use crate::error::CliError;

/// Runs `invocation`, writing primary output to `stdout` unless redirected.
pub(crate) fn execute<Out: Write>(
    invocation: Invocation,
    stdout: &mut Out,
) -> Result<(), CliError> {
    match invocation {
        Invocation::Help => emit(None, stdout, HELP_TEXT.as_bytes()),
        Invocation::Version => {
            let banner = format!("{PROGRAM_NAME} {}\n", env!("CARGO_PKG_VERSION"));
            emit(None, stdout, banner.as_bytes())
        }
        Invocation::Signature {
            base,
            options,
            json,
            output,
        } => signature(&base, options, json, output.as_deref(), stdout),
        Invocation::Delta {
            base,
            target,
            options,
            json,
            output,
        } => delta(&base, &target, options, json, output.as_deref(), stdout),
        Invocation::Patch {
            base,
            delta,
            output,
        } => patch(&base, &delta, output.as_deref(), stdout),
    }
}

/// Builds the base map, validating sizes before the base is opened.
fn build_map(base: &Input, options: MapOptions) -> Result<SignatureMap, CliError> {
    let base_len = match (options.block_size, base) {
        (BlockSize::Auto, Input::Path(path)) => fs::metadata(path).ok().map(|meta| meta.len()),
        _ => None,
    };
    let (block_size, buffer_size) = options.sizes(base_len);
    let config = SignatureConfig::new(block_size, buffer_size)?;
    let builder = SignatureMapBuilder::new(config)
        .weak(options.weak)
        .strong(options.strong);

    let map = match base {
        Input::Stdin => builder.build(io::stdin().lock())?,
        Input::Path(path) => builder.build_path(path)?,
    };
    Ok(map)
}

#[derive(Serialize)]
struct SignatureReport<'a> {
    base_len: u64,
    block_size: usize,
    weak: WeakAlgorithm,
    strong: StrongAlgorithm,
    block_count: usize,
    bucket_count: usize,
    collision_count: usize,
    blocks: &'a [BlockDescriptor],
}

fn signature<Out: Write>(
    base: &Input,
    options: MapOptions,
    json: bool,
    output: Option<&Path>,
    stdout: &mut Out,
) -> Result<(), CliError> {
    let map = build_map(base, options)?;
    info!(
        blocks = map.block_count(),
        base_len = map.base_len(),
        "signature map ready"
    );

    let payload = if json {
        let report = SignatureReport {
            base_len: map.base_len(),
            block_size: map.block_size(),
            weak: *map.weak_algorithm(),
            strong: *map.strong_algorithm(),
            block_count: map.block_count(),
            bucket_count: map.bucket_count(),
            collision_count: map.collision_count(),
            blocks: map.blocks(),
        };
        let mut bytes = serde_json::to_vec_pretty(&report)?;
        bytes.push(b'\n');
        bytes
    } else {
        summary(&map).into_bytes()
    };
    emit(output, stdout, &payload)
}

fn summary(map: &SignatureMap) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "base length: {} bytes", map.base_len());
    let _ = writeln!(text, "block size:  {} bytes", map.block_size());
    let _ = writeln!(text, "blocks:      {}", map.block_count());
    let _ = writeln!(text, "buckets:     {}", map.bucket_count());
    let _ = writeln!(text, "collisions:  {}", map.collision_count());
    let _ = writeln!(text, "weak:        {}", map.weak_algorithm().name());
    let _ = writeln!(text, "strong:      {}", map.strong_algorithm().name());
    text
}

fn delta<Out: Write>(
    base: &Input,
    target: &Input,
    options: MapOptions,
    json: bool,
    output: Option<&Path>,
    stdout: &mut Out,
) -> Result<(), CliError> {
    let reader: Box<dyn Read> = match target {
        Input::Stdin => Box::new(io::stdin().lock()),
        Input::Path(path) => Box::new(open_readable(path)?),
    };
    let map = build_map(base, options)?;
    let script = DeltaScanner::new(Arc::new(map)).scan(reader)?;
    info!(
        ops = script.ops().len(),
        target_len = script.target_len(),
        copy_bytes = script.copy_bytes(),
        literal_bytes = script.literal_bytes(),
        "delta computed"
    );

    let payload = if json {
        let mut bytes = serde_json::to_vec_pretty(&script)?;
        bytes.push(b'\n');
        bytes
    } else {
        wire::encode_to_vec(&script)
    };
    emit(output, stdout, &payload)
}

fn patch<Out: Write>(
    base: &Input,
    delta: &Input,
    output: Option<&Path>,
    stdout: &mut Out,
) -> Result<(), CliError> {
    let Input::Path(base_path) = base else {
        return Err(StreamStateError::NotSeekable { what: "patch BASE" }.into());
    };
    let base_file = open_readable(base_path)?;
    let script = match delta {
        Input::Stdin => wire::decode(io::stdin().lock())?,
        Input::Path(path) => wire::decode(BufReader::new(open_readable(path)?))?,
    };
    info!(
        ops = script.ops().len(),
        target_len = script.target_len(),
        "delta decoded"
    );

    match output {
        Some(path) => {
            let file = File::create(path).map_err(|source| io_error(path, source))?;
            apply_delta(base_file, BufWriter::new(file), &script)
                .map_err(|source| io_error(path, source))
        }
        None => apply_delta(base_file, &mut *stdout, &script).map_err(CliError::Output),
    }
}

fn io_error(path: &Path, source: io::Error) -> CliError {
    CliError::Io {
        path: PathBuf::from(path),
        source,
    }
}

/// Writes `payload` to `output` if given, otherwise to `stdout`.
fn emit<Out: Write>(
    output: Option<&Path>,
    stdout: &mut Out,
    payload: &[u8],
) -> Result<(), CliError> {
    match output {
        Some(path) => fs::write(path, payload).map_err(|source| io_error(path, source)),
        None => stdout
            .write_all(payload)
            .and_then(|()| stdout.flush())
            .map_err(CliError::Output),
    }
}
