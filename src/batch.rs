//! Batch Runner: convert many files, isolating each item's failure.
//!
//! ## Ordering
//!
//! Items run concurrently through `buffer_unordered`, so they finish in
//! arbitrary order. Each carries its input index and the collected entries
//! are sorted by it, so `BatchResult::entries[i]` always describes
//! `inputs[i]`.
//!
//! ## Isolation
//!
//! A failed item is recorded and the batch moves on. A converter that panics
//! is caught and recorded as `ConversionFailed`; it never takes the batch
//! (or the caller's thread) down with it. The only batch-wide failure is an
//! output directory that cannot be created, which marks every item `IoWrite`.
//!
//! ## Output names
//!
//! Every item writes `output_dir/<stem>.<format>`. Two inputs that share a
//! stem (`a.png`, `a.bmp`) would write the same file, so only the first claims
//! it; later ones fail with `InvalidArguments` before any conversion runs.

use crate::config::BatchConfig;
use crate::convert::{ConversionRequest, Converter};
use crate::error::{ConvertError, ItemFailure};
use crate::format::normalize_token;
use crate::output::{BatchEntry, BatchResult, ConversionOutcome, ConversionResult};
use crate::paths::{ensure_dir, file_stem};
use crate::profile::ConversionOptions;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::{debug, info, warn};

/// Convert every file in `inputs` to `output_dir/<stem>.<output_format>`.
///
/// Never fails as a whole; see [`BatchResult`] for per-item outcomes.
///
/// # Example
/// ```rust,no_run
/// use file_converter::{batch_convert, BatchConfig, ConversionOptions, ImageConverter};
/// use std::path::{Path, PathBuf};
/// use std::sync::Arc;
///
/// # async fn run() {
/// let inputs = vec![PathBuf::from("a.png"), PathBuf::from("b.bmp")];
/// let result = batch_convert(
///     Arc::new(ImageConverter::new()),
///     &inputs,
///     Path::new("out"),
///     "jpg",
///     &ConversionOptions::new(),
///     &BatchConfig::default(),
/// )
/// .await;
/// println!("{}/{} converted", result.stats.succeeded, result.stats.total);
/// # }
/// ```
pub async fn batch_convert(
    converter: Arc<dyn Converter>,
    inputs: &[PathBuf],
    output_dir: &Path,
    output_format: &str,
    options: &ConversionOptions,
    config: &BatchConfig,
) -> BatchResult {
    let start = Instant::now();
    let total = inputs.len();
    let cb = config.progress_callback.clone();
    if let Some(cb) = &cb {
        cb.on_batch_start(total);
    }

    if let Err(e) = ensure_dir(output_dir) {
        return fail_all(inputs, &e, cb.as_ref(), start);
    }

    let planned = plan_items(inputs, output_dir, output_format, options);
    info!(
        "[{}] batch of {} → {} (concurrency {})",
        converter.kind(),
        total,
        output_dir.display(),
        config.concurrency
    );

    let mut indexed: Vec<(usize, BatchEntry)> = stream::iter(planned.into_iter().enumerate().map(
        |(index, (input_path, planned))| {
            let converter = Arc::clone(&converter);
            let cb = cb.clone();
            async move {
                if let Some(cb) = &cb {
                    cb.on_item_start(index, total, &input_path);
                }
                let result = match planned {
                    Ok(request) => {
                        let failed_path = input_path.clone();
                        tokio::task::spawn_blocking(move || run_item(converter.as_ref(), &request))
                            .await
                            .unwrap_or_else(|e| {
                                Err(ConvertError::failed(
                                    &failed_path,
                                    format!("conversion task failed: {e}"),
                                ))
                            })
                    }
                    Err(e) => Err(e),
                };
                (index, finish_item(index, total, input_path, result, cb.as_ref()))
            }
        },
    ))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    indexed.sort_by_key(|(index, _)| *index);
    let entries = indexed.into_iter().map(|(_, entry)| entry).collect();
    complete(entries, cb.as_ref(), start)
}

/// Blocking wrapper around [`batch_convert`].
///
/// With `concurrency == 1` the batch runs on the calling thread without a
/// runtime. Otherwise:
///
/// - inside a multi-thread tokio runtime, the batch runs on that runtime via
///   `block_in_place`
/// - inside a current-thread runtime, where blocking is not allowed, it runs
///   sequentially
/// - outside any runtime a temporary one is created; if that fails the batch
///   runs sequentially
///
/// So this is safe to call from async code as well as plain threads.
pub fn batch_convert_sync(
    converter: Arc<dyn Converter>,
    inputs: &[PathBuf],
    output_dir: &Path,
    output_format: &str,
    options: &ConversionOptions,
    config: &BatchConfig,
) -> BatchResult {
    if config.concurrency > 1 {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                let batch = batch_convert(
                    Arc::clone(&converter),
                    inputs,
                    output_dir,
                    output_format,
                    options,
                    config,
                );
                return tokio::task::block_in_place(|| handle.block_on(batch));
            }
            Ok(_) => debug!("Inside a current-thread runtime; running batch sequentially"),
            Err(_) => match Runtime::new() {
                Ok(rt) => {
                    return rt.block_on(batch_convert(
                        Arc::clone(&converter),
                        inputs,
                        output_dir,
                        output_format,
                        options,
                        config,
                    ))
                }
                Err(e) => warn!("Failed to create tokio runtime ({}); running sequentially", e),
            },
        }
    }
    run_sequential(converter.as_ref(), inputs, output_dir, output_format, options, config)
}

fn run_sequential(
    converter: &dyn Converter,
    inputs: &[PathBuf],
    output_dir: &Path,
    output_format: &str,
    options: &ConversionOptions,
    config: &BatchConfig,
) -> BatchResult {
    let start = Instant::now();
    let total = inputs.len();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_batch_start(total);
    }

    if let Err(e) = ensure_dir(output_dir) {
        return fail_all(inputs, &e, cb, start);
    }

    let entries = plan_items(inputs, output_dir, output_format, options)
        .into_iter()
        .enumerate()
        .map(|(index, (input_path, planned))| {
            if let Some(cb) = cb {
                cb.on_item_start(index, total, &input_path);
            }
            let result = planned.and_then(|request| run_item(converter, &request));
            finish_item(index, total, input_path, result, cb)
        })
        .collect();
    complete(entries, cb, start)
}

// ── Item helpers ─────────────────────────────────────────────────────────────

type PlannedItem = (PathBuf, Result<ConversionRequest, ConvertError>);

/// One request per input, or an `InvalidArguments` failure when an earlier
/// input already claimed the same output file.
fn plan_items(
    inputs: &[PathBuf],
    output_dir: &Path,
    output_format: &str,
    options: &ConversionOptions,
) -> Vec<PlannedItem> {
    let token = normalize_token(output_format);
    let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let output = output_dir.join(format!("{}.{}", file_stem(input), token));
            if let Some(&first) = claimed.get(&output) {
                let err = ConvertError::InvalidArguments(format!(
                    "Output '{}' for '{}' is already written by '{}'",
                    output.display(),
                    input.display(),
                    inputs[first].display()
                ));
                return (input.clone(), Err(err));
            }
            claimed.insert(output.clone(), index);
            let request = ConversionRequest {
                input_path: input.clone(),
                output_path: Some(output),
                output_format: Some(token.clone()),
                options: options.clone(),
            };
            (input.clone(), Ok(request))
        })
        .collect()
}

/// Convert one item, turning a panic into `ConversionFailed`.
fn run_item(converter: &dyn Converter, request: &ConversionRequest) -> ConversionResult {
    panic::catch_unwind(AssertUnwindSafe(|| converter.convert(request))).unwrap_or_else(|payload| {
        Err(ConvertError::failed(
            &request.input_path,
            format!("converter panicked: {}", panic_message(payload.as_ref())),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn finish_item(
    index: usize,
    total: usize,
    input_path: PathBuf,
    result: ConversionResult,
    cb: Option<&ProgressCallback>,
) -> BatchEntry {
    match &result {
        Ok(output) => {
            debug!("[{}/{}] {} → {}", index + 1, total, input_path.display(), output.display());
            if let Some(cb) = cb {
                cb.on_item_complete(index, total, output);
            }
        }
        Err(e) => {
            warn!("[{}/{}] {} failed: {}", index + 1, total, input_path.display(), e);
            if let Some(cb) = cb {
                cb.on_item_error(index, total, &e.to_string());
            }
        }
    }
    BatchEntry {
        input_path,
        outcome: ConversionOutcome::from(result),
    }
}

fn fail_all(
    inputs: &[PathBuf],
    error: &ConvertError,
    cb: Option<&ProgressCallback>,
    start: Instant,
) -> BatchResult {
    warn!("Batch aborted before any conversion: {}", error);
    let failure = ItemFailure::from(error);
    let total = inputs.len();
    let entries = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            if let Some(cb) = cb {
                cb.on_item_error(index, total, &failure.message);
            }
            BatchEntry {
                input_path: input.clone(),
                outcome: ConversionOutcome::Failure(failure.clone()),
            }
        })
        .collect();
    complete(entries, cb, start)
}

fn complete(entries: Vec<BatchEntry>, cb: Option<&ProgressCallback>, start: Instant) -> BatchResult {
    let result = BatchResult::from_entries(entries, start.elapsed().as_millis() as u64);
    if let Some(cb) = cb {
        cb.on_batch_complete(result.stats.total, result.stats.succeeded);
    }
    info!(
        "Batch complete: {}/{} succeeded in {}ms",
        result.stats.succeeded, result.stats.total, result.stats.duration_ms
    );
    result
}
