//! Extraction run orchestration.
//!
//! Each document moves through `Pending → Sliced → Attempted → Persisted`.
//! Identity (the content hash) is assigned first and never recomputed.
//! A document whose slicing or generation fails still reaches `Persisted`
//! with an error-marked record; failure is data at this level.
//!
//! [`run_extract`] is the per-document supervisor. It processes inputs
//! one at a time in sorted path order, resets the summary log at the
//! start of the run, and keeps going past any document-level fault. Only
//! a failure to write an output artifact aborts the run.

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::discover::discover;
use crate::document::{content_hash, file_meta, PageSource, PagedDocument};
use crate::error::{PipelineError, SliceError};
use crate::generate::{call_with_retry, CallOutcome, Generator, OllamaGenerator, RetryPolicy};
use crate::models::{
    ContentSlice, DiagnosticLog, ExtractedRecord, IndexRow, LlmCalls, PageInfo, PersistedRecord,
    SliceInfo, SourceDocument,
};
use crate::normalize::normalize;
use crate::parse::{ResponseParser, StrictThenBraces};
use crate::progress::{RunProgressEvent, RunProgressReporter};
use crate::prompt::PromptBuilder;
use crate::slice::slice_with;
use crate::store::{OutputLayout, RunLog};

/// Lifecycle of one document within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Sliced,
    Attempted,
    Persisted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Pending => "pending",
            Stage::Sliced => "sliced",
            Stage::Attempted => "attempted",
            Stage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Process at most this many documents (after sorting).
    pub limit: Option<usize>,
    /// Slice only: no generation calls, no artifacts.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub found: usize,
    pub processed: usize,
    pub succeeded: usize,
    /// Persisted with an error marker.
    pub failed: usize,
    /// No identity could be assigned; nothing persisted.
    pub skipped: usize,
}

/// A document opened and sliced, ready for generation.
pub struct Inspection {
    pub document: SourceDocument,
    /// `Err` when the document could not be opened as a paginated document.
    pub slice: Result<ContentSlice, SliceError>,
}

/// Assign identity, read file metadata, then open and slice the document.
pub fn inspect_document(path: &Path, config: &Config) -> Result<Inspection, PipelineError> {
    let identity_err = |source| PipelineError::Identity {
        path: path.to_path_buf(),
        source,
    };
    let id = content_hash(path).map_err(identity_err)?;
    let file = file_meta(path).map_err(identity_err)?;
    tracing::debug!(id = %id, stage = %Stage::Pending, path = %path.display(), "identified");

    let (page_count, slice) = match PagedDocument::open(path) {
        Ok(doc) => {
            let slice = slice_with(&doc, &config.slicing);
            (doc.page_count(), Ok(slice))
        }
        Err(e) => (0, Err(e)),
    };

    Ok(Inspection {
        document: SourceDocument {
            id,
            file,
            page_count,
        },
        slice,
    })
}

/// Runs the per-document pipeline against a generator and output layout.
pub struct Extractor<'a> {
    config: &'a Config,
    generator: &'a dyn Generator,
    parser: &'a dyn ResponseParser,
    prompt: PromptBuilder,
    policy: RetryPolicy,
    layout: OutputLayout,
}

impl<'a> Extractor<'a> {
    pub fn new(
        config: &'a Config,
        generator: &'a dyn Generator,
        parser: &'a dyn ResponseParser,
    ) -> Result<Self> {
        Ok(Self {
            config,
            generator,
            parser,
            prompt: PromptBuilder::from_config(&config.prompt)?,
            policy: RetryPolicy::from_config(&config.generation),
            layout: OutputLayout::new(&config.output.dir),
        })
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Process one document through to its persisted artifacts.
    pub async fn process_document(&self, path: &Path) -> Result<PersistedRecord, PipelineError> {
        let inspection = inspect_document(path, self.config)?;
        let doc = inspection.document;

        let slices_info = |slice: Option<&ContentSlice>| SliceInfo {
            front_pages_default: self.config.slicing.primary_pages,
            front_pages_fallback: self.config.slicing.fallback_pages,
            front_chars: slice.map(|s| s.char_count).unwrap_or(0),
            front_window: slice.map(|s| s.window),
        };

        let (front, info, trace) = match inspection.slice {
            Ok(slice) => {
                tracing::debug!(
                    id = %doc.id,
                    stage = %Stage::Sliced,
                    window = ?slice.window,
                    chars = slice.char_count,
                    "sliced"
                );
                let prompt = self.prompt.build(&slice.text);
                let outcome =
                    call_with_retry(self.generator, self.parser, &self.policy, &prompt).await;
                if let CallOutcome::Failed { error, .. } = &outcome {
                    tracing::warn!(id = %doc.id, error = %error, "extraction failed after retries");
                }
                tracing::debug!(id = %doc.id, stage = %Stage::Attempted, "attempted");
                let trace = outcome.trace().clone();
                let front = normalize(&outcome.into_candidate());
                (front, slices_info(Some(&slice)), Some(trace))
            }
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "document could not be opened");
                (ExtractedRecord::failed(e.to_string()), slices_info(None), None)
            }
        };

        let record = PersistedRecord {
            id: doc.id.clone(),
            file: doc.file.clone(),
            pdf: PageInfo {
                page_count: doc.page_count,
            },
            slices_info: info.clone(),
            front,
        };
        let diagnostic = DiagnosticLog {
            id: doc.id.clone(),
            file: doc.file,
            slices_info: info,
            llm_calls: LlmCalls { front: trace },
        };

        self.layout
            .write_record(&record)
            .map_err(PipelineError::Persist)?;
        self.layout
            .write_diagnostic(&diagnostic)
            .map_err(PipelineError::Persist)?;
        tracing::debug!(id = %record.id, stage = %Stage::Persisted, "persisted");

        Ok(record)
    }
}

/// Discover inputs, process each one in isolation, and rebuild the summary log.
pub async fn run_extract(
    config: &Config,
    generator: &dyn Generator,
    parser: &dyn ResponseParser,
    options: &RunOptions,
    progress: &dyn RunProgressReporter,
) -> Result<RunSummary> {
    let mut paths = discover(&config.input)?;
    if let Some(limit) = options.limit {
        paths.truncate(limit);
    }

    let mut summary = RunSummary {
        found: paths.len(),
        ..RunSummary::default()
    };
    if paths.is_empty() {
        tracing::info!(
            root = %config.input.root.display(),
            pattern = %config.input.pattern,
            "no documents found"
        );
        return Ok(summary);
    }

    if options.dry_run {
        return dry_run(config, &paths, summary);
    }

    let extractor = Extractor::new(config, generator, parser)?;
    extractor.layout().ensure_dirs()?;
    let mut run_log = RunLog::start(&extractor.layout().index_path)?;

    let total = paths.len() as u64;
    progress.report(RunProgressEvent::Started { total });
    tracing::info!(documents = paths.len(), model = generator.model_name(), "run started");

    for (i, path) in paths.iter().enumerate() {
        progress.report(RunProgressEvent::Processing {
            n: i as u64 + 1,
            total,
            filename: display_name(path),
        });
        summary.processed += 1;

        match extractor.process_document(path).await {
            Ok(record) => {
                run_log.append(&IndexRow::from(&record))?;
                match &record.front.error {
                    None => {
                        summary.succeeded += 1;
                        progress.report(RunProgressEvent::Succeeded {
                            title: record.front.title.clone(),
                        });
                    }
                    Some(error) => {
                        summary.failed += 1;
                        progress.report(RunProgressEvent::Failed {
                            error: error.clone(),
                            persisted: true,
                        });
                    }
                }
            }
            Err(PipelineError::Persist(e)) => return Err(e),
            Err(e @ PipelineError::Identity { .. }) => {
                tracing::warn!(path = %path.display(), error = %e, "document skipped");
                summary.skipped += 1;
                progress.report(RunProgressEvent::Failed {
                    error: e.to_string(),
                    persisted: false,
                });
            }
        }
    }

    tracing::info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        index_rows = run_log.rows(),
        "run finished"
    );

    Ok(summary)
}

/// [`run_extract`] against the configured Ollama endpoint.
pub async fn run(
    config: &Config,
    options: &RunOptions,
    progress: &dyn RunProgressReporter,
) -> Result<RunSummary> {
    let generator = OllamaGenerator::new(&config.generation)?;
    let summary = run_extract(config, &generator, &StrictThenBraces, options, progress).await?;

    if !options.dry_run {
        println!("run");
    }
    println!("  documents found: {}", summary.found);
    println!("  processed: {}", summary.processed);
    if !options.dry_run {
        println!("  succeeded: {}", summary.succeeded);
        println!("  failed: {}", summary.failed);
        println!("  skipped: {}", summary.skipped);
        if summary.processed > 0 {
            let layout = OutputLayout::new(&config.output.dir);
            println!("  records: {}", layout.json_dir.display());
            println!("  diagnostics: {}", layout.log_dir.display());
            println!("  index: {}", layout.index_path.display());
        }
    }
    println!("ok");

    Ok(summary)
}

fn dry_run(config: &Config, paths: &[PathBuf], mut summary: RunSummary) -> Result<RunSummary> {
    println!("run (dry-run)");
    for path in paths {
        summary.processed += 1;
        match inspect_document(path, config) {
            Ok(Inspection {
                document,
                slice: Ok(slice),
            }) => {
                summary.succeeded += 1;
                println!(
                    "  {}  {}  pages: {}  window: {:?}  chars: {}",
                    short_id(&document.id),
                    document.file.filename,
                    document.page_count,
                    slice.window,
                    slice.char_count
                );
            }
            Ok(Inspection {
                document,
                slice: Err(e),
            }) => {
                summary.failed += 1;
                println!(
                    "  {}  {}  error: {}",
                    short_id(&document.id),
                    document.file.filename,
                    e
                );
            }
            Err(e) => {
                summary.skipped += 1;
                println!("  -  {}  error: {}", display_name(path), e);
            }
        }
    }
    Ok(summary)
}

/// List discovered documents in processing order with their identity.
pub fn list_documents(config: &Config) -> Result<()> {
    let paths = discover(&config.input)?;
    for path in &paths {
        match content_hash(path) {
            Ok(id) => println!("{}  {}", id, path.display()),
            Err(e) => println!("{:64}  {}  ({})", "-", path.display(), e),
        }
    }
    println!("{} documents", paths.len());
    Ok(())
}

/// Print identity, slicing outcome and excerpt of one document.
pub fn print_slice(path: &Path, config: &Config) -> Result<()> {
    let inspection = inspect_document(path, config)?;
    let doc = inspection.document;
    println!("id: {}", doc.id);
    println!("file: {}", doc.file.path);
    println!("size_bytes: {}", doc.file.size_bytes);
    println!("modified_time: {}", doc.file.modified_time);
    println!("page_count: {}", doc.page_count);
    let slice = inspection.slice?;
    println!("window: {:?} ({} pages)", slice.window, slice.pages_read);
    println!("chars: {}", slice.char_count);
    println!("---");
    println!("{}", slice.text);
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}
