// tagged2rowbinary - Point files to tagged-table RowBinary
//
// Drives the core parser over a list of point files:
// - one `<stem>.rowbinary` output per input, flushed and synced to disk
// - new index keys merged into the shared existence cache only after the
//   output for that file is durable
// - a failing file is logged and skipped; the remaining files still run
//
// Uploading the outputs is left to whatever picks them up from the output dir.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tagged2rowbinary_cache::KeyCache;
use tagged2rowbinary_config::RuntimeConfig;
use tagged2rowbinary_core::{
    DedicatedTags, ExistsCache, IgnoredMetrics, NoCache, ParseSummary, TaggedParser,
};
use tracing::{error, info, warn};

mod init;

pub use init::init_tracing;

/// Extension of converted files.
pub const OUTPUT_EXTENSION: &str = "rowbinary";

/// Build the parser described by the `[tagged]` section.
pub fn build_parser(config: &RuntimeConfig) -> TaggedParser {
    let tagged = &config.tagged;
    TaggedParser::new(
        &tagged.table,
        DedicatedTags::new(tagged.dedicated_pairs()),
        IgnoredMetrics::new(tagged.ignored_tagged_metrics.iter().map(String::as_str)),
    )
}

/// Result of converting one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<ConvertedFile>,
}

#[derive(Debug)]
pub struct ConvertedFile {
    pub output: PathBuf,
    pub summary: ParseSummary,
}

/// Outcome of a `convert` run.
#[derive(Debug, Default)]
pub struct ConvertReport {
    pub files: Vec<FileOutcome>,
}

impl ConvertReport {
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn rows_written(&self) -> usize {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().ok())
            .map(|c| c.summary.rows_written)
            .sum()
    }
}

/// Sequential converter; owns the existence cache for the whole run.
#[derive(Debug)]
pub struct Converter {
    parser: TaggedParser,
    cache: Option<KeyCache>,
    output_dir: PathBuf,
    used_outputs: HashSet<PathBuf>,
}

impl Converter {
    pub fn new(config: &RuntimeConfig) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| KeyCache::new(config.cache.ttl()));
        Self {
            parser: build_parser(config),
            cache,
            output_dir: config.output.path.clone(),
            used_outputs: HashSet::new(),
        }
    }

    pub fn parser(&self) -> &TaggedParser {
        &self.parser
    }

    pub fn cache(&self) -> Option<&KeyCache> {
        self.cache.as_ref()
    }

    /// Convert `inputs` in order. Per-file failures are recorded in the
    /// report; only failing to prepare the output directory is an `Err`.
    pub fn run<P: AsRef<Path>>(&mut self, inputs: &[P]) -> Result<ConvertReport> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })?;

        let mut report = ConvertReport::default();
        for input in inputs {
            let input = input.as_ref();
            let result = self.convert_file(input);
            if let Err(err) = &result {
                error!(file = %input.display(), error = %format!("{:#}", err), "conversion failed");
            }
            report.files.push(FileOutcome {
                input: input.to_path_buf(),
                result,
            });
        }

        info!(
            files = report.files.len(),
            failed = report.failed(),
            rows = report.rows_written(),
            "convert run finished"
        );
        Ok(report)
    }

    fn convert_file(&mut self, input: &Path) -> Result<ConvertedFile> {
        if let Some(cache) = &self.cache {
            cache.expire();
        }

        let output = self.output_path_for(input)?;
        let summary = match self.write_output(input, &output) {
            Ok(summary) => summary,
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&output) {
                    warn!(
                        file = %output.display(),
                        error = %remove_err,
                        "failed to remove partial output"
                    );
                }
                return Err(err);
            }
        };
        self.used_outputs.insert(output.clone());

        // Output is on disk; its keys may now suppress later duplicates.
        if let Some(cache) = &self.cache {
            cache.merge(summary.new_keys.iter().cloned());
        }

        Ok(ConvertedFile { output, summary })
    }

    fn write_output(&self, input: &Path, output: &Path) -> Result<ParseSummary> {
        let file = File::create(output)
            .with_context(|| format!("Failed to create output file: {}", output.display()))?;
        let mut writer = BufWriter::new(file);

        let cache: &dyn ExistsCache = match &self.cache {
            Some(cache) => cache,
            None => &NoCache,
        };
        let summary = self
            .parser
            .parse_file(input, cache, &mut writer)
            .with_context(|| format!("Failed to convert {}", input.display()))?;

        let file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush {}", output.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", output.display()))?;

        Ok(summary)
    }

    /// `<output_dir>/<stem>.rowbinary`, or `<stem>.<n>.rowbinary` when an
    /// earlier input in this run already produced that name.
    fn output_path_for(&self, input: &Path) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .with_context(|| format!("Input path has no file name: {}", input.display()))?
            .to_string_lossy();

        let mut candidate = self
            .output_dir
            .join(format!("{}.{}", stem, OUTPUT_EXTENSION));
        let mut n = 1;
        while self.used_outputs.contains(&candidate) {
            candidate = self
                .output_dir
                .join(format!("{}.{}.{}", stem, n, OUTPUT_EXTENSION));
            n += 1;
        }
        Ok(candidate)
    }
}
