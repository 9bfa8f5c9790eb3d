use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::warn;

use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineParams};
use crate::record::Record;

/// A lazy stream of decoded records; the `Err` item, if any, is the fatal
/// error that ended the stream.
pub type RecordStream = Box<dyn Iterator<Item = Result<Record>>>;

/// Whole-stream transform supplied by the caller. May capture caller-owned
/// mutable state for side-effecting accumulation.
pub type TransformFn = Box<dyn FnOnce(RecordStream) -> RecordStream>;

/// Run the pipeline and decode each trimmed text record into a structured
/// record, applying the caller's transform if given.
///
/// Decoding is tolerant: a record that is not a JSON object is skipped with a
/// diagnostic and the stream continues. The returned stream is still lazy;
/// nothing is read until it is consumed.
pub fn run_stream(params: &PipelineParams, transform: Option<TransformFn>) -> Result<RecordStream> {
    let lines = Pipeline::run(params)?;
    let decoded: RecordStream = Box::new(to_structured(lines));
    Ok(match transform {
        Some(f) => f(decoded),
        None => decoded,
    })
}

/// Run the pipeline, transform, and write every record as one JSON line to
/// `out_path`, gzip-compressed when the name ends in `.gz`. The stream is
/// consumed entirely; returns the number of records written.
pub fn run_to_sink(
    params: &PipelineParams,
    transform: Option<TransformFn>,
    out_path: &Path,
) -> Result<u64> {
    let stream = run_stream(params, transform)?;
    let mut writer = SinkWriter::create(out_path)?;
    let mut written = 0u64;
    for record in stream {
        let line = record?.to_json_line()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.finish()?;
    Ok(written)
}

fn to_structured<I>(lines: I) -> impl Iterator<Item = Result<Record>>
where
    I: Iterator<Item = Result<String>>,
{
    lines.filter_map(|item| match item {
        Ok(line) => match Record::parse_structured(&line) {
            Ok(map) => Some(Ok(Record::Structured(map))),
            Err(e) => {
                // Recoverable: drop the record, keep the stream going.
                warn!(error = %e, line = %line, "skipping record that is not a JSON object");
                None
            }
        },
        Err(e) => Some(Err(e)),
    })
}

/// JSON-lines output sink, compressed or not by file name.
enum SinkWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl SinkWriter {
    fn create(path: &Path) -> Result<Self> {
        let file = BufWriter::new(File::create(path)?);
        if path.to_string_lossy().ends_with(".gz") {
            Ok(Self::Gzip(GzEncoder::new(file, Compression::default())))
        } else {
            Ok(Self::Plain(file))
        }
    }

    fn finish(self) -> Result<()> {
        match self {
            Self::Plain(mut w) => w.flush()?,
            Self::Gzip(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}
