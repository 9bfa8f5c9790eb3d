use std::io::BufRead;
use std::path::PathBuf;
use std::str::FromStr;

use apache_avro::Reader as AvroReader;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::source::open_source;

/// How the bytes of each located file become text records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Pass every line through unchanged.
    None,
    /// Decode a self-describing Avro container; each record becomes one
    /// compact JSON line.
    Avro,
}

impl FromStr for RecordFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "avro" => Ok(Self::Avro),
            other => Err(PipelineError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Records of the currently open source. Exactly one exists at a time; the
/// next file is opened only after this one is exhausted, and dropping it
/// closes the file on every exit path.
enum OpenSource {
    Lines(std::io::Lines<Box<dyn BufRead>>),
    Avro {
        reader: AvroReader<'static, Box<dyn BufRead>>,
        path: PathBuf,
    },
}

/// Turns a lazy path stream into a lazy stream of text records, opening and
/// decoding one source at a time.
pub struct RecordDecoder<I> {
    paths: I,
    format: RecordFormat,
    current: Option<OpenSource>,
}

impl<I> RecordDecoder<I>
where
    I: Iterator<Item = Result<PathBuf>>,
{
    pub fn new(paths: I, format: RecordFormat) -> Self {
        Self {
            paths,
            format,
            current: None,
        }
    }

    fn open_next(&mut self, path: PathBuf) -> Result<()> {
        let source = open_source(&path)?;
        self.current = Some(match self.format {
            RecordFormat::None => OpenSource::Lines(source.lines()),
            RecordFormat::Avro => OpenSource::Avro {
                reader: AvroReader::new(source)?,
                path,
            },
        });
        Ok(())
    }
}

impl<I> Iterator for RecordDecoder<I>
where
    I: Iterator<Item = Result<PathBuf>>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.current.as_mut() {
                Some(OpenSource::Lines(lines)) => match lines.next() {
                    Some(Ok(line)) => return Some(Ok(line)),
                    Some(Err(e)) => return Some(Err(e.into())),
                    None => self.current = None,
                },
                Some(OpenSource::Avro { reader, path }) => match reader.next() {
                    Some(Ok(value)) => match serde_json::Value::try_from(value) {
                        Ok(json) => return Some(Ok(json.to_string())),
                        Err(e) => {
                            // Recoverable: skip the record, keep the stream going.
                            warn!(file = %path.display(), error = %e, "skipping Avro record that does not convert to JSON");
                        }
                    },
                    Some(Err(e)) => return Some(Err(e.into())),
                    None => self.current = None,
                },
                None => match self.paths.next() {
                    Some(Ok(path)) => {
                        if let Err(e) = self.open_next(path) {
                            return Some(Err(e));
                        }
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => return None,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apache_avro::types::Record as AvroRecord;
    use apache_avro::{Schema, Writer};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn format_parses_known_tokens_only() {
        assert_eq!("none".parse::<RecordFormat>().unwrap(), RecordFormat::None);
        assert_eq!("avro".parse::<RecordFormat>().unwrap(), RecordFormat::Avro);
        assert!(matches!(
            "parquet".parse::<RecordFormat>(),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn raw_format_concatenates_sources() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.log");
        let b = tmp.path().join("b.log");
        fs::write(&a, "one\ntwo\n").unwrap();
        fs::write(&b, "three\n").unwrap();

        let paths = vec![Ok(a), Ok(b)].into_iter();
        let lines: Vec<String> = RecordDecoder::new(paths, RecordFormat::None)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn avro_container_decodes_to_json_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.avro");

        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "event",
                "fields": [
                    {"name": "k", "type": "long"},
                    {"name": "name", "type": "string"}
                ]
            }"#,
        )
        .unwrap();
        let mut writer = Writer::new(&schema, Vec::new());
        for (k, name) in [(1, "a"), (2, "b"), (3, "c")] {
            let mut record = AvroRecord::new(writer.schema()).unwrap();
            record.put("k", k as i64);
            record.put("name", name);
            writer.append(record).unwrap();
        }
        fs::write(&path, writer.into_inner().unwrap()).unwrap();

        let lines: Vec<String> = RecordDecoder::new(vec![Ok(path)].into_iter(), RecordFormat::Avro)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["k"], 1);
        assert_eq!(first["name"], "a");
        let third: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(third["k"], 3);
    }

    #[test]
    fn missing_file_aborts_the_stream() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("gone.log");
        let mut decoder = RecordDecoder::new(vec![Ok(gone)].into_iter(), RecordFormat::None);
        assert!(matches!(decoder.next(), Some(Err(PipelineError::Io(_)))));
    }
}
