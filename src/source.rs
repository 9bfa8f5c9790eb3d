use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;

use crate::error::Result;

/// Open one located file for line-oriented reading, picking the decompression
/// strategy from its name: `.gz` is gzip, `.bz2` is bzip2, anything else is
/// plain text.
///
/// A missing or unreadable file is an I/O error and aborts the pipeline; it is
/// neither retried nor skipped. The returned reader is the only open source of
/// its pipeline instance and closes on drop, so early consumer termination
/// still releases the file.
pub fn open_source(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let name = path.to_string_lossy();
    if name.ends_with(".gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else if name.ends_with(".bz2") {
        Ok(Box::new(BufReader::new(MultiBzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    const CONTENT: &str = "first line\nsecond line\nthird line\n";

    fn read_lines(path: &Path) -> Vec<String> {
        open_source(path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect()
    }

    #[test]
    fn identical_content_across_compression_schemes() {
        let tmp = TempDir::new().unwrap();

        let plain = tmp.path().join("data.log");
        std::fs::write(&plain, CONTENT).unwrap();

        let gz = tmp.path().join("data.log.gz");
        let mut enc = GzEncoder::new(File::create(&gz).unwrap(), flate2::Compression::default());
        enc.write_all(CONTENT.as_bytes()).unwrap();
        enc.finish().unwrap();

        let bz = tmp.path().join("data.log.bz2");
        let mut enc = BzEncoder::new(File::create(&bz).unwrap(), bzip2::Compression::default());
        enc.write_all(CONTENT.as_bytes()).unwrap();
        enc.finish().unwrap();

        let expected = vec!["first line", "second line", "third line"];
        assert_eq!(read_lines(&plain), expected);
        assert_eq!(read_lines(&gz), expected);
        assert_eq!(read_lines(&bz), expected);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = open_source(&tmp.path().join("absent.log")).err().unwrap();
        assert!(matches!(err, crate::error::PipelineError::Io(_)));
    }
}
