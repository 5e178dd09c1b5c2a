use bio::io::fasta;
use flate2::read::GzDecoder;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

#[path = "utils_test.rs"]
mod utils_test;

pub fn xopen(path: &Path) -> Result<Box<dyn BufRead>, io::Error> {
    let file = OpenOptions::new().read(true).open(path)?;
    Ok(Box::new(BufReader::new(file)))
}

/// Open a file for reading, decompressing on the fly when it ends in `.gz`.
pub fn xzopen(path: &Path) -> Result<Box<dyn BufRead>, io::Error> {
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        xopen(path)
    }
}

/// Count FASTA records in a file, failing on malformed input.
pub fn count_fasta_records(path: &Path) -> Result<usize, io::Error> {
    let reader = fasta::Reader::new(xzopen(path)?);
    let mut count = 0;
    for record in reader.records() {
        record.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        count += 1;
    }
    Ok(count)
}

/// `path` exists as a file, directory or anything else.
pub fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}
