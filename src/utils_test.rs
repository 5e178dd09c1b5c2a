// src/utils_test.rs

#[cfg(test)]
mod tests {
    use crate::utils::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::{self, Read, Write};
    use std::path::{Path, PathBuf};

    // Helper for creating temporary files
    fn create_temp_file(dir: &Path, name: &str, content: &[u8]) -> io::Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    // --- xopen / xzopen Tests ---

    #[test]
    fn test_xopen_file() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let file_path = create_temp_file(temp_dir.path(), "test.txt", b"hello world")?;

        let mut reader = xopen(&file_path)?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        assert_eq!(content, "hello world");
        Ok(())
    }

    #[test]
    fn test_xopen_non_existent_file() {
        let result = xopen(Path::new("non_existent_file.txt"));
        match result {
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            Ok(_) => panic!("Expected an error, but got Ok"),
        }
    }

    #[test]
    fn test_xzopen_gz_file() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"gzipped content")?;
        let gz_file_path =
            create_temp_file(temp_dir.path(), "test.txt.gz", &encoder.finish()?)?;

        let mut reader = xzopen(&gz_file_path)?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        assert_eq!(content, "gzipped content");
        Ok(())
    }

    #[test]
    fn test_xzopen_non_gz_file() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let file_path = create_temp_file(temp_dir.path(), "test.txt", b"plain content")?;

        let mut reader = xzopen(&file_path)?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        assert_eq!(content, "plain content");
        Ok(())
    }

    // --- count_fasta_records Tests ---

    #[test]
    fn test_count_fasta_records() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = create_temp_file(
            temp_dir.path(),
            "aln.al",
            b">g_0\nMK-V\nLL\n>g_1\nMKAV\nL-\n>g_2\n--VV\nLL\n",
        )?;
        assert_eq!(count_fasta_records(&path)?, 3);
        Ok(())
    }

    #[test]
    fn test_count_fasta_records_empty_file() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = create_temp_file(temp_dir.path(), "empty.al", b"")?;
        assert_eq!(count_fasta_records(&path)?, 0);
        Ok(())
    }

    #[test]
    fn test_count_fasta_records_malformed() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = create_temp_file(temp_dir.path(), "bad.al", b"MKV\n>g_0\nMK\n")?;
        assert!(count_fasta_records(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_exists() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        assert!(exists(temp_dir.path()));
        assert!(!exists(&temp_dir.path().join("missing")));
        Ok(())
    }
}
