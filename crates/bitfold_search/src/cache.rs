//! On-disk cluster cache.
//!
//! A cluster's 256-output fingerprint hashes to a CRC-64; the cluster
//! lives at `cache_dir/xx/yyyyyyyyyyyyyyyy.sxp` where `xx` is the low
//! byte and the long name the full hash, one program per line.
//!
//! Writers cooperate through an exclusive OS file lock: a process that
//! finds the file empty populates it, anyone finding content leaves it
//! alone. Readers can consume the file without locking once it is
//! non-empty, because populated files are never rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;

use bitfold_base::Result as ParseResult;
use bitfold_kernel::Expr;
use bitfold_lang::parse_program;
use tracing::debug;

/// Reflected CRC-64 generator polynomial (Jones).
const CRC64_POLY: u64 = 0x95AC_9329_AC4B_C9B5;

fn crc64_table() -> &'static [u64; 256] {
    static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u64; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u64;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ CRC64_POLY
                } else {
                    crc >> 1
                };
            }
            *entry = crc;
        }
        table
    })
}

/// CRC-64 over the little-endian bytes of a fingerprint vector.
pub fn fingerprint_hash(outputs: &[u64]) -> u64 {
    let table = crc64_table();
    let mut crc = 0u64;
    for &output in outputs {
        for shift in (0..64).step_by(8) {
            crc = table[((crc ^ (output >> shift)) & 0xFF) as usize] ^ (crc >> 8);
        }
    }
    crc
}

/// The cache file path for a fingerprint hash.
pub fn cache_path(cache_dir: &Path, hash: u64) -> PathBuf {
    cache_dir
        .join(format!("{:02x}", hash & 0xFF))
        .join(format!("{:016x}.sxp", hash))
}

/// Writes one cluster to the cache unless it is already populated.
///
/// Returns `true` when this call wrote the file.
pub fn store_cluster(
    cache_dir: &Path,
    outputs: &[u64],
    programs: &[Rc<Expr>],
) -> std::io::Result<bool> {
    let path = cache_path(cache_dir, fingerprint_hash(outputs));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(&path)?;
    file.lock()?;

    // An empty file means "write the cluster now"; content means a
    // peer already did.
    let end = file.seek(SeekFrom::End(0))?;
    let written = if end == 0 {
        let mut text = String::new();
        for program in programs {
            text.push_str(&program.to_string());
            text.push('\n');
        }
        file.write_all(text.as_bytes())?;
        true
    } else {
        false
    };

    file.unlock()?;
    debug!(path = %path.display(), written, "cluster cache visited");
    Ok(written)
}

/// Reads a cached cluster back, if present and populated.
///
/// `None` means no usable cache entry; a populated file that fails to
/// parse is an error (the cache is corrupt, not merely cold).
pub fn load_cluster(
    cache_dir: &Path,
    outputs: &[u64],
) -> std::io::Result<Option<Vec<Rc<Expr>>>> {
    let path = cache_path(cache_dir, fingerprint_hash(outputs));
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }

    let mut programs = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let parsed: ParseResult<_> = parse_program(&line);
        match parsed {
            Ok(program) => programs.push(program),
            Err(err) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("corrupt cache entry {}: {}", path.display(), err),
                ))
            }
        }
    }
    Ok(Some(programs))
}

/// Convenience for tools: reads raw cache text without parsing.
pub fn read_cache_text(cache_dir: &Path, hash: u64) -> std::io::Result<Option<String>> {
    let path = cache_path(cache_dir, hash);
    match File::open(&path) {
        Ok(mut file) => {
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            Ok(Some(text))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitfold_lang::parse;

    #[test]
    fn crc_table_matches_reference_values() {
        let table = crc64_table();
        assert_eq!(table[0], 0);
        assert_eq!(table[1], 0x7AD8_70C8_3035_8979);
        assert_eq!(table[2], 0xF5B0_E190_606B_12F2);
        assert_eq!(table[255], 0x29B7_D047_EFEC_8728);
    }

    #[test]
    fn hash_is_stable_and_discriminating() {
        let a = vec![1u64, 2, 3];
        let b = vec![1u64, 2, 4];
        assert_eq!(fingerprint_hash(&a), fingerprint_hash(&a));
        assert_ne!(fingerprint_hash(&a), fingerprint_hash(&b));
    }

    #[test]
    fn path_layout_uses_low_byte_shard() {
        let path = cache_path(Path::new("/cache"), 0xABCD_EF01_2345_6789);
        assert_eq!(
            path,
            Path::new("/cache/89/abcdef0123456789.sxp")
        );
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = vec![7u64; 4];
        let programs = vec![
            parse("(lambda (x) x)").unwrap(),
            parse("(lambda (x) (not x))").unwrap(),
        ];

        assert!(store_cluster(dir.path(), &outputs, &programs).unwrap());
        let loaded = load_cluster(dir.path(), &outputs).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].to_string(), "(lambda (x) x)");
        assert_eq!(loaded[1].to_string(), "(lambda (x) (not x))");
    }

    #[test]
    fn populated_entries_are_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = vec![1u64, 2, 3];
        let first = vec![parse("(lambda (x) x)").unwrap()];
        let second = vec![parse("(lambda (x) 0)").unwrap()];

        assert!(store_cluster(dir.path(), &outputs, &first).unwrap());
        assert!(!store_cluster(dir.path(), &outputs, &second).unwrap());

        let loaded = load_cluster(dir.path(), &outputs).unwrap().unwrap();
        assert_eq!(loaded[0].to_string(), "(lambda (x) x)");
    }

    #[test]
    fn missing_and_empty_entries_read_as_cold() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = vec![9u64];
        assert!(load_cluster(dir.path(), &outputs).unwrap().is_none());

        // An empty file is a reservation, not content.
        let path = cache_path(dir.path(), fingerprint_hash(&outputs));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path).unwrap();
        assert!(load_cluster(dir.path(), &outputs).unwrap().is_none());
    }
}
