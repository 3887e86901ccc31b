//! Hashing utilities for source checksums.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Split an `algorithm:hexdigest` checksum declaration.
pub fn parse_checksum(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once(':') {
        Some((algorithm, digest)) if !algorithm.is_empty() && !digest.is_empty() => {
            Ok((algorithm, digest))
        }
        _ => bail!(
            "malformed checksum `{}`; expected `algorithm:hexdigest`",
            spec
        ),
    }
}

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the named digest of a file.
pub fn file_digest(path: &Path, algorithm: &str) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;
    let reader = BufReader::new(file);

    match algorithm {
        "sha256" | "sha256sum" => hash_reader::<Sha256>(reader),
        "sha384" => hash_reader::<Sha384>(reader),
        "sha512" => hash_reader::<Sha512>(reader),
        other => bail!("unsupported checksum algorithm `{}`", other),
    }
}

fn hash_reader<D: Digest>(mut reader: impl Read) -> Result<String> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
