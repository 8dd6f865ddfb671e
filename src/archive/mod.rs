// src/archive/mod.rs
//!
//! Archive codec
//!
//! ZIP container validation, streaming compress (many inputs, one
//! archive) and decompress (one archive, many outputs). Containers are
//! recognized by file-name suffix alone; decompress preconditions are
//! checked in a fixed order so the reported error always reflects the
//! first violation.

use crate::entry::{neutral_path, Entry};
use crate::error::DriverError;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tokio::sync::mpsc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};


/// The one recognized container family.
pub const ARCHIVE_EXTENSION: &str = "zip";

const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
const CENTRAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
const SPANNED_MARKER_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x07, 0x08];

/// Fixed end-of-central-directory record plus the maximum comment length.
const EOCD_TAIL_LIMIT: u64 = 22 + 65_535;
/// Cap on how much central directory the encrypted-entry scan reads.
const CENTRAL_SCAN_LIMIT: u64 = 16 * 1024 * 1024;

/// Suffix check, case-insensitive, without inspecting content.
pub fn is_archive_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
        .unwrap_or(false)
}

// ============================================================================
// Validation
// ============================================================================

/// Container preconditions, checked in strict order: encrypted, then
/// split, then structural validity. Suffix and existence are the caller's
/// earlier checks. Only device faults surface as `Io`; everything the
/// probe cannot make sense of ends up as one of the archive rejections.
pub fn validate(path: &Path) -> Result<(), DriverError> {
    let display = neutral_path(path);
    let mut file = File::open(path).map_err(|e| DriverError::io(&display, e))?;
    let probe = probe(&mut file).map_err(|e| DriverError::io(&display, e))?;

    match probe.central {
        Some(central) => {
            if central.any_encrypted {
                return Err(DriverError::EncryptedArchive { path: display });
            }
            if central.split || probe.spanned_marker {
                return Err(DriverError::SplitArchive { path: display });
            }
            check_structure(path, &display)
        }
        // Without a central directory the encrypted precondition is not
        // decidable; the spanned marker still identifies a leading volume.
        None if probe.spanned_marker => Err(DriverError::SplitArchive { path: display }),
        None => Err(DriverError::InvalidArchive { path: display }),
    }
}

struct Probe {
    spanned_marker: bool,
    central: Option<CentralSummary>,
}

struct CentralSummary {
    any_encrypted: bool,
    split: bool,
}

fn probe(file: &mut File) -> io::Result<Probe> {
    let len = file.metadata()?.len();

    let mut leading = [0u8; 4];
    let spanned_marker = if len >= 4 {
        file.read_exact(&mut leading)?;
        leading == SPANNED_MARKER_SIGNATURE
    } else {
        false
    };

    let tail_len = len.min(EOCD_TAIL_LIMIT);
    file.seek(SeekFrom::End(-(tail_len as i64)))?;
    let mut tail = vec![0u8; tail_len as usize];
    file.read_exact(&mut tail)?;

    let eocd = tail
        .windows(4)
        .rposition(|w| w == EOCD_SIGNATURE)
        .map(|pos| &tail[pos..])
        .filter(|rec| rec.len() >= 22);

    let central = match eocd {
        Some(rec) => {
            let disk_number = le16(rec, 4);
            let cd_start_disk = le16(rec, 6);
            let entries_this_disk = le16(rec, 8);
            let total_entries = le16(rec, 10);
            let cd_size = le32(rec, 12) as u64;
            let cd_offset = le32(rec, 16) as u64;

            // 0xFFFF is the zip64 sentinel, not a disk span.
            let split = (disk_number != 0 && disk_number != 0xFFFF)
                || (cd_start_disk != 0 && cd_start_disk != 0xFFFF)
                || entries_this_disk != total_entries;

            let any_encrypted = scan_central_flags(file, cd_offset, cd_size)?;
            Some(CentralSummary {
                any_encrypted,
                split,
            })
        }
        None => None,
    };

    Ok(Probe {
        spanned_marker,
        central,
    })
}

/// Walk central-directory entry headers looking for the encryption flag
/// (general-purpose bit 0). A short or malformed directory just ends the
/// scan; the structural check reports it afterwards.
fn scan_central_flags(file: &mut File, offset: u64, size: u64) -> io::Result<bool> {
    if file.seek(SeekFrom::Start(offset)).is_err() {
        return Ok(false);
    }
    let mut dir = Vec::new();
    file.take(size.min(CENTRAL_SCAN_LIMIT)).read_to_end(&mut dir)?;

    let mut pos = 0usize;
    while pos + 46 <= dir.len() {
        if dir[pos..pos + 4] != CENTRAL_HEADER_SIGNATURE {
            break;
        }
        if le16(&dir, pos + 8) & 0x0001 != 0 {
            return Ok(true);
        }
        let name_len = le16(&dir, pos + 28) as usize;
        let extra_len = le16(&dir, pos + 30) as usize;
        let comment_len = le16(&dir, pos + 32) as usize;
        pos += 46 + name_len + extra_len + comment_len;
    }
    Ok(false)
}

fn check_structure(path: &Path, display: &str) -> Result<(), DriverError> {
    let file = File::open(path).map_err(|e| DriverError::io(display, e))?;
    let mut archive = ZipArchive::new(file).map_err(|_| DriverError::InvalidArchive {
        path: display.to_string(),
    })?;
    for index in 0..archive.len() {
        archive
            .by_index(index)
            .map(|_| ())
            .map_err(|_| DriverError::InvalidArchive {
                path: display.to_string(),
            })?;
    }
    Ok(())
}

fn le16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn le32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ============================================================================
// Decompress
// ============================================================================

/// Full extraction into `dest_dir`. Validation has already passed; faults
/// here are device errors.
pub fn extract(source_path: &Path, dest_dir: &Path) -> Result<(), DriverError> {
    let display = neutral_path(source_path);
    let file = File::open(source_path).map_err(|e| DriverError::io(&display, e))?;
    let mut archive = ZipArchive::new(file).map_err(|_| DriverError::InvalidArchive {
        path: display.clone(),
    })?;
    archive
        .extract(dest_dir)
        .map_err(|e| DriverError::io(&display, io::Error::other(e)))
}

// ============================================================================
// Compress
// ============================================================================

pub(crate) type ProgressSender = mpsc::Sender<Result<Entry, DriverError>>;

/// Producer half of the compress progress sequence. Runs on a blocking
/// worker; the channel's capacity bounds it to one in-flight item. The
/// writer is always finalized, so members added before a failure or a
/// consumer cancellation remain readable in the partial archive.
pub(crate) fn run_compress(
    archive: File,
    archive_path: String,
    sources: Vec<Entry>,
    tx: ProgressSender,
) {
    let mut zip = ZipWriter::new(archive);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut pending_error: Option<DriverError> = None;

    for source in sources {
        let source_path = source.as_path();
        if !source_path.exists() {
            // Fail fast; remaining sources are not processed and the
            // partial archive is the caller's to clean up.
            pending_error = Some(DriverError::NotFound {
                path: source.path.clone(),
            });
            break;
        }
        if let Err(e) = add_member(&mut zip, &source_path, options) {
            pending_error = Some(e);
            break;
        }
        if tx.blocking_send(Ok(Entry::snapshot(&source_path))).is_err() {
            // Consumer cancelled; stop at the member boundary.
            break;
        }
    }

    if let Err(e) = zip.finish() {
        if pending_error.is_none() {
            pending_error = Some(DriverError::io(&archive_path, io::Error::other(e)));
        }
    }
    if let Some(e) = pending_error {
        let _ = tx.blocking_send(Err(e));
    }
}

/// Add one source (file or whole directory subtree) as archive members
/// whose paths are relative to the source's parent.
fn add_member(
    zip: &mut ZipWriter<File>,
    source: &Path,
    options: SimpleFileOptions,
) -> Result<(), DriverError> {
    let base = source.parent().unwrap_or_else(|| Path::new(""));
    add_tree(zip, source, base, options)
}

fn add_tree(
    zip: &mut ZipWriter<File>,
    path: &Path,
    base: &Path,
    options: SimpleFileOptions,
) -> Result<(), DriverError> {
    let display = neutral_path(path);
    let member = path
        .strip_prefix(base)
        .map(neutral_path)
        .unwrap_or_else(|_| display.clone());

    let metadata = fs::metadata(path).map_err(|e| DriverError::io(&display, e))?;
    if metadata.is_dir() {
        zip.add_directory(format!("{member}/"), options)
            .map_err(|e| DriverError::io(&display, io::Error::other(e)))?;

        let mut children = fs::read_dir(path)
            .map_err(|e| DriverError::io(&display, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DriverError::io(&display, e))?;
        children.sort_by_key(|c| c.file_name());

        for child in children {
            add_tree(zip, &child.path(), base, options)?;
        }
    } else {
        zip.start_file(member, options)
            .map_err(|e| DriverError::io(&display, io::Error::other(e)))?;
        let mut file = File::open(path).map_err(|e| DriverError::io(&display, e))?;
        io::copy(&mut file, zip).map_err(|e| DriverError::io(&display, e))?;
    }
    Ok(())
}
