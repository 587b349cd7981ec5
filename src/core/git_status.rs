//! Type-safe decoding of `git status --porcelain=v2` output.
//!
//! This module turns raw porcelain text into typed [`ChangeRecord`]s and decides
//! which partition of the view each record belongs to.
//!
//! # Public API
//! - [`StatusCode`]: Validated two-character `XY` code
//! - [`Classification`]: Closed set of partitions (staged, unstaged, conflict, untracked)
//! - [`ChangeKind`]: Human-facing kind of change (modified, deleted, ...)
//! - [`parse_porcelain_v2`]: Decode a whole report into a [`StatusMap`]
//! - [`classify`] and [`is_modified_after_staging`]
//!
//! # Record types
//! - `1` ordinary change, `2` rename or copy, `u` unmerged, `?` untracked
//! - `!` ignored and `#` header lines produce no record
//! - malformed lines and unknown codes are skipped, never fatal

use crate::core::error::{ChangeViewError, Result};
use crate::core::state::{ChangeRecord, StatusMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Codes that mean both sides touched the path during a merge
const CONFLICT_CODES: [&str; 7] = ["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

/// Two-character `XY` status code.
///
/// Porcelain v2 writes `.` for "unchanged"; it is normalized to a space on
/// parse so both report versions compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusCode([u8; 2]);

impl StatusCode {
    pub const UNTRACKED: StatusCode = StatusCode([b'?', b'?']);

    pub fn parse(code: &str) -> Result<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 2 {
            return Err(ChangeViewError::unknown_status_code(code));
        }
        let mut normalized = [0u8; 2];
        for (slot, &byte) in normalized.iter_mut().zip(bytes) {
            *slot = match byte {
                b'.' | b' ' => b' ',
                b'M' | b'T' | b'A' | b'D' | b'R' | b'C' | b'U' | b'?' | b'!' => byte,
                _ => return Err(ChangeViewError::unknown_status_code(code)),
            };
        }
        Ok(StatusCode(normalized))
    }

    /// Index (staged) side
    pub fn index(&self) -> char {
        self.0[0] as char
    }

    /// Working-tree side
    pub fn worktree(&self) -> char {
        self.0[1] as char
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored
        std::str::from_utf8(&self.0).unwrap_or("  ")
    }

    pub fn is_conflict(&self) -> bool {
        CONFLICT_CODES.contains(&self.as_str())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for StatusCode {
    type Error = ChangeViewError;

    fn try_from(value: String) -> Result<Self> {
        StatusCode::parse(&value)
    }
}

impl From<StatusCode> for String {
    fn from(code: StatusCode) -> Self {
        code.as_str().to_string()
    }
}

/// Which partition of the view a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Staged,
    Unstaged,
    Conflict,
    Untracked,
}

impl Classification {
    pub fn from_code(code: StatusCode) -> Self {
        if code.is_conflict() {
            return Classification::Conflict;
        }
        if code == StatusCode::UNTRACKED {
            return Classification::Untracked;
        }
        // Dual-state files are shown once, in the unstaged partition
        if code.as_str() == "MM" {
            return Classification::Unstaged;
        }
        if code.index() != ' ' && code.worktree() == ' ' {
            Classification::Staged
        } else {
            Classification::Unstaged
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Classification::Staged => "staged",
            Classification::Unstaged => "unstaged",
            Classification::Conflict => "conflict",
            Classification::Untracked => "untracked",
        }
    }
}

/// Classify a record into its view partition
pub fn classify(record: &ChangeRecord) -> Classification {
    Classification::from_code(record.status)
}

/// True when the file has staged changes and further unstaged edits on top
pub fn is_modified_after_staging(record: &ChangeRecord) -> bool {
    record.status.as_str() == "MM"
}

/// Human-facing kind of change for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Untracked,
    Unmerged,
}

impl ChangeKind {
    pub fn from_record(record: &ChangeRecord) -> Self {
        match record.classification {
            Classification::Conflict => return ChangeKind::Unmerged,
            Classification::Untracked => return ChangeKind::Untracked,
            _ => {}
        }
        // Staged records describe the index side, everything else the
        // working tree unless it is clean there
        let side = if record.classification == Classification::Staged
            || record.status.worktree() == ' '
        {
            record.status.index()
        } else {
            record.status.worktree()
        };
        match side {
            'A' => ChangeKind::Added,
            'D' => ChangeKind::Deleted,
            'R' => ChangeKind::Renamed,
            'C' => ChangeKind::Copied,
            'T' => ChangeKind::TypeChanged,
            'U' => ChangeKind::Unmerged,
            _ => ChangeKind::Modified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Modified => "M",
            ChangeKind::Added => "A",
            ChangeKind::Deleted => "D",
            ChangeKind::Renamed => "R",
            ChangeKind::Copied => "C",
            ChangeKind::TypeChanged => "T",
            ChangeKind::Untracked => "??",
            ChangeKind::Unmerged => "UU",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChangeKind::Modified => "modified",
            ChangeKind::Added => "new",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed => "renamed",
            ChangeKind::Copied => "copied",
            ChangeKind::TypeChanged => "type changed",
            ChangeKind::Untracked => "untracked",
            ChangeKind::Unmerged => "both modified",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decode a full porcelain v2 report.
///
/// Bad lines are logged and skipped so one odd path never hides the rest of
/// the working tree.
pub fn parse_porcelain_v2(raw: &str) -> StatusMap {
    let mut records = StatusMap::new();
    for line in raw.lines() {
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(Some(record)) => {
                records.insert(record.path.clone(), record);
            }
            Ok(None) => {}
            Err(e) => log::debug!("Skipping status line {line:?}: {e}"),
        }
    }
    records
}

fn parse_line(line: &str) -> Result<Option<ChangeRecord>> {
    match line.as_bytes()[0] {
        b'1' => {
            let fields: Vec<&str> = line.splitn(9, ' ').collect();
            let path = required_path(&fields, 8)?;
            let code = StatusCode::parse(fields[1])?;
            Ok(Some(ChangeRecord::new(unquote(path), code)))
        }
        b'2' => {
            let fields: Vec<&str> = line.splitn(10, ' ').collect();
            let paths = required_path(&fields, 9)?;
            let code = StatusCode::parse(fields[1])?;
            let similarity = fields[8].get(1..).and_then(|score| score.parse::<u8>().ok());
            let (new_path, orig_path) = paths
                .split_once('\t')
                .ok_or_else(|| ChangeViewError::malformed_status_line("rename without origin path"))?;
            Ok(Some(
                ChangeRecord::new(unquote(new_path), code)
                    .with_rename(unquote(orig_path), similarity),
            ))
        }
        b'u' => {
            let fields: Vec<&str> = line.splitn(11, ' ').collect();
            let path = required_path(&fields, 10)?;
            let code = StatusCode::parse(fields[1])?;
            Ok(Some(ChangeRecord::new(unquote(path), code)))
        }
        b'?' => {
            let path = line
                .get(2..)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ChangeViewError::malformed_status_line("untracked entry without path"))?;
            Ok(Some(ChangeRecord::new(unquote(path), StatusCode::UNTRACKED)))
        }
        b'!' | b'#' => Ok(None),
        other => Err(ChangeViewError::malformed_status_line(format!(
            "unknown record type '{}'",
            other as char
        ))),
    }
}

fn required_path<'a>(fields: &[&'a str], index: usize) -> Result<&'a str> {
    match fields.get(index) {
        Some(path) if !path.is_empty() => Ok(path),
        _ => Err(ChangeViewError::malformed_status_line(format!(
            "expected at least {} fields, found {}",
            index + 1,
            fields.len()
        ))),
    }
}

/// Undo git's C-style quoting of unusual path names
fn unquote(path: &str) -> String {
    let inner = match path
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner,
        None => return path.to_string(),
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(byte) = iter.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        match iter.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b'f') => bytes.push(0x0c),
            Some(b'r') => bytes.push(b'\r'),
            Some(b'v') => bytes.push(0x0b),
            Some(digit @ b'0'..=b'7') => {
                let mut value = u32::from(digit - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
