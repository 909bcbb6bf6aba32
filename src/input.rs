use std::path::Path;

use can_dbc::DBC;
use log::debug;
use regex::Regex;

use crate::errors::{FilterCalcError, Result};

/// Frame formats taken from a DBC database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    #[default]
    Any,
    Standard,
    Extended,
}

impl std::str::FromStr for FrameFormat {
    type Err = FilterCalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(FrameFormat::Any),
            "standard" | "std" => Ok(FrameFormat::Standard),
            "extended" | "ext" => Ok(FrameFormat::Extended),
            other => Err(FilterCalcError::invalid_argument(format!(
                "unknown frame format `{other}`, expected any, standard or extended"
            ))),
        }
    }
}

/// Parses one hexadecimal identifier per line.
///
/// A `0x` prefix is optional, blank lines and lines starting with `#` are
/// skipped.
pub fn parse_identifiers(text: &str) -> Result<Vec<u32>> {
    let id_regex = Regex::new(r"^(0[xX])?(?<hex>[0-9a-fA-F]{1,8})$")?;
    let mut ids = vec![];
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_error = || FilterCalcError::ParseIdentifier {
            line: index + 1,
            content: line.to_owned(),
        };
        let captures = id_regex.captures(line).ok_or_else(parse_error)?;
        let id = u32::from_str_radix(&captures["hex"], 16).map_err(|_| parse_error())?;
        ids.push(id);
    }
    Ok(ids)
}

pub fn read_identifiers(path: &Path) -> Result<Vec<u32>> {
    let text = std::fs::read_to_string(path)?;
    let ids = parse_identifiers(&text)?;
    debug!("read {} identifiers from {}", ids.len(), path.display());
    Ok(ids)
}

/// DBC databases mark extended (29 bit) message ids with the top bit.
const DBC_EXTENDED_FLAG: u32 = 0x8000_0000;
const DBC_EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Identifiers of the messages in `dbc` with the requested frame format.
///
/// Extended ids are returned without the DBC flag bit.
pub fn dbc_identifiers(dbc: &DBC, frames: FrameFormat) -> Vec<u32> {
    dbc.messages()
        .iter()
        .filter_map(|message| {
            let raw = message.message_id().0;
            let extended = raw & DBC_EXTENDED_FLAG != 0;
            match (extended, frames) {
                (false, FrameFormat::Any | FrameFormat::Standard) => Some(raw),
                (true, FrameFormat::Any | FrameFormat::Extended) => {
                    Some(raw & DBC_EXTENDED_ID_MASK)
                }
                _ => None,
            }
        })
        .collect()
}

/// Collects the identifiers of the messages defined in a DBC file.
pub fn read_dbc_identifiers(path: &Path, frames: FrameFormat) -> Result<Vec<u32>> {
    let buffer = std::fs::read(path)?;
    let dbc = DBC::from_slice(&buffer).map_err(|e| FilterCalcError::Dbc(format!("{e:?}")))?;
    let ids = dbc_identifiers(&dbc, frames);
    debug!("read {} message identifiers from {}", ids.len(), path.display());
    Ok(ids)
}
