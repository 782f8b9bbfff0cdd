//! CSV input: turns delimited files into raw [`SourceTable`]s.
//!
//! Each file becomes one source table, named after the file stem unless the
//! input is given as `NAME=PATH`. The delimiter is resolved from the extension
//! (`.tsv` → tab) unless overridden, and bytes are decoded through
//! `encoding_rs` (UTF-8 by default). Empty fields and cells matching one of the
//! configured null tokens become the explicit-null marker.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::table::{Cell, SourceTable};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub name: String,
    pub path: PathBuf,
}

impl FromStr for InputSpec {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        if let Some((name, path)) = value.split_once('=')
            && !name.trim().is_empty()
            && !path.trim().is_empty()
        {
            return Ok(InputSpec {
                name: name.trim().to_string(),
                path: PathBuf::from(path.trim()),
            });
        }
        let path = PathBuf::from(value.trim());
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| anyhow!("Cannot derive a table name from input '{value}'"))?
            .to_string();
        Ok(InputSpec { name, path })
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn parse_delimiter(value: &str) -> std::result::Result<u8, String> {
    match value {
        "tab" | "\\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        "semicolon" => Ok(b';'),
        "pipe" => Ok(b'|'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(format!("Unsupported delimiter '{other}'")),
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub null_tokens: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            null_tokens: Vec::new(),
        }
    }
}

impl ReadOptions {
    fn to_cell(&self, text: String) -> Cell {
        if text.is_empty()
            || self
                .null_tokens
                .iter()
                .any(|token| token.eq_ignore_ascii_case(text.trim()))
        {
            None
        } else {
            Some(text)
        }
    }
}

pub fn read_source_table<R: Read>(
    name: &str,
    reader: R,
    options: &ReadOptions,
    delimiter: u8,
) -> Result<SourceTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .byte_headers()
        .with_context(|| format!("Reading headers of '{name}'"))?
        .iter()
        .map(|field| decode_bytes(field, options.encoding))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            if idx == 0 {
                header.trim_start_matches('\u{feff}').to_string()
            } else {
                header
            }
        })
        .collect::<Vec<_>>();

    let mut table = SourceTable::new(name, headers);
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of '{name}'", row_idx + 2))?;
        let row = record
            .iter()
            .map(|field| -> Result<Cell> {
                Ok(options.to_cell(decode_bytes(field, options.encoding)?))
            })
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Decoding row {} of '{name}'", row_idx + 2))?;
        table.push_row(row);
    }
    Ok(table)
}

pub fn load_source_table(input: &InputSpec, options: &ReadOptions) -> Result<SourceTable> {
    let delimiter = resolve_input_delimiter(&input.path, options.delimiter);
    let file = File::open(&input.path)
        .with_context(|| format!("Opening input file {:?}", input.path))?;
    read_source_table(&input.name, BufReader::new(file), options, delimiter)
        .with_context(|| format!("Reading source table from {:?}", input.path))
}
