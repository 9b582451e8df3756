//! Subcommand definitions and their implementations.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Args, Subcommand};
use evseal_core::{is_envelope, open_fields, seal_fields, Key};
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::config::Config;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new random key and print it as base64
    Keygen,

    /// Encrypt a value and print its envelope
    Encrypt(InputArgs),

    /// Decrypt an envelope and write the plaintext
    Decrypt(InputArgs),

    /// Exit 0 if the input is an envelope, 1 otherwise
    Check(InputArgs),

    /// Encrypt string fields of a JSON document
    SealFields(FieldArgs),

    /// Decrypt envelope-valued string fields of a JSON document
    OpenFields(FieldArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Read from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FieldArgs {
    /// Dot-notation field path; `[]` expands arrays (e.g. `orders[].card`)
    #[arg(short, long = "path", required = true)]
    pub paths: Vec<String>,

    #[command(flatten)]
    pub input: InputArgs,
}

impl Command {
    /// Run the command against `cfg`, writing results to stdout.
    pub fn run(self, cfg: &Config) -> Result<ExitCode> {
        let mut out = io::stdout().lock();
        match self {
            Command::Keygen => keygen(&mut out),
            Command::Encrypt(args) => {
                let key = cfg.key()?;
                encrypt(&key, &read_input(args.input.as_deref())?, &mut out)
            }
            Command::Decrypt(args) => {
                let key = cfg.key()?;
                decrypt(&key, &read_input(args.input.as_deref())?, &mut out)
            }
            Command::Check(args) => Ok(check(&read_input(args.input.as_deref())?)),
            Command::SealFields(args) => {
                let key = cfg.key()?;
                let input = read_input(args.input.input.as_deref())?;
                transform_fields(&input, &args.paths, &mut out, |doc, paths| {
                    Ok(seal_fields(doc, paths, &key)?)
                })
            }
            Command::OpenFields(args) => {
                let key = cfg.key()?;
                let input = read_input(args.input.input.as_deref())?;
                transform_fields(&input, &args.paths, &mut out, |doc, paths| {
                    Ok(open_fields(doc, paths, &key)?)
                })
            }
        }
    }
}

fn keygen<W: Write>(out: &mut W) -> Result<ExitCode> {
    let key = Key::generate().context("failed to generate key")?;
    let mut bytes = key.bytes();
    let encoded = STANDARD.encode(bytes);
    bytes.zeroize();
    write_line(out, encoded.as_bytes())?;
    info!("generated new key");
    Ok(ExitCode::SUCCESS)
}

fn encrypt<W: Write>(key: &Key, plaintext: &[u8], out: &mut W) -> Result<ExitCode> {
    let sealed = key.encrypt(plaintext).context("encryption failed")?;
    write_line(out, &sealed)?;
    debug!(plaintext_len = plaintext.len(), sealed_len = sealed.len(), "value sealed");
    Ok(ExitCode::SUCCESS)
}

fn decrypt<W: Write>(key: &Key, input: &[u8], out: &mut W) -> Result<ExitCode> {
    let plaintext = key
        .decrypt(trim_whitespace(input))
        .context("decryption failed")?;
    out.write_all(&plaintext)
        .and_then(|()| out.flush())
        .context("failed to write plaintext")?;
    Ok(ExitCode::SUCCESS)
}

fn check(input: &[u8]) -> ExitCode {
    if is_envelope(trim_whitespace(input)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn transform_fields<W, F>(
    input: &[u8],
    paths: &[String],
    out: &mut W,
    apply: F,
) -> Result<ExitCode>
where
    W: Write,
    F: FnOnce(&mut serde_json::Value, &[String]) -> Result<()>,
{
    let mut document: serde_json::Value =
        serde_json::from_slice(input).context("input is not a valid JSON document")?;

    apply(&mut document, paths).context("field transformation failed")?;

    let rendered =
        serde_json::to_vec_pretty(&document).context("failed to serialise JSON document")?;
    write_line(out, &rendered)?;
    debug!(paths = paths.len(), "fields transformed");
    Ok(ExitCode::SUCCESS)
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Strip surrounding ASCII whitespace, e.g. the newline `echo` appends.
fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn write_line<W: Write>(out: &mut W, bytes: &[u8]) -> Result<()> {
    out.write_all(bytes)
        .and_then(|()| out.write_all(b"\n"))
        .and_then(|()| out.flush())
        .context("failed to write output")
}
