//! # Image Normalization
//!
//! Turns a base64 payload into an auto-oriented, metadata-stripped JPEG on
//! disk, using an external tool (ImageMagick `convert` by default).
//!
//! ## Pipeline
//!
//! 1. Decode the base64 payload
//! 2. Write the bytes to a temporary source file (`*_<tag>_src.jpg`)
//! 3. Reserve a temporary result file (`*_<tag>_fixed.jpg`)
//! 4. Run `program args...` with `{input}`/`{output}` substituted
//! 5. Delete the source file and hand the result back as a [`NormalizedImage`]
//!
//! Both temporary files are held as [`TempPath`] guards, so an early return
//! at any step, a tool timeout or a dropped request future removes whatever
//! was already created.

use base64::{engine::general_purpose, Engine as _};
use log::{debug, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::{Builder, TempPath};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::common::config::{NormalizerSettings, INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};
use crate::common::error::{RelayError, RelayResult};

const TEMP_PREFIX: &str = "face_relay_";

/// A normalized JPEG owned by exactly one request.
///
/// The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct NormalizedImage {
    path: TempPath,
}

impl NormalizedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used for the multipart part.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string())
    }

    /// Delete the file now, reporting failures instead of swallowing them.
    pub fn close(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Runs the external orient/strip tool over decoded images.
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    temp_dir: PathBuf,
}

impl ImageNormalizer {
    pub fn new(settings: &NormalizerSettings, temp_dir: PathBuf) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            temp_dir,
        }
    }

    /// Decode `payload` and normalize it into a temp file tagged with `tag`.
    ///
    /// `tag` must be unique among concurrent calls; the handler derives it
    /// from a per-request UUID.
    ///
    /// # Errors
    /// - [`RelayError::Decode`] if the payload is not valid base64
    /// - [`RelayError::Normalization`] if staging the temp files fails, or the
    ///   tool cannot be started, exits non-zero, times out or writes nothing
    pub async fn normalize(&self, payload: &str, tag: &str) -> RelayResult<NormalizedImage> {
        let bytes = decode_payload(payload)?;
        debug!("Decoded {} bytes for {}", bytes.len(), tag);

        let (source, output) = self.stage(&bytes, tag).await?;

        // Any error from here on drops both guards, removing both files.
        self.run_tool(&source, &output).await?;

        let written = tokio::fs::metadata(&output)
            .await
            .map_err(|e| RelayError::Normalization(format!("cannot inspect output: {}", e)))?
            .len();
        if written == 0 {
            return Err(RelayError::Normalization(format!(
                "{} produced an empty image",
                self.program
            )));
        }

        if let Err(e) = source.close() {
            warn!("Could not remove temp source for {}: {}", tag, e);
        }

        Ok(NormalizedImage { path: output })
    }

    /// Write the decoded bytes to the source file and reserve the output file.
    async fn stage(&self, bytes: &[u8], tag: &str) -> RelayResult<(TempPath, TempPath)> {
        stage_files(&self.temp_dir, bytes, tag)
            .await
            .map_err(|e| RelayError::Normalization(format!("cannot write temp image: {}", e)))
    }

    async fn run_tool(&self, input: &Path, output: &Path) -> RelayResult<()> {
        let args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| substitute(arg, input, output))
            .collect();

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                RelayError::Normalization(format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                RelayError::Normalization(format!("failed to run {}: {}", self.program, e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(RelayError::Normalization(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// The files are created inline so their guards belong to the calling
/// future from the moment they exist; a cancelled request drops them. The
/// payload itself (up to `max_body_bytes`) is written through the already
/// open handle off the worker thread, so the path is never reopened.
async fn stage_files(
    dir: &Path,
    bytes: &[u8],
    tag: &str,
) -> std::io::Result<(TempPath, TempPath)> {
    let (file, source) = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!("_{}_src.jpg", tag))
        .tempfile_in(dir)?
        .into_parts();

    // `source` is removed on drop if anything below fails.
    let mut file = tokio::fs::File::from_std(file);
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    let output = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!("_{}_fixed.jpg", tag))
        .tempfile_in(dir)?
        .into_temp_path();

    Ok((source, output))
}

/// Decode a base64 payload, ignoring embedded ASCII whitespace (line-wrapped
/// payloads are common).
pub fn decode_payload(payload: &str) -> RelayResult<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(general_purpose::STANDARD.decode(compact)?)
}

fn substitute(arg: &str, input: &Path, output: &Path) -> OsString {
    match arg {
        INPUT_PLACEHOLDER => input.as_os_str().to_owned(),
        OUTPUT_PLACEHOLDER => output.as_os_str().to_owned(),
        _ => arg
            .replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
            .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
            .into(),
    }
}
