//! External collaborator wiring.
//!
//! The byte-level decode and the human-readable serialization are not this
//! tool's business; they live in an external decoder process. The decoder
//! receives the resolved coordinates as flags and the raw blob on stdin,
//! and writes the rendered companion content to stdout. Its stderr becomes
//! the failure reason on a non-zero exit.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use sszkit_core::batch::{RenderError, Renderer};
use sszkit_core::decode::{DecodeError, Decoder};
use sszkit_core::registry::SchemaDescriptor;

/// Decoder that shells out to an external program per fixture.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    program: PathBuf,
}

impl CommandDecoder {
    /// A decoder invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Decoder<SchemaDescriptor> for CommandDecoder {
    type Object = Vec<u8>;

    fn decode(&self, bytes: &[u8], schema: &SchemaDescriptor) -> Result<Vec<u8>, DecodeError> {
        let mut child = Command::new(&self.program)
            .arg("--fork")
            .arg(schema.fork.as_str())
            .arg("--preset")
            .arg(schema.preset.as_str())
            .arg("--type")
            .arg(schema.type_name.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DecodeError::new(format!(
                    "cannot spawn decoder {}: {e}",
                    self.program.display()
                ))
            })?;

        // Feed stdin from a separate thread while draining stdout, or a
        // decoder producing more than a pipe buffer of output deadlocks.
        // A decoder may also exit before reading all of stdin; its exit
        // status is the authoritative report, not the broken pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let payload = bytes.to_vec();
            std::thread::spawn(move || match stdin.write_all(&payload) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|e| DecodeError::new(format!("decoder did not finish: {e}")))?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {},
                Ok(Err(e)) => {
                    return Err(DecodeError::new(format!("cannot feed decoder stdin: {e}")));
                },
                Err(_) => {
                    return Err(DecodeError::new("decoder stdin writer panicked"));
                },
            }
        }
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(DecodeError::new(format!(
                "decoder exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Renderer that writes the decoder's output verbatim as the companion
/// file.
#[derive(Debug, Clone, Copy)]
pub struct FileRenderer;

impl Renderer<Vec<u8>> for FileRenderer {
    fn render(&self, object: &Vec<u8>, out: &Path) -> Result<(), RenderError> {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RenderError::new(format!("cannot create {}: {e}", parent.display())))?;
        }
        fs::write(out, object)
            .map_err(|e| RenderError::new(format!("cannot write {}: {e}", out.display())))
    }
}

#[cfg(test)]
mod tests {
    use sszkit_core::{ForkName, Preset, TypeName};

    use super::*;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor {
            fork: ForkName::new("altair"),
            preset: Preset::Minimal,
            type_name: TypeName::new("BeaconState"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_of_a_successful_decoder() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("decoder.sh");
        fs::write(&script, "#!/bin/sh\n# flags name the schema; echo stdin back\ncat\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let decoder = CommandDecoder::new(&script);
        let out = decoder.decode(b"payload", &schema()).unwrap();
        assert_eq!(out, b"payload");
    }

    #[cfg(unix)]
    #[test]
    fn failing_decoder_surfaces_its_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("decoder.sh");
        fs::write(&script, "#!/bin/sh\necho 'bad offset' >&2\nexit 3\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let decoder = CommandDecoder::new(&script);
        let err = decoder.decode(b"payload", &schema()).unwrap_err();
        assert!(err.to_string().contains("bad offset"));
    }

    #[test]
    fn missing_program_is_a_decode_error() {
        let decoder = CommandDecoder::new("/nonexistent/decoder");
        assert!(decoder.decode(b"", &schema()).is_err());
    }

    #[test]
    fn renderer_writes_the_companion() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("case_0/pre.ssz_snappy.yaml");
        FileRenderer.render(&b"state: {}\n".to_vec(), &out).unwrap();
        assert_eq!(fs::read(out).unwrap(), b"state: {}\n");
    }
}
