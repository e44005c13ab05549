//! File adapter: turns command-line paths into byte sources and sinks.
//!
//! `-` stands for stdin/stdout. Sinks backed by a file can be discarded, which
//! removes the file so a failed run leaves no half-written output behind.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

const STDIO: &str = "-";

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}

/// Open `path` (or stdin) for reading.
pub fn open_source(path: &Path) -> Result<Box<dyn Read>> {
    if is_stdio(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)
        .with_context(|| format!("cannot open file for given path {}", path.display()))?;
    Ok(Box::new(file))
}

/// Where transformed bytes go.
///
/// A file sink opens (and truncates) its path on the first write, so nothing
/// on disk changes until the whole input has been read and transformed. This
/// also makes `-i f -o f` rewrite `f` in place.
pub enum Sink {
    Stdout(BufWriter<io::Stdout>),
    File {
        path: PathBuf,
        file: Option<BufWriter<File>>,
    },
}

/// Sink for `path` (or stdout). The file is not touched until written.
pub fn create_sink(path: &Path) -> Result<Sink> {
    if is_stdio(path) {
        return Ok(Sink::Stdout(BufWriter::new(io::stdout())));
    }
    Ok(Sink::File {
        path: path.to_path_buf(),
        file: None,
    })
}

impl Sink {
    /// Drop the sink and delete its file if this sink created or truncated it.
    pub fn discard(self) {
        if let Sink::File {
            path,
            file: Some(file),
        } = self
        {
            drop(file);
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), "could not remove partial output: {e}");
            }
        }
    }

    fn file<'s>(
        path: &Path,
        slot: &'s mut Option<BufWriter<File>>,
    ) -> io::Result<&'s mut BufWriter<File>> {
        if slot.is_none() {
            let file = File::create(path).map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("cannot create file for given path {}: {e}", path.display()),
                )
            })?;
            *slot = Some(BufWriter::new(file));
        }
        slot.as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "output file not open"))
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout(out) => out.write(buf),
            Sink::File { path, file } => Self::file(path, file)?.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout(out) => out.flush(),
            Sink::File { file: Some(file), .. } => file.flush(),
            Sink::File { file: None, .. } => Ok(()),
        }
    }
}

/// Read a key file into memory that is wiped on drop.
pub fn read_key(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    std::fs::read(path)
        .map(Zeroizing::new)
        .with_context(|| format!("reading private key {}", path.display()))
}

/// Write a private key readable only by the owner (or to stdout).
pub fn write_private_key(path: &Path, pem: &[u8], overwrite: bool) -> Result<()> {
    if is_stdio(path) {
        let mut out = io::stdout().lock();
        out.write_all(pem).context("writing key to stdout")?;
        return out.flush().context("writing key to stdout");
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).with_context(|| {
        if !overwrite && path.exists() {
            format!("{} already exists (use --force to overwrite)", path.display())
        } else {
            format!("creating key file {}", path.display())
        }
    })?;
    file.write_all(pem)
        .and_then(|_| file.flush())
        .with_context(|| format!("writing key file {}", path.display()))
}
