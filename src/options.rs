use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;
use crate::header::Variant;
use crate::source::{Seekable, Sequential, Source};
use crate::{identify, TrxReader};

/// Options for opening a trajectory.
///
/// ```no_run
/// use gmxtrx::OpenOptions;
///
/// # fn main() -> gmxtrx::Result<()> {
/// let reader = OpenOptions::new().natoms(1024).open("md.trr")?;
/// println!("{}", reader.format());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OpenOptions {
    pub(crate) variant: Option<Variant>,
    pub(crate) natoms: Option<usize>,
    pub(crate) check_consistency: bool,
    pub(crate) parent: Option<tracing::Span>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            variant: None,
            natoms: None,
            check_consistency: true,
            parent: None,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the trajectory as this [`Variant`].
    ///
    /// By default, the variant is taken from the file extension when opening a path, and is
    /// [`Variant::Trr`] otherwise.
    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    /// Require the trajectory to hold exactly `natoms` atoms.
    ///
    /// Opening fails with [`TrxError::AtomCountMismatch`](crate::TrxError::AtomCountMismatch)
    /// otherwise.
    pub fn natoms(mut self, natoms: usize) -> Self {
        self.natoms = Some(natoms);
        self
    }

    /// Whether the block sizes and header size of every frame are compared against the header
    /// the trajectory was opened with. Enabled by default.
    ///
    /// The atom count and precision of every frame are checked regardless.
    pub fn check_consistency(mut self, check: bool) -> Self {
        self.check_consistency = check;
        self
    }

    /// Report the diagnostics of the reader within `span`.
    pub fn parent_span(mut self, span: tracing::Span) -> Self {
        self.parent = Some(span);
        self
    }

    /// Open the trajectory at `path`.
    ///
    /// Plain files are read through a [`Seekable`] source. With the `niffler` feature, files that
    /// do not start with the trr/trj magic number are assumed to be compressed and are read
    /// through a [`Sequential`] source, which does not allow random access.
    pub fn open<P: AsRef<Path>>(mut self, path: P) -> Result<TrxReader<Box<dyn Source>>> {
        let path = path.as_ref();
        if self.variant.is_none() {
            self.variant = Some(Variant::from_path(path));
        }

        let mut file = File::open(path)?;
        let plain = identify(&mut file);
        file.seek(SeekFrom::Start(0))?;
        let reader = BufReader::new(file);

        let source: Box<dyn Source> = if plain {
            Box::new(Seekable::new(reader)?)
        } else {
            Box::new(Sequential::new(decompress(reader)?))
        };
        TrxReader::new(source, self)
    }
}

#[cfg(feature = "niffler")]
fn decompress(reader: BufReader<File>) -> Result<Box<dyn Read>> {
    let (reader, _format) = niffler::send::get_reader(Box::new(reader))?;
    Ok(reader)
}

#[cfg(not(feature = "niffler"))]
fn decompress(reader: BufReader<File>) -> Result<Box<dyn Read>> {
    Ok(Box::new(reader))
}
