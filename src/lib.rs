//! A reader for the GROMACS trr and trj trajectory formats.
//!
//! The byte order and precision of a trajectory are detected from its first header. Frames can
//! be read in order, or, if every frame occupies the same number of bytes, by index.
//!
//! ```no_run
//! use gmxtrx::{Frame, TrxReader};
//!
//! # fn main() -> gmxtrx::Result<()> {
//! let mut reader = TrxReader::open("md.trr")?;
//! let mut frame = Frame::default();
//! while reader.read_frame(&mut frame)? {
//!     println!("step {} with box {:?}", frame.step, frame.cell.to_array());
//! }
//! # Ok(())
//! # }
//! ```
use std::io::Read;
use std::path::Path;

use glam::DVec3;
use tracing::{debug, trace, warn};

pub use crate::cell::{BoxVec, UnitCell};
pub use crate::error::{Result, TrxError};
pub use crate::header::{BlockSizes, Format, Header, Variant};
pub use crate::options::OpenOptions;
pub use crate::reader::{Endianness, Precision};
pub use crate::selection::{FrameSelection, Range};
use crate::reader::FieldReader;
use crate::source::Source;

pub mod cell;
pub mod error;
pub mod header;
mod options;
pub mod reader;
pub mod selection;
pub mod source;

#[derive(Debug, Default, Clone)]
pub struct Frame {
    pub step: i32,
    /// Time step of the simulation.
    pub timestep: f64,
    /// Coupling parameter.
    pub lambda: f64,
    /// The box vectors in nanometers, as they are stored.
    pub boxvec: BoxVec,
    pub cell: UnitCell,
    /// Positions in Ångström, three values per atom.
    pub positions: Vec<f64>,
    /// Velocities in Ångström per unit time, three values per atom, if the trajectory holds them.
    pub velocities: Option<Vec<f64>>,
}

impl Frame {
    pub fn natoms(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn coords(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.positions.chunks_exact(3).map(DVec3::from_slice)
    }

    pub fn velocity_vectors(&self) -> Option<impl Iterator<Item = DVec3> + '_> {
        Some(self.velocities.as_ref()?.chunks_exact(3).map(DVec3::from_slice))
    }
}

/// How many frames a trajectory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCount {
    /// The file size is a multiple of the frame size.
    Exact(usize),
    /// The file size is not a multiple of the frame size, so this many whole frames fit.
    Estimate(usize),
    /// The file size is not known, such as for compressed trajectories.
    Unknown,
}

impl FrameCount {
    pub fn get(self) -> Option<usize> {
        match self {
            Self::Exact(n) | Self::Estimate(n) => Some(n),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for FrameCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::Estimate(n) => write!(f, "~{n}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Determine whether `reader` starts with the trr/trj magic number, in either byte order.
///
/// Any error while reading counts as a negative answer.
pub fn identify<R: Read>(reader: &mut R) -> bool {
    let mut reader = FieldReader::new(reader, Endianness::native(), 0);
    Header::read_magic(&mut reader).is_ok()
}

/// Determine whether the file at `path` is a trr/trj trajectory.
pub fn identify_path<P: AsRef<Path>>(path: P) -> bool {
    match std::fs::File::open(path) {
        Ok(mut file) => identify(&mut file),
        Err(_) => false,
    }
}

/// Writing trr/trj trajectories is not supported. Always fails with
/// [`TrxError::WriteUnsupported`].
pub fn write_frame<W: std::io::Write>(_writer: &mut W, _frame: &Frame) -> Result<()> {
    Err(TrxError::WriteUnsupported)
}

/// A frame of which the header and box have been read already, while opening.
#[derive(Debug)]
struct Pending {
    header: Header,
    boxvec: BoxVec,
}

/// Reads frames from a trr/trj trajectory.
pub struct TrxReader<S> {
    source: S,
    format: Format,
    /// The header the trajectory was opened with.
    header: Header,
    /// Offset of the first frame in the source.
    start: u64,
    stride: u64,
    nframes: FrameCount,
    seekable: bool,
    initial_cell: Option<UnitCell>,
    check_consistency: bool,
    /// Index of the frame that a sequential read will return.
    next: usize,
    pending: Option<Pending>,
    /// Staging area for converting reals to `f64`.
    scratch: Vec<u8>,
    span: tracing::Span,
}

// A `Source` need not implement `Debug`.
impl<S> std::fmt::Debug for TrxReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrxReader")
            .field("format", &self.format)
            .field("natoms", &self.header.natoms)
            .field("start", &self.start)
            .field("stride", &self.stride)
            .field("nframes", &self.nframes)
            .field("seekable", &self.seekable)
            .field("next", &self.next)
            .finish_non_exhaustive()
    }
}

impl TrxReader<Box<dyn Source>> {
    /// Open the trajectory at `path` with the default [`OpenOptions`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        OpenOptions::new().open(path)
    }
}

impl<S: Source> TrxReader<S> {
    /// Set up a reader on `source`, of which the cursor must sit at the start of the trajectory.
    ///
    /// Reads the first header to establish the [`Format`] and the frame stride. If the frames
    /// hold a box, the first one is read as well.
    pub fn new(mut source: S, options: OpenOptions) -> Result<Self> {
        let variant = options.variant.unwrap_or_default();
        let span = match &options.parent {
            Some(parent) => tracing::debug_span!(parent: parent, "trx", %variant),
            None => tracing::debug_span!("trx", %variant),
        };
        let _guard = span.enter();

        let len = source.byte_len()?;
        let can_seek = source.can_seek();
        let start = source.position();
        let mut reader = FieldReader::new(&mut source, Endianness::native(), start);
        let header = Header::read(&mut reader, variant)?;
        let format = Format {
            variant,
            order: reader.order(),
            precision: header.precision,
        };
        debug!("opened {format}\n{header}");

        if let Some(expected) = options.natoms {
            if expected != header.natoms {
                return Err(TrxError::AtomCountMismatch {
                    expected,
                    found: header.natoms,
                });
            }
        }

        let stride = header.stride() as u64;
        let (nframes, seekable) = match len.map(|len| len.saturating_sub(start)) {
            Some(len) if len % stride == 0 => {
                (FrameCount::Exact((len / stride) as usize), can_seek)
            }
            Some(len) => {
                let n = (len / stride) as usize;
                warn!(
                    "the number of frames could not be accurately determined, \
                    will attempt to read {n} frames"
                );
                (FrameCount::Estimate(n), false)
            }
            None => {
                warn!("the size of the trajectory is unknown, frames will be read until the end");
                (FrameCount::Unknown, false)
            }
        };
        debug!(stride, %nframes, seekable);

        let boxvec = if header.has_box() {
            let mut scratch = Vec::new();
            read_boxvec(&mut reader, format.precision, &mut scratch)?
        } else {
            BoxVec::ZERO
        };
        let initial_cell = header.has_box().then(|| UnitCell::from_basis(&boxvec));

        let scratch = Vec::with_capacity(header.natoms * 3 * format.precision.nbytes());
        drop(_guard);
        Ok(Self {
            source,
            format,
            header: header.clone(),
            start,
            stride,
            nframes,
            seekable,
            initial_cell,
            check_consistency: options.check_consistency,
            next: 0,
            pending: Some(Pending { header, boxvec }),
            scratch,
            span,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The header of the first frame.
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn natoms(&self) -> usize {
        self.header.natoms
    }

    pub fn has_velocities(&self) -> bool {
        self.header.has_velocities()
    }

    /// The number of bytes taken up by each frame.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn frame_count(&self) -> FrameCount {
        self.nframes
    }

    /// Whether frames can be read in any order.
    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    /// The cell of the first frame, if the frames hold a box.
    pub fn initial_cell(&self) -> Option<UnitCell> {
        self.initial_cell
    }

    /// The absolute byte offset of the cursor in the source.
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// Close the trajectory, handing back its source.
    pub fn close(self) -> S {
        self.source
    }

    /// Reads the next frame into `frame` and advances one step.
    ///
    /// Returns `false`, leaving `frame` untouched, if there are no frames left.
    pub fn read_frame(&mut self, frame: &mut Frame) -> Result<bool> {
        self.read_frame_at(self.next, frame)
    }

    /// Reads the frame at `index` into `frame`.
    ///
    /// Frames can be read in any order if the trajectory [is seekable][`Self::is_seekable`].
    /// Otherwise, `index` must be the index of the next frame.
    ///
    /// Returns `false`, leaving `frame` untouched, if `index` lies beyond the last frame.
    ///
    /// # Errors
    ///
    /// A frame that ends prematurely is reported as [`TrxError::TruncatedFrame`]. A trajectory
    /// that ends exactly at a frame boundary is not an error.
    pub fn read_frame_at(&mut self, index: usize, frame: &mut Frame) -> Result<bool> {
        let span = self.span.clone();
        let _guard = span.enter();

        let header = if self.seekable {
            if let FrameCount::Exact(n) = self.nframes {
                if index >= n {
                    return Ok(false);
                }
            }
            // The first frame was read while opening, but there is no need to keep it around
            // if we can just go back.
            self.pending = None;
            self.source.seek_to(self.start + index as u64 * self.stride)?;
            match self.read_header(index)? {
                Some(header) => header,
                None => return Ok(false),
            }
        } else {
            if index != self.next {
                return Err(TrxError::NotSeekable {
                    requested: index,
                    next: self.next,
                });
            }
            match self.pending.take() {
                Some(Pending { header, boxvec }) => {
                    self.read_payload(index, &header, Some(boxvec), frame)?;
                    self.next = index + 1;
                    return Ok(true);
                }
                None => match self.read_header(index)? {
                    Some(header) => header,
                    None => return Ok(false),
                },
            }
        };

        self.read_payload(index, &header, None, frame)?;
        self.next = index + 1;
        Ok(true)
    }

    /// Read the header at the cursor, or `None` if the trajectory ends right here.
    fn read_header(&mut self, index: usize) -> Result<Option<Header>> {
        let offset = self.source.position();
        let mut reader = FieldReader::new(&mut self.source, self.format.order, offset);
        let header = match Header::reread(&mut reader, self.format.variant) {
            Ok(header) => header,
            Err(TrxError::TruncatedRead { actual: 0, offset: o, .. }) if o == offset => {
                trace!(index, offset, "reached the end of the trajectory");
                return Ok(None);
            }
            Err(err) => return Err(err.in_frame(index)),
        };

        self.check_header(index, &header)?;
        Ok(Some(header))
    }

    /// Compare a frame header against the header the trajectory was opened with.
    ///
    /// The atom count and precision are always compared. The remaining sizes only if
    /// consistency checking is enabled.
    fn check_header(&self, frame: usize, header: &Header) -> Result<()> {
        let opened = &self.header;
        let inconsistent = |field, expected, found| TrxError::InconsistentHeader {
            frame,
            field,
            expected,
            found,
        };
        if header.natoms != opened.natoms {
            return Err(inconsistent("natoms", opened.natoms, header.natoms));
        }
        if header.precision != opened.precision {
            return Err(inconsistent(
                "precision",
                opened.precision.nbytes(),
                header.precision.nbytes(),
            ));
        }
        if !self.check_consistency {
            return Ok(());
        }
        if header.nbytes != opened.nbytes {
            return Err(inconsistent("header size", opened.nbytes, header.nbytes));
        }
        let blocks = opened.sizes.named().into_iter().zip(header.sizes.named());
        for ((field, expected), (_, found)) in blocks {
            if expected != found {
                return Err(inconsistent(field, expected, found));
            }
        }
        Ok(())
    }

    /// Read the blocks following `header` into `frame`.
    ///
    /// If the box of this frame has been read already, it is passed as `boxvec`.
    fn read_payload(
        &mut self,
        index: usize,
        header: &Header,
        boxvec: Option<BoxVec>,
        frame: &mut Frame,
    ) -> Result<()> {
        let sizes = header.sizes;
        let precision = self.format.precision;
        let natom3 = header.natoms * 3;

        let offset = self.source.position();
        let mut reader = FieldReader::new(&mut self.source, self.format.order, offset);
        let boxvec = match boxvec {
            Some(boxvec) => boxvec,
            None if header.has_box() => read_boxvec(&mut reader, precision, &mut self.scratch)
                .map_err(|e| e.in_frame(index))?,
            None => BoxVec::ZERO,
        };

        // The virial and pressure tensors are not of interest.
        skip(&mut self.source, (sizes.vir + sizes.pres) as u64, index)?;

        let offset = self.source.position();
        let mut reader = FieldReader::new(&mut self.source, self.format.order, offset);
        frame.positions.resize(natom3, 0.0);
        if header.has_positions() {
            reader
                .read_reals(precision, &mut frame.positions, &mut self.scratch, cell::ANGS_PER_NM)
                .map_err(|e| e.in_frame(index))?;
        } else {
            frame.positions.fill(0.0);
        }
        if header.has_velocities() {
            let velocities = frame.velocities.get_or_insert_with(Vec::new);
            velocities.resize(natom3, 0.0);
            reader
                .read_reals(precision, velocities, &mut self.scratch, cell::ANGS_PER_NM)
                .map_err(|e| e.in_frame(index))?;
        } else {
            frame.velocities = None;
        }

        // The next read of a seekable trajectory starts from an absolute offset anyway.
        if !self.seekable {
            skip(&mut self.source, sizes.f as u64, index)?;
        }

        frame.step = header.step;
        frame.timestep = header.timestep;
        frame.lambda = header.lambda;
        frame.boxvec = boxvec;
        frame.cell = if header.has_box() {
            UnitCell::from_basis(&boxvec)
        } else {
            UnitCell::DEGENERATE
        };
        trace!(index, step = header.step, "read frame");

        Ok(())
    }

    /// Return to the first frame.
    ///
    /// Only possible for a seekable trajectory, or one that has not been read from yet.
    pub fn home(&mut self) -> Result<()> {
        if self.seekable || self.next == 0 {
            self.next = 0;
            return Ok(());
        }
        Err(TrxError::NotSeekable {
            requested: 0,
            next: self.next,
        })
    }

    /// A convenience function to read all remaining frames in a trajectory.
    pub fn read_all_frames(&mut self) -> Result<Box<[Frame]>> {
        let mut frames = Vec::new();
        loop {
            let mut frame = Frame::default();
            if !self.read_frame(&mut frame)? {
                break;
            }
            frames.push(frame);
        }
        Ok(frames.into_boxed_slice())
    }

    /// Append [`Frame`]s to the `frames` buffer according to a [`FrameSelection`].
    ///
    /// If successful, it will return the number of frames that were read.
    pub fn read_frames(
        &mut self,
        frames: &mut impl Extend<Frame>,
        frame_selection: &FrameSelection,
    ) -> Result<usize> {
        self.visit_frames(frame_selection, |_, frame| {
            frames.extend(Some(frame.clone()));
            Ok(())
        })
    }

    /// Call `visit` with the index and contents of every frame in a [`FrameSelection`], in
    /// ascending order. Returns the number of frames visited.
    ///
    /// A seekable trajectory jumps straight to the selected frames. Otherwise all frames up to
    /// the last selected one are read, starting from the next frame.
    pub fn visit_frames<F>(
        &mut self,
        frame_selection: &FrameSelection,
        mut visit: F,
    ) -> Result<usize>
    where
        F: FnMut(usize, &Frame) -> Result<()>,
    {
        let mut frame = Frame::default();
        let mut n = 0;
        if self.seekable {
            let nframes = self.nframes.get().unwrap_or_default();
            for idx in frame_selection.indices(nframes) {
                if !self.read_frame_at(idx, &mut frame)? {
                    break;
                }
                visit(idx, &frame)?;
                n += 1;
            }
            return Ok(n);
        }

        loop {
            let idx = self.next;
            let Some(included) = frame_selection.is_included(idx) else {
                break;
            };
            if !self.read_frame(&mut frame)? {
                break;
            }
            if included {
                visit(idx, &frame)?;
                n += 1;
            }
        }
        Ok(n)
    }
}

fn read_boxvec<R: Read>(
    reader: &mut FieldReader<R>,
    precision: Precision,
    scratch: &mut Vec<u8>,
) -> Result<BoxVec> {
    let mut xyz = [0.0; 9];
    reader.read_reals(precision, &mut xyz, scratch, 1.0)?;
    Ok(cell::boxvec_from_components(&xyz))
}

/// Skip `n` bytes of frame `index`.
fn skip<S: Source>(source: &mut S, n: u64, index: usize) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    let offset = source.position();
    let passed = source.skip(n)?;
    if passed < n {
        return Err(TrxError::TruncatedFrame {
            frame: index,
            offset,
            expected: n as usize,
            actual: passed as usize,
        });
    }
    Ok(())
}
