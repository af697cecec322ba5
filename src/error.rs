//! Errors that can occur while identifying or reading a trr/trj trajectory.

use thiserror::Error;

/// A specialized `Result` type for trajectory operations.
pub type Result<T> = std::result::Result<T, TrxError>;

#[derive(Error, Debug)]
pub enum TrxError {
    /// I/O error from the underlying reader.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Failure to set up decompression for a compressed trajectory.
    #[cfg(feature = "niffler")]
    #[error("Niffler error")]
    Niffler(#[from] niffler::Error),

    /// The leading magic number is not 1993 in either byte order.
    ///
    /// This is the expected answer when probing a file of some other format.
    #[error("not a trr/trj file, found magic number {found} ({found:#x})")]
    NotThisFormat { found: i32 },

    /// A frame header that does not start with the magic number in the byte order of the file.
    #[error("invalid magic number {found} ({found:#x}) at byte {offset}")]
    InvalidMagic { offset: u64, found: i32 },

    /// Fewer bytes were available than a field declared.
    #[error("truncated read at byte {offset}, expected {expected} bytes, found {actual}")]
    TruncatedRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// A frame ended before all of its declared blocks could be read.
    #[error(
        "truncated frame {frame} at byte {offset}, expected {expected} bytes, found {actual}"
    )]
    TruncatedFrame {
        frame: usize,
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("invalid atom count {0}, a trajectory must hold at least one atom")]
    InvalidAtomCount(i32),

    /// The byte width of a real is neither 4 nor 8.
    #[error("unsupported precision of {0} bytes per real (must be 4 or 8)")]
    UnsupportedPrecision(i32),

    /// None of the coordinate, velocity and force blocks are present.
    #[error("the header declares no coordinate, velocity or force block")]
    MissingPayloadSize,

    #[error("negative size {size} for {field}")]
    NegativeSize { field: &'static str, size: i32 },

    /// A block does not have the size its contents require.
    #[error("{block} block holds {found} bytes, expected {expected}")]
    BlockSizeMismatch {
        block: &'static str,
        expected: usize,
        found: usize,
    },

    /// The trajectory atom count disagrees with the caller's topology.
    #[error("trajectory holds {found} atoms, but {expected} were expected")]
    AtomCountMismatch { expected: usize, found: usize },

    /// A frame header disagrees with the header the trajectory was opened with.
    #[error("frame {frame} has {field} {found}, but the trajectory was opened with {expected}")]
    InconsistentHeader {
        frame: usize,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// Random access was requested on a trajectory that can only be read in order.
    #[error("cannot seek to frame {requested} of a sequential trajectory, next is {next}")]
    NotSeekable { requested: usize, next: usize },

    #[error("writing trr/trj trajectories is not implemented")]
    WriteUnsupported,
}

impl TrxError {
    /// Whether this error is a short read of any kind.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            TrxError::TruncatedRead { .. } | TrxError::TruncatedFrame { .. }
        )
    }

    /// Attach the frame index to a short read that happened while reading that frame.
    pub(crate) fn in_frame(self, frame: usize) -> Self {
        match self {
            TrxError::TruncatedRead {
                offset,
                expected,
                actual,
            } => TrxError::TruncatedFrame {
                frame,
                offset,
                expected,
                actual,
            },
            other => other,
        }
    }
}
