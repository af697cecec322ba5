use std::io::Read;
use std::path::Path;

use crate::error::{Result, TrxError};
use crate::reader::{swap_bytes, Endianness, FieldReader, Precision};

/// The trr/trj family of formats.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Versioned variant. A version field follows the magic number.
    #[default]
    Trr,
    /// Simple variant without a version field.
    Trj,
}

impl Variant {
    /// Pick the variant based on the extension of `path`.
    ///
    /// The magic number is shared between both variants, so there is no way to tell them apart
    /// from their contents. Anything that does not end in `.trj` is assumed to be a trr file.
    /// A compression suffix such as `.gz` is looked through.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        const COMPRESSED: [&str; 5] = ["gz", "bz2", "xz", "zst", "lzma"];

        let path = path.as_ref();
        let extension = |path: &Path| {
            let ext = path.extension()?.to_str()?;
            Some(ext.to_ascii_lowercase())
        };
        let mut ext = extension(path);
        if ext.as_deref().is_some_and(|ext| COMPRESSED.contains(&ext)) {
            ext = path.file_stem().and_then(|stem| extension(Path::new(stem)));
        }
        match ext.as_deref() {
            Some("trj") => Self::Trj,
            _ => Self::Trr,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trr => write!(f, "TRR"),
            Self::Trj => write!(f, "TRJ"),
        }
    }
}

/// Everything about the layout of a trajectory that stays fixed while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub variant: Variant,
    pub order: Endianness,
    pub precision: Precision,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let precision = match self.precision {
            Precision::Single => "single",
            Precision::Double => "double",
        };
        write!(f, "GROMACS {} file, {}, {precision} precision", self.variant, self.order)
    }
}

/// Byte sizes of the blocks that may follow a header. A size of zero marks an absent block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockSizes {
    pub ir: usize,
    pub e: usize,
    pub boxvec: usize,
    pub vir: usize,
    pub pres: usize,
    pub top: usize,
    pub sym: usize,
    pub x: usize,
    pub v: usize,
    pub f: usize,
}

impl BlockSizes {
    /// The blocks in on-disk order, along with their names.
    pub fn named(&self) -> [(&'static str, usize); 10] {
        [
            ("ir", self.ir),
            ("e", self.e),
            ("box", self.boxvec),
            ("vir", self.vir),
            ("pres", self.pres),
            ("top", self.top),
            ("sym", self.sym),
            ("x", self.x),
            ("v", self.v),
            ("f", self.f),
        ]
    }

    /// The number of payload bytes that follow a header within one frame.
    ///
    /// The ir, e, top and sym blocks are not part of trajectory frames and do not count.
    pub fn payload(&self) -> usize {
        self.boxvec + self.vir + self.pres + self.x + self.v + self.f
    }
}

/// The header that precedes every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub title: String,
    pub sizes: BlockSizes,
    pub natoms: usize,
    pub step: i32,
    /// Number of energy terms.
    pub nre: i32,
    pub precision: Precision,
    pub timestep: f64,
    /// Coupling parameter.
    pub lambda: f64,
    /// The number of bytes this header occupies on disk.
    pub nbytes: usize,
}

impl Header {
    pub const MAGIC: i32 = 1993;

    /// Read the magic number and determine the byte order it was written in.
    ///
    /// Fails with [`TrxError::NotThisFormat`] if the magic number does not match in either order.
    pub fn read_magic<R: Read>(reader: &mut FieldReader<R>) -> Result<Endianness> {
        let raw = reader.read_raw_i32()?;
        if i32::from_ne_bytes(raw) == Self::MAGIC {
            return Ok(Endianness::native());
        }
        let mut swapped = raw;
        swap_bytes(&mut swapped, 4);
        if i32::from_ne_bytes(swapped) == Self::MAGIC {
            return Ok(Endianness::native().swapped());
        }
        Err(TrxError::NotThisFormat {
            found: i32::from_ne_bytes(raw),
        })
    }

    /// Read a complete header, determining the byte order from its magic number.
    ///
    /// The byte order of `reader` is set to the detected order.
    pub fn read<R: Read>(reader: &mut FieldReader<R>, variant: Variant) -> Result<Self> {
        let start = reader.offset();
        let order = Self::read_magic(reader)?;
        reader.set_order(order);
        Self::read_fields(reader, variant, start)
    }

    /// Read a complete header from a trajectory of which the byte order is already known.
    ///
    /// Fails with [`TrxError::InvalidMagic`] if the magic number does not match in that order.
    pub fn reread<R: Read>(reader: &mut FieldReader<R>, variant: Variant) -> Result<Self> {
        let start = reader.offset();
        let magic = reader.read_int()?;
        if magic != Self::MAGIC {
            return Err(TrxError::InvalidMagic {
                offset: start,
                found: magic,
            });
        }
        Self::read_fields(reader, variant, start)
    }

    fn read_fields<R: Read>(
        reader: &mut FieldReader<R>,
        variant: Variant,
        start: u64,
    ) -> Result<Self> {
        if variant == Variant::Trr {
            let _version = reader.read_int()?;
        }
        let title = reader.read_string()?;

        let mut size = |field: &'static str| -> Result<usize> {
            let size = reader.read_int()?;
            size.try_into()
                .map_err(|_| TrxError::NegativeSize { field, size })
        };
        let sizes = BlockSizes {
            ir: size("ir")?,
            e: size("e")?,
            boxvec: size("box")?,
            vir: size("vir")?,
            pres: size("pres")?,
            top: size("top")?,
            sym: size("sym")?,
            x: size("x")?,
            v: size("v")?,
            f: size("f")?,
        };

        let natoms = reader.read_int()?;
        if natoms < 1 {
            return Err(TrxError::InvalidAtomCount(natoms));
        }
        let natoms = natoms as usize;
        let step = reader.read_int()?;
        let nre = reader.read_int()?;

        let precision = infer_precision(&sizes, natoms)?;
        validate_block_sizes(&sizes, natoms, precision)?;

        let timestep = reader.read_real(precision)?;
        let lambda = reader.read_real(precision)?;

        Ok(Self {
            title,
            sizes,
            natoms,
            step,
            nre,
            precision,
            timestep,
            lambda,
            nbytes: (reader.offset() - start) as usize,
        })
    }

    /// The number of bytes of one frame: this header and the blocks that follow it.
    pub fn stride(&self) -> usize {
        self.nbytes + self.sizes.payload()
    }

    pub fn has_box(&self) -> bool {
        self.sizes.boxvec > 0
    }

    pub fn has_positions(&self) -> bool {
        self.sizes.x > 0
    }

    pub fn has_velocities(&self) -> bool {
        self.sizes.v > 0
    }
}

/// Determine the width of a real from the first present x, v, or f block.
///
/// The precision is not stored in the header, but each of these blocks holds three reals per
/// atom, so its size betrays the width of its reals.
fn infer_precision(sizes: &BlockSizes, natoms: usize) -> Result<Precision> {
    let block = [sizes.x, sizes.v, sizes.f]
        .into_iter()
        .find(|&size| size > 0)
        .ok_or(TrxError::MissingPayloadSize)?;
    let ratio = block / (natoms * 3);
    Precision::try_from(i32::try_from(ratio).unwrap_or(i32::MAX))
}

fn validate_block_sizes(sizes: &BlockSizes, natoms: usize, precision: Precision) -> Result<()> {
    let atom_block = natoms * 3 * precision.nbytes();
    let checks = [
        ("box", sizes.boxvec, 9 * precision.nbytes()),
        ("x", sizes.x, atom_block),
        ("v", sizes.v, atom_block),
    ];
    for (block, found, expected) in checks {
        if found != 0 && found != expected {
            return Err(TrxError::BlockSizeMismatch {
                block,
                expected,
                found,
            });
        }
    }
    Ok(())
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "title= [{}]", self.title)?;
        for (name, size) in self.sizes.named() {
            writeln!(f, "{name}_size= {size}")?;
        }
        writeln!(f, "natoms= {}", self.natoms)?;
        writeln!(f, "step= {}", self.step)?;
        writeln!(f, "nre= {}", self.nre)?;
        writeln!(f, "precision= {}", self.precision.nbytes())?;
        writeln!(f, "dt= {}", self.timestep)?;
        write!(f, "lambda= {}", self.lambda)
    }
}
