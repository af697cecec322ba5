#![allow(dead_code)]

//! Build synthetic trr/trj trajectories in memory.

use gmxtrx::{Endianness, Variant};

/// Describes the layout of a synthetic trajectory.
#[derive(Debug, Clone)]
pub struct Builder {
    pub order: Endianness,
    pub variant: Variant,
    /// Bytes per real, 4 or 8.
    pub precision: usize,
    pub natoms: usize,
    pub title: String,
    /// Box vectors in nm, a{xyz} b{xyz} c{xyz}.
    pub boxvec: Option<[f64; 9]>,
    pub virial: bool,
    pub pressure: bool,
    pub positions: bool,
    pub velocities: bool,
    pub forces: bool,
}

impl Builder {
    pub fn new(natoms: usize) -> Self {
        Self {
            order: Endianness::Little,
            variant: Variant::Trr,
            precision: 4,
            natoms,
            title: String::new(),
            boxvec: None,
            virial: false,
            pressure: false,
            positions: true,
            velocities: false,
            forces: false,
        }
    }

    pub fn order(mut self, order: Endianness) -> Self {
        self.order = order;
        self
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn double(mut self) -> Self {
        self.precision = 8;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn boxvec(mut self, boxvec: [f64; 9]) -> Self {
        self.boxvec = Some(boxvec);
        self
    }

    /// Include virial, pressure and force blocks, which the reader must step over.
    pub fn with_extras(mut self) -> Self {
        self.virial = true;
        self.pressure = true;
        self.forces = true;
        self
    }

    pub fn velocities(mut self) -> Self {
        self.velocities = true;
        self
    }

    pub fn without_positions(mut self) -> Self {
        self.positions = false;
        self
    }

    fn atom_block(&self) -> usize {
        self.natoms * 3 * self.precision
    }

    fn tensor_block(&self) -> usize {
        9 * self.precision
    }

    /// The number of bytes of a header.
    pub fn header_nbytes(&self) -> usize {
        let version = match self.variant {
            Variant::Trr => 4,
            Variant::Trj => 0,
        };
        4 + version + 4 + self.title.len() + 13 * 4 + 2 * self.precision
    }

    /// The number of bytes of a frame.
    pub fn stride(&self) -> usize {
        let mut stride = self.header_nbytes();
        if self.boxvec.is_some() {
            stride += self.tensor_block();
        }
        stride += [self.virial, self.pressure]
            .iter()
            .filter(|&&b| b)
            .count()
            * self.tensor_block();
        stride += [self.positions, self.velocities, self.forces]
            .iter()
            .filter(|&&b| b)
            .count()
            * self.atom_block();
        stride
    }

    fn int(&self, bytes: &mut Vec<u8>, v: i32) {
        match self.order {
            Endianness::Little => bytes.extend(v.to_le_bytes()),
            Endianness::Big => bytes.extend(v.to_be_bytes()),
        }
    }

    fn real(&self, bytes: &mut Vec<u8>, v: f64) {
        match (self.precision, self.order) {
            (8, Endianness::Little) => bytes.extend(v.to_le_bytes()),
            (8, Endianness::Big) => bytes.extend(v.to_be_bytes()),
            (_, Endianness::Little) => bytes.extend((v as f32).to_le_bytes()),
            (_, Endianness::Big) => bytes.extend((v as f32).to_be_bytes()),
        }
    }

    fn reals(&self, bytes: &mut Vec<u8>, values: &[f64]) {
        for &v in values {
            self.real(bytes, v);
        }
    }

    /// Encode one frame with the given positions and velocities (both in nm).
    pub fn frame(&self, step: i32, positions: &[f64], velocities: &[f64]) -> Vec<u8> {
        let size = |present: bool, size: usize| if present { size as i32 } else { 0 };
        let mut bytes = Vec::new();
        self.int(&mut bytes, 1993);
        if self.variant == Variant::Trr {
            self.int(&mut bytes, 13);
        }
        self.int(&mut bytes, self.title.len() as i32);
        bytes.extend(self.title.as_bytes());
        let sizes = [
            0,
            0,
            size(self.boxvec.is_some(), self.tensor_block()),
            size(self.virial, self.tensor_block()),
            size(self.pressure, self.tensor_block()),
            0,
            0,
            size(self.positions, self.atom_block()),
            size(self.velocities, self.atom_block()),
            size(self.forces, self.atom_block()),
        ];
        for s in sizes {
            self.int(&mut bytes, s);
        }
        self.int(&mut bytes, self.natoms as i32);
        self.int(&mut bytes, step);
        self.int(&mut bytes, 0);
        self.real(&mut bytes, 0.002 * step as f64);
        self.real(&mut bytes, 0.25);

        if let Some(boxvec) = self.boxvec {
            self.reals(&mut bytes, &boxvec);
        }
        if self.virial {
            self.reals(&mut bytes, &[-1.0; 9]);
        }
        if self.pressure {
            self.reals(&mut bytes, &[-2.0; 9]);
        }
        if self.positions {
            self.reals(&mut bytes, positions);
        }
        if self.velocities {
            self.reals(&mut bytes, velocities);
        }
        if self.forces {
            self.reals(&mut bytes, &vec![-3.0; self.natoms * 3]);
        }
        bytes
    }

    /// Encode `nframes` frames, with the values of [`positions`] and [`velocities`].
    pub fn build(&self, nframes: usize) -> Vec<u8> {
        (0..nframes)
            .flat_map(|i| {
                self.frame(
                    i as i32 * 10,
                    &positions(i, self.natoms),
                    &velocities(i, self.natoms),
                )
            })
            .collect()
    }
}

/// Positions in nm for frame `i`. Every value is exactly representable as an `f32`.
pub fn positions(i: usize, natoms: usize) -> Vec<f64> {
    (0..natoms * 3)
        .map(|j| i as f64 + j as f64 * 0.125)
        .collect()
}

/// Velocities in nm per unit time for frame `i`.
pub fn velocities(i: usize, natoms: usize) -> Vec<f64> {
    (0..natoms * 3)
        .map(|j| -(i as f64) - j as f64 * 0.5)
        .collect()
}

pub fn assert_close(found: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(found.len(), expected.len(), "lengths differ");
    for (i, (f, e)) in found.iter().zip(expected).enumerate() {
        let scale = e.abs().max(1.0);
        assert!(
            (f - e).abs() <= tolerance * scale,
            "value {i} differs: found {f}, expected {e}"
        );
    }
}

/// Convert nm to Å.
pub fn to_angstrom(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v * 10.0).collect()
}
