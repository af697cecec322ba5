use std::io::Cursor;

use bencher::{benchmark_group, benchmark_main, Bencher};
use gmxtrx::{
    reader::{Endianness, FieldReader, Precision},
    source::{Seekable, Sequential},
    Frame, FrameSelection, OpenOptions, TrxReader,
};

#[path = "../tests/common/mod.rs"]
mod common;
use common::Builder;

benchmark_main!(reading, decoding);
benchmark_group!(
    reading,
    read_frame,
    read_frame_double,
    read_frames,
    read_frames_sequential,
    read_frames_strided
);
benchmark_group!(decoding, read_reals_single, read_reals_swapped);

const NATOMS: usize = 10_000;
const NFRAMES: usize = 20;

fn trajectory(builder: Builder) -> Vec<u8> {
    builder
        .boxvec([8.0, 0.0, 0.0, 0.0, 8.0, 0.0, 0.0, 0.0, 8.0])
        .velocities()
        .with_extras()
        .build(NFRAMES)
}

fn open(bytes: &[u8]) -> TrxReader<Seekable<Cursor<&[u8]>>> {
    let source = Seekable::new(Cursor::new(bytes)).unwrap();
    TrxReader::new(source, OpenOptions::new()).unwrap()
}

fn read_frame(b: &mut Bencher) {
    let bytes = trajectory(Builder::new(NATOMS));
    let mut reader = open(&bytes);
    let mut frame = Frame::default();
    b.iter(|| {
        if !reader.read_frame(&mut frame).unwrap() {
            reader.home().unwrap();
        }
    });
}

fn read_frame_double(b: &mut Bencher) {
    let bytes = trajectory(Builder::new(NATOMS).double());
    let mut reader = open(&bytes);
    let mut frame = Frame::default();
    b.iter(|| {
        if !reader.read_frame(&mut frame).unwrap() {
            reader.home().unwrap();
        }
    });
}

fn read_frames(b: &mut Bencher) {
    let bytes = trajectory(Builder::new(NATOMS));
    let mut reader = open(&bytes);
    let mut frames = Vec::new();
    b.iter(|| {
        frames.clear();
        reader.home().unwrap();
        reader.read_frames(&mut frames, &FrameSelection::All).unwrap();
    });
}

fn read_frames_sequential(b: &mut Bencher) {
    let bytes = trajectory(Builder::new(NATOMS));
    let mut frames = Vec::new();
    b.iter(|| {
        frames.clear();
        let source = Sequential::new(&bytes[..]);
        let mut reader = TrxReader::new(source, OpenOptions::new()).unwrap();
        reader.read_frames(&mut frames, &FrameSelection::All).unwrap();
    });
}

fn read_frames_strided(b: &mut Bencher) {
    let bytes = trajectory(Builder::new(NATOMS));
    let mut reader = open(&bytes);
    let selection = FrameSelection::Range("::4".parse().unwrap());
    let mut frames = Vec::new();
    b.iter(|| {
        frames.clear();
        reader.read_frames(&mut frames, &selection).unwrap();
    });
}

fn read_reals(b: &mut Bencher, order: Endianness) {
    let values = common::positions(1, NATOMS);
    let bytes: Vec<u8> = values
        .iter()
        .flat_map(|&v| match order {
            Endianness::Little => (v as f32).to_le_bytes(),
            Endianness::Big => (v as f32).to_be_bytes(),
        })
        .collect();
    let mut out = vec![0.0; values.len()];
    let mut scratch = Vec::new();
    b.iter(|| {
        let mut cursor = Cursor::new(&bytes[..]);
        let mut reader = FieldReader::new(&mut cursor, order, 0);
        reader
            .read_reals(Precision::Single, &mut out, &mut scratch, 10.0)
            .unwrap();
    });
    b.bytes = bytes.len() as u64;
}

fn read_reals_single(b: &mut Bencher) {
    read_reals(b, Endianness::native())
}

fn read_reals_swapped(b: &mut Bencher) {
    read_reals(b, Endianness::native().swapped())
}
