//! Inspect and dump GROMACS trr/trj trajectories.
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gmxtrx::{Frame, FrameSelection, OpenOptions, Range, TrxReader, Variant};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Increase the verbosity of diagnostics on stderr. May be repeated.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all diagnostics.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(clap::Args)]
struct Input {
    /// Input path (trr or trj, optionally compressed).
    input: PathBuf,

    /// Expected number of atoms. Opening fails if the trajectory disagrees.
    #[arg(short, long)]
    natoms: Option<usize>,

    /// Read the trajectory as this variant, rather than guessing from the extension.
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Do not compare the block sizes of each frame against the first one.
    #[arg(long)]
    no_check: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    Trr,
    Trj,
}

#[derive(Subcommand)]
enum Command {
    /// Print a summary of the trajectory layout.
    Info {
        #[command(flatten)]
        input: Input,
    },
    /// Print the frames of a trajectory as text.
    Dump {
        #[command(flatten)]
        input: Input,

        /// Frame selection in the format `start:stop:step`. Each of these values optional.
        ///
        /// - `:100` will select the first 100 frames.
        ///
        /// - `3:14` will select the 4th up to and including the 14th frame, 11 frames in total.
        ///
        /// - `:100:2` will select every second frame from the first 100 frames, 50 in total.
        #[arg(short, long)]
        frames: Option<Range>,

        /// Also print velocities, if the trajectory holds them.
        #[arg(long)]
        velocities: bool,
    },
}

fn setup_logging(verbosity: u8, quiet: bool) {
    let level_filter = if quiet {
        LevelFilter::OFF
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(level_filter)
        .with(stderr_layer)
        .init();
}

fn open(input: &Input) -> gmxtrx::Result<TrxReader<Box<dyn gmxtrx::source::Source>>> {
    let mut options = OpenOptions::new().check_consistency(!input.no_check);
    if let Some(natoms) = input.natoms {
        options = options.natoms(natoms);
    }
    if let Some(variant) = input.variant {
        options = options.variant(match variant {
            VariantArg::Trr => Variant::Trr,
            VariantArg::Trj => Variant::Trj,
        });
    }
    options.open(&input.input)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(args.verbose, args.quiet);

    let mut stdout = BufWriter::new(std::io::stdout().lock());
    match args.command {
        Command::Info { input } => {
            let reader = open(&input)?;
            info(&reader, &mut stdout)?;
        }
        Command::Dump {
            input,
            frames,
            velocities,
        } => {
            let mut reader = open(&input)?;
            let selection = frames.map_or(FrameSelection::All, FrameSelection::Range);
            dump(&mut reader, &selection, velocities, &mut stdout)?;
        }
    }
    stdout.flush()?;

    Ok(())
}

fn info<S: gmxtrx::source::Source>(
    reader: &TrxReader<S>,
    out: &mut impl Write,
) -> std::io::Result<()> {
    let header = reader.header();
    writeln!(out, "format:    {}", reader.format())?;
    writeln!(out, "title:     {}", header.title)?;
    writeln!(out, "natoms:    {}", header.natoms)?;
    for (name, size) in header.sizes.named() {
        writeln!(out, "{:<10} {size}", format!("{name}_size:"))?;
    }
    writeln!(out, "stride:    {}", reader.stride())?;
    writeln!(out, "frames:    {}", reader.frame_count())?;
    writeln!(out, "seekable:  {}", reader.is_seekable())?;
    match reader.initial_cell() {
        Some(cell) => writeln!(out, "cell:      {}", join(&cell.to_array()))?,
        None => writeln!(out, "cell:      none")?,
    }
    Ok(())
}

fn dump<S: gmxtrx::source::Source>(
    reader: &mut TrxReader<S>,
    selection: &FrameSelection,
    velocities: bool,
    out: &mut impl Write,
) -> gmxtrx::Result<()> {
    reader.visit_frames(selection, |idx, frame| {
        write_frame(out, idx, frame, velocities)?;
        Ok(())
    })?;
    Ok(())
}

fn write_frame(
    out: &mut impl Write,
    idx: usize,
    frame: &Frame,
    velocities: bool,
) -> std::io::Result<()> {
    writeln!(
        out,
        "frame {idx} step {} dt {} lambda {}",
        frame.step, frame.timestep, frame.lambda
    )?;
    writeln!(out, "cell {}", join(&frame.cell.to_array()))?;
    for pos in frame.coords() {
        writeln!(out, "{:12.4} {:12.4} {:12.4}", pos.x, pos.y, pos.z)?;
    }
    if velocities {
        if let Some(vel) = frame.velocity_vectors() {
            writeln!(out, "velocities")?;
            for v in vel {
                writeln!(out, "{:12.4} {:12.4} {:12.4}", v.x, v.y, v.z)?;
            }
        }
    }
    Ok(())
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.4}"))
        .collect::<Vec<_>>()
        .join(" ")
}
