//! Command line font converter
//!
//! Either converts one font described by flags, or runs one job per project
//! file, in parallel.

use std::{error::Error as _, io::Write, path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser};
use rayon::prelude::*;

use lvfontconv::{
    range::{expand, parse_ranges, parse_symbols},
    CliError, Job, JobFont, Project,
};
use write_lvfont::{
    tables::head::{Compression, SubpixelMode},
    types::Bpp,
    ConvertOptions, LvglVersion, Progress, Stage,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// A source font file; repeat to stack fonts
    #[arg(long = "font", value_name = "FILE")]
    fonts: Vec<PathBuf>,

    /// Codepoints to convert, e.g. 0x20-0x7F,0xB0,cyrillic,0xE000=>0xF000
    #[arg(short, long, value_name = "RANGES")]
    range: Vec<String>,

    /// Characters to convert
    #[arg(long)]
    symbols: Vec<String>,

    /// Font size in pixels
    #[arg(long, default_value_t = 16)]
    size: u16,

    /// Bits per pixel: 1, 2, 3, 4 or 8
    #[arg(long, default_value_t = Bpp::Four, value_parser = parse_bpp)]
    bpp: Bpp,

    /// Bitmap compression [default: rle, or none with 8 bpp]
    #[arg(long, value_name = "none|rle|rle-no-prefilter")]
    compression: Option<Compression>,

    /// Store bitmaps uncompressed
    #[arg(long, conflicts_with_all = ["compression", "no_prefilter"])]
    no_compress: bool,

    /// Compress without the XOR prefilter
    #[arg(long, conflicts_with = "compression")]
    no_prefilter: bool,

    /// Leave out kerning
    #[arg(long)]
    no_kerning: bool,

    /// Always store kerning as a class matrix
    #[arg(long)]
    force_fast_kern: bool,

    /// Horizontal sub-pixel rendering
    #[arg(long, conflicts_with = "lcd_v")]
    lcd: bool,

    /// Vertical sub-pixel rendering
    #[arg(long)]
    lcd_v: bool,

    /// The LVGL major version to target
    #[arg(long, default_value_t = LvglVersion::V9, value_parser = parse_version)]
    lvgl_version: LvglVersion,

    /// Include path for lvgl.h
    #[arg(long, value_name = "PATH")]
    lv_include: Option<String>,

    /// An lv_font_t to use for missing glyphs
    #[arg(long, value_name = "NAME")]
    fallback: Option<String>,

    /// The C name of the font [default: output file stem]
    #[arg(long)]
    name: Option<String>,

    /// The output C file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// A JSON project file; repeat to run several jobs
    #[arg(long, value_name = "FILE", conflicts_with_all = ["fonts", "output"])]
    project: Vec<PathBuf>,

    /// Maximum number of jobs run at once
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Print progress to stderr
    #[arg(long)]
    progress: bool,

    /// Increase logging; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_bpp(s: &str) -> Result<Bpp, String> {
    let raw: u8 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    Bpp::try_from(raw).map_err(|err| err.to_string())
}

fn parse_version(s: &str) -> Result<LvglVersion, String> {
    let raw: u8 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    LvglVersion::try_from(raw).map_err(|err| err.to_string())
}

impl Args {
    fn options(&self) -> ConvertOptions {
        let compression = if self.no_compress {
            Compression::None
        } else if self.no_prefilter {
            Compression::RleNoPrefilter
        } else {
            self.compression.unwrap_or(if self.bpp == Bpp::Eight {
                Compression::None
            } else {
                Compression::Rle
            })
        };
        let subpixel = if self.lcd {
            SubpixelMode::Horizontal
        } else if self.lcd_v {
            SubpixelMode::Vertical
        } else {
            SubpixelMode::None
        };
        ConvertOptions {
            size: self.size,
            bpp: self.bpp,
            compression,
            kerning: !self.no_kerning,
            force_fast_kern: self.force_fast_kern,
            subpixel,
            lvgl_version: self.lvgl_version,
            lv_include: self.lv_include.clone(),
            fallback: self.fallback.clone(),
        }
    }

    /// The single job described by flags.
    fn flag_job(&self) -> Result<Job, CliError> {
        if self.fonts.is_empty() {
            return Err(CliError::Usage("expected --font or --project"));
        }
        let output = self
            .output
            .clone()
            .ok_or(CliError::Usage("--output is required with --font"))?;
        let name = match &self.name {
            Some(name) => name.clone(),
            None => output
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| stem.replace(['-', '.', ' '], "_"))
                .ok_or(CliError::Usage("cannot derive a font name, use --name"))?,
        };
        let mut ranges = Vec::new();
        for range in &self.range {
            ranges.extend(parse_ranges(range)?);
        }
        for symbols in &self.symbols {
            ranges.extend(parse_symbols(symbols));
        }
        if ranges.is_empty() {
            return Err(CliError::Usage("expected --range or --symbols"));
        }
        let mappings = expand(&ranges);
        Ok(Job {
            name,
            output,
            options: self.options(),
            fonts: self
                .fonts
                .iter()
                .map(|path| JobFont {
                    path: path.clone(),
                    mappings: mappings.clone(),
                })
                .collect(),
        })
    }

    fn build_jobs(&self) -> Result<Vec<Job>, CliError> {
        if self.project.is_empty() {
            return Ok(vec![self.flag_job()?]);
        }
        self.project
            .iter()
            .map(|path| Project::load(path)?.into_job())
            .collect()
    }
}

fn report_progress(name: &str, progress: Progress) {
    let stage = match progress.stage {
        Stage::Rasterize => "rasterize",
        Stage::Kerning => "kerning",
        Stage::Assemble => "assemble",
        Stage::Validate => "validate",
    };
    if progress.current == progress.total || progress.current % 64 == 0 {
        writeln!(
            std::io::stderr(),
            "{name}: {stage} {}/{}",
            progress.current,
            progress.total
        )
        .ok();
    }
}

fn main() -> ExitCode {
    let args = Args::parse_from(wild::args());

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let jobs = match args.build_jobs() {
        Ok(jobs) => jobs,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = args.jobs {
        pool = pool.num_threads(threads);
    }
    let pool = match pool.build() {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let show_progress = args.progress;
    let results: Vec<_> = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let name = job.name.clone();
                job.run(move |progress| {
                    if show_progress {
                        report_progress(&name, progress);
                    }
                })
            })
            .collect()
    });

    let mut failed = false;
    for result in results {
        match result {
            Ok(summary) => log::info!(
                "{}: {} glyphs, {} bitmap bytes",
                summary.output.display(),
                summary.glyphs,
                summary.bitmap_bytes
            ),
            Err(err) => {
                failed = true;
                eprintln!("error: {err}");
                let mut source = err.source();
                while let Some(cause) = source {
                    eprintln!("  caused by: {cause}");
                    source = cause.source();
                }
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
