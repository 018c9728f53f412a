extern crate clap;
extern crate env_logger;
extern crate image;
extern crate mandelband;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use image::png::PNGEncoder;
use image::ColorType;
use mandelband::{Dispatch, MemoryRegime, Renderer, RendererConfig, ViewRect};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LOWERLEFT: &str = "lower-left";
const UPPERRIGHT: &str = "upper-right";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const COPYBACK: &str = "copy-back";
const INTERLEAVED: &str = "interleaved";
const BENCH: &str = "bench";

const BENCH_WARMUP: usize = 3;

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get().max(1);

    App::new("mandel")
        .version("0.1.0")
        .about("Chunked parallel Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PNG file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1024")
                .validator(|s| {
                    validate_range(
                        &s,
                        1usize,
                        16384,
                        "Could not parse frame side",
                        "Frame side must be between 1 and 16384",
                    )
                })
                .help("Side length of the square output image, in pixels"),
        )
        .arg(
            Arg::with_name(LOWERLEFT)
                .required(false)
                .long(LOWERLEFT)
                .short("l")
                .takes_value(true)
                .default_value("-2,-1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse lower left corner"))
                .help("Lower left corner of the view rectangle"),
        )
        .arg(
            Arg::with_name(UPPERRIGHT)
                .required(false)
                .long(UPPERRIGHT)
                .short("u")
                .takes_value(true)
                .default_value("1,1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse upper right corner"))
                .help("Upper right corner of the view rectangle"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of compute workers; defaults to the detected core count"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1u32,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Iteration bound per pixel"),
        )
        .arg(
            Arg::with_name(COPYBACK)
                .required(false)
                .long(COPYBACK)
                .help("Use the copy-back memory regime instead of the shared frame buffer"),
        )
        .arg(
            Arg::with_name(INTERLEAVED)
                .required(false)
                .long(INTERLEAVED)
                .help("Pre-assign chunks round-robin instead of pull-based rebalancing"),
        )
        .arg(
            Arg::with_name(BENCH)
                .required(false)
                .long(BENCH)
                .short("b")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1usize,
                        1000,
                        "Could not parse benchmark round count",
                        "Benchmark round count must be between 1 and 1000",
                    )
                })
                .help("Skip image output; render the rectangle this many measured times"),
        )
        .get_matches()
}

fn write_png(outfile: &str, pixels: &[u8], side: usize) -> Result<(), std::io::Error> {
    let path = Path::new(outfile);
    let output = File::create(&path)?;
    PNGEncoder::new(output).encode(pixels, side as u32, side as u32, ColorType::RGBA(8))?;
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();

    let side =
        usize::from_str(matches.value_of(SIZE).unwrap()).expect("Could not parse frame side");
    let max_iter = u32::from_str(matches.value_of(ITERATIONS).unwrap())
        .expect("Could not parse iteration count");
    let workers = matches
        .value_of(THREADS)
        .map(|s| usize::from_str(s).expect("Could not parse thread count"));
    let (x0, y0) = parse_pair(matches.value_of(LOWERLEFT).unwrap(), ',')
        .expect("Could not parse lower left corner");
    let (x1, y1) = parse_pair(matches.value_of(UPPERRIGHT).unwrap(), ',')
        .expect("Could not parse upper right corner");
    let view = ViewRect::new(x0, y0, x1, y1);

    let config = RendererConfig {
        side,
        max_iter,
        workers,
        regime: if matches.is_present(COPYBACK) {
            MemoryRegime::CopyBack
        } else {
            MemoryRegime::Shared
        },
        dispatch: if matches.is_present(INTERLEAVED) {
            Dispatch::Interleaved
        } else {
            Dispatch::Rebalancing
        },
    };

    let mut renderer = match Renderer::new(config) {
        Ok(renderer) => renderer,
        Err(e) => {
            eprintln!("Bad configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(rounds) = matches.value_of(BENCH) {
        let rounds = usize::from_str(rounds).expect("Could not parse benchmark round count");
        match renderer.benchmark(view, BENCH_WARMUP, rounds) {
            Ok(report) => {
                println!(
                    "rounds: {}  mean: {:.1} ms  std dev: {:.1} ms",
                    report.rounds, report.mean_ms, report.std_dev_ms
                );
            }
            Err(e) => {
                eprintln!("Render failure: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    match renderer.render(view) {
        Ok(frame) => {
            write_png(matches.value_of(OUTPUT).unwrap(), frame.pixels(), frame.side())
                .expect("Could not write output image");
        }
        Err(e) => {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
    }
}
