//! Acceleration table generator
//!
//! Produces the same table the firmware bakes in with the `const`
//! generator, as a Rust source file, so a tuned table can be inspected or
//! checked in:
//!
//! ```text
//! pyrograph-tablegen -o accel_table.rs 512 40000000
//! ```
//!
//! The summary line reports the terminal rate the table reaches, which is
//! the fastest `#V` velocity a full-length ramp can serve.

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use getopts::Options;

use pyrograph_core::motion::TIMER_HZ;
use pyrograph_core::table::generate_into;

fn usage(prg: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] STEPS ACCEL", prg);
    print!("{}", opts.usage(&brief));
}

fn render(out: &mut impl Write, delays: &[u16], accel: u32) -> std::io::Result<()> {
    writeln!(out, "//! Generated by pyrograph-tablegen: {} steps, acceleration constant {}", delays.len(), accel)?;
    writeln!(out)?;
    writeln!(out, "pub static ACCEL_TABLE: [u16; {}] = [", delays.len())?;
    for chunk in delays.chunks(12) {
        let row: Vec<String> = chunk.iter().map(u16::to_string).collect();
        writeln!(out, "    {},", row.join(", "))?;
    }
    writeln!(out, "];")
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("o", "output", "output file", "FILE");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if matches.opt_present("h") || matches.free.len() != 2 {
        usage(&program, &opts);
        return ExitCode::FAILURE;
    }

    let (steps, accel) = match (matches.free[0].parse::<usize>(), matches.free[1].parse::<u32>()) {
        (Ok(s), Ok(a)) if s > 0 && a > 0 => (s, a),
        _ => {
            eprintln!("STEPS and ACCEL must be positive integers");
            return ExitCode::FAILURE;
        }
    };

    let mut delays = vec![0u16; steps];
    let terminal = generate_into(&mut delays, accel);

    let out_path = matches
        .opt_str("o")
        .unwrap_or_else(|| "accel_table.rs".to_string());
    let file = match File::create(&out_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("cannot create {}: {}", out_path, e);
            return ExitCode::FAILURE;
        }
    };
    let mut writer = BufWriter::new(file);
    if let Err(e) = render(&mut writer, &delays, accel) {
        eprintln!("cannot write {}: {}", out_path, e);
        return ExitCode::FAILURE;
    }

    println!(
        "Reached {} ticks/step ({:.1} steps per second) in {} steps; wrote {}",
        terminal,
        f64::from(TIMER_HZ) / f64::from(terminal.max(1)),
        steps,
        out_path
    );
    ExitCode::SUCCESS
}
