use std::io;
use std::process;

use cache_lib::error::SimulatorResult;
use cache_lib::flags::{init_logging, SimCacheArgs};
use cache_lib::report::write_report;
use cache_lib::run_wrapper::run_trace;
use clap::Parser;

fn main() {
    init_logging();
    let args = SimCacheArgs::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &SimCacheArgs) -> SimulatorResult<()> {
    let config = args.config();
    let hierarchy = run_trace(&config, &args.trace_file)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_report(
        &mut out,
        &config,
        &args.trace_name(),
        &hierarchy,
        !args.no_contents,
    )?;
    Ok(())
}
