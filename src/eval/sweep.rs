use std::fs;
use std::path::Path;
use std::process;

use cache_lib::config::SimConfig;
use cache_lib::error::{SimulatorError, SimulatorResult};
use cache_lib::flags::{init_logging, EvalArgs};
use cache_lib::memory::measurements::average_access_time;
use cache_lib::memory::replacement::ReplacementPolicy;
use cache_lib::run_wrapper::{fetch_operations, simulate};
use clap::Parser;
use log::info;
use plotters::prelude::*;

const BLOCK_SIZE: u32 = 32;

/// L1 size and associativity sweep, LRU, no L2
#[derive(Debug, Parser)]
#[command(name = "sweep-eval")]
struct SweepArgs {
    #[command(flatten)]
    eval: EvalArgs,

    /// L1 hit time in ns
    #[arg(long = "hit-time", default_value_t = 0.15)]
    hit_time: f64,

    /// Memory access time in ns
    #[arg(long = "miss-penalty", default_value_t = 100.)]
    miss_penalty: f64,
}

/// Associativities to sweep, `None` standing for fully associative
const ASSOCIATIVITIES: [Option<u32>; 5] =
    [Some(1), Some(2), Some(4), Some(8), None];

fn assoc_label(assoc: Option<u32>) -> String {
    assoc.map_or_else(|| "full".to_string(), |a| a.to_string())
}

fn main() {
    init_logging();
    let args = SweepArgs::parse();

    if let Err(e) = run_eval(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_eval(args: &SweepArgs) -> SimulatorResult<()> {
    let trace = fetch_operations(&args.eval.trace_file)?;
    let trace_base_name = args
        .eval
        .trace_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    fs::create_dir_all(&args.eval.out_dir)?;

    let csv_path = args
        .eval
        .out_dir
        .join(format!("sweep_eval_{}.csv", trace_base_name));
    let mut writer = csv::Writer::from_path(&csv_path)?;
    writer.write_record(["log2(size)", "assoc", "L1 miss rate", "AAT"])?;

    // One line series per associativity: (log2 size, AAT)
    let mut data: Vec<Vec<(u32, f64)>> = vec![vec![]; ASSOCIATIVITIES.len()];
    let mut y_max: f64 = 0.;
    for (i, assoc) in ASSOCIATIVITIES.iter().enumerate() {
        for log_size in 10..=20 {
            let l1_size = 1 << log_size;
            let config = SimConfig {
                block_size: BLOCK_SIZE,
                l1_size,
                l1_assoc: assoc.unwrap_or(l1_size / BLOCK_SIZE),
                replacement: ReplacementPolicy::Lru,
                ..Default::default()
            };
            let hierarchy = simulate(&config, &trace)?;
            let miss_rate = hierarchy.l1.get_miss_rate();
            let aat =
                average_access_time(args.hit_time, miss_rate, args.miss_penalty);
            info!(
                "size 2^{} assoc {}: miss rate {:?}, AAT {:.4}",
                log_size,
                assoc_label(*assoc),
                miss_rate,
                aat
            );

            writer.write_record([
                log_size.to_string(),
                assoc_label(*assoc),
                format!("{:.6}", miss_rate.unwrap_or(0.)),
                format!("{:.4}", aat),
            ])?;
            data[i].push((log_size, aat));
            y_max = y_max.max(aat);
        }
    }
    writer.flush()?;

    let svg_path = args
        .eval
        .out_dir
        .join(format!("sweep_eval_{}.svg", trace_base_name));
    let plot_title = format!("L1 sweep (AAT): {}", trace_base_name);
    draw_plot(&svg_path, &plot_title, &data, y_max)
        .map_err(|e| SimulatorError::PlotError(e.to_string()))?;

    Ok(())
}

fn draw_plot(
    output_path: &Path,
    plot_title: &str,
    data: &[Vec<(u32, f64)>],
    y_max: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title, ("sans-serif", 40).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(10u32..20u32, 0.0..y_max * 1.1)?;
    ctx.configure_mesh()
        .x_desc("log2(L1 size)")
        .y_desc("AAT (ns)")
        .draw()?;

    for (i, assoc) in ASSOCIATIVITIES.iter().enumerate() {
        let series = data[i].iter().copied();
        let label = format!("Assoc {}", assoc_label(*assoc));
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(LineSeries::new(series, color))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color)
            });
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;

    Ok(())
}
