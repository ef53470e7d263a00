use env_logger::Env;
use log::info;
use plotters::prelude::*;
use sim_lib::memory::{CacheConfig, HierarchyConfig};
use sim_lib::run_wrapper::{fetch_operations, run_operations};

const BLOCK_BITS: u32 = 6;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", "info"));

    let param_tokens: Vec<String> = std::env::args().collect();
    let trace_path =
        param_tokens.get(1).ok_or("You should specify exactly one trace file")?;
    let operations = fetch_operations(trace_path)?;

    // Plot line series for each cache size
    // For a fixed cache size, vary the associativity
    // Performance metric: L1 miss ratio
    // Cache sizes: 4KB, 8KB, 16KB, 32KB, 64KB
    let size_bits = vec![12, 13, 14, 15, 16];
    // Associativity: 1, 2, 4, 8, 16 ways
    let way_bits = vec![0, 1, 2, 3, 4];

    let mut data: Vec<Vec<(i32, f64)>> = vec![vec![]; size_bits.len()];
    let mut y_max: f64 = 0.;
    for (i, &c) in size_bits.iter().enumerate() {
        for &s in way_bits.iter() {
            let config =
                HierarchyConfig::single_level(CacheConfig::make(c, BLOCK_BITS, s));
            let stats = run_operations(&config, &operations)?;
            info!(
                "c = {}, s = {}: miss ratio = {:.4}",
                c, s, stats.miss_ratio_l1
            );
            data[i].push((1 << s, stats.miss_ratio_l1));
            y_max = y_max.max(stats.miss_ratio_l1);
        }
    }

    let trace_base_name = std::path::Path::new(trace_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("trace");
    let plot_title = format!("L1 associativity sweep (miss ratio): {}", trace_base_name);
    std::fs::create_dir_all("eval")?;
    let output_path = format!("eval/sweep_eval_{}.svg", trace_base_name);

    let root = SVGBackend::new(output_path.as_str(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title.as_str(), ("sans-serif", 40).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(1..16, 0.0..(y_max * 1.1).max(0.01))?;
    ctx.configure_mesh()
        .x_desc("Associativity")
        .y_desc("Miss ratio")
        .draw()?;

    for (i, c) in size_bits.iter().enumerate() {
        let series = data[i].iter().copied();
        let label = format!("Cache size = {}KB", (1 << c) / 1024);
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(LineSeries::new(series, color))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
