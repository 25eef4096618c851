//! Command-line driver of the B⁺ → K*⁺ μ⁺μ⁻ selection and angular fit

use eyre::{Result, WrapErr};
use kstarmumu::{
    config::Configuration,
    input,
    model::Polynomial2D,
    output,
    pipeline::{self, EventProcessor},
    scheduling,
    selection::ProfileRegistry,
};
use tracing::{info, warn};

use std::{env, fs::File, io::BufReader, time::Instant};

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG: &str = "kstarmumu.cfg";

/// This will act as our main function, with suitable error handling
fn main() -> Result<()> {
    // ### CONFIGURATION READOUT ###

    let config_file = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_owned());
    let cfg = Configuration::load(&config_file).wrap_err("Failed to load the configuration")?;
    tracing_subscriber::fmt()
        .with_max_level(cfg.log_level)
        .with_target(false)
        .init();

    // ### EVENT READOUT ###

    let events = {
        let file = File::open(&cfg.input_file)
            .wrap_err_with(|| format!("Failed to open {}", cfg.input_file))?;
        input::read_events(BufReader::new(file))
            .wrap_err_with(|| format!("Failed to read events from {}", cfg.input_file))?
    };
    info!("Read {} events from {}", events.len(), cfg.input_file);

    // NOTE: The clock starts after input I/O, to avoid IO-induced timing
    //       fluctuations
    let saved_time = Instant::now();

    // ### EVENT PROCESSING ###

    let processor = EventProcessor::new(
        &ProfileRegistry::with_builtin(),
        &cfg.profile,
        cfg.is_mc,
        cfg.q2_bin,
        cfg.x_axis(),
        cfg.y_axis(),
    )?;
    let result = scheduling::run_selection(&events, |batch| processor.process_batch(batch));

    // ### HISTOGRAM FIT ###

    let model = Polynomial2D::new(cfg.x_order, cfg.y_order);
    let fit = if result.histogram.integral() > 0. {
        let fit = pipeline::fit_histogram(&result.histogram, &model, &cfg.fit)
            .wrap_err("Failed to fit the histogram")?;
        Some(fit)
    } else {
        warn!("No candidate in the q² bin {}, skipping the fit", cfg.q2_bin.key);
        None
    };

    // ### RESULTS DISPLAY AND STORAGE ###

    let elapsed_time = saved_time.elapsed();
    output::dump_results(&cfg, &result, fit.as_ref(), elapsed_time)
        .wrap_err("Failed to output the results")?;

    // ...and we're done
    Ok(())
}
