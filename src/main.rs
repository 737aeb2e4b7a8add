use clap::Parser;
use log;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::PathBuf;

use rusty_psp::core::spike::SpikeTrain;
use rusty_psp::error::SNNError;
use rusty_psp::regression::{run_regression, RegressionConfig};

/// Replay a precise Poisson spike train at several resolutions and compare the membrane potential to the closed form.
#[derive(Parser, Debug)]
struct Args {
    /// JSON file with the regression configuration (kernel and neuron sections)
    #[arg(long)]
    config: Option<PathBuf>,
    /// The simulated duration (ms)
    #[arg(short = 'T', long)]
    duration: Option<f64>,
    /// The Poisson rate (Hz)
    #[arg(long)]
    rate: Option<f64>,
    /// The weight of the replayed spikes (pA)
    #[arg(long, allow_negative_numbers = true)]
    weight: Option<f64>,
    /// The delay of the replayed spikes (ms)
    #[arg(long)]
    delay: Option<f64>,
    /// The finest resolution is 2^min_exponent ms
    #[arg(long, allow_negative_numbers = true)]
    min_exponent: Option<i32>,
    /// The resolutions stay below 2^max_exponent ms
    #[arg(long, allow_negative_numbers = true)]
    max_exponent: Option<i32>,
    /// The absolute tolerance (mV)
    #[arg(long)]
    tolerance: Option<f64>,
    /// The seed used for spike train sampling
    #[arg(long)]
    seed: Option<u64>,
    /// Save the sampled spike train to a JSON file
    #[arg(long)]
    save_spike_train: Option<PathBuf>,
    /// The log level
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

impl Args {
    /// Returns the configuration file, or the defaults, with the command-line values on top.
    fn regression_config(&self) -> Result<RegressionConfig, SNNError> {
        let mut config = match &self.config {
            Some(path) => RegressionConfig::load_from(path)?,
            None => RegressionConfig::default(),
        };
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(rate) = self.rate {
            config.rate = rate;
        }
        if let Some(weight) = self.weight {
            config.weight = weight;
        }
        if let Some(delay) = self.delay {
            config.delay = delay;
        }
        if let Some(min_exponent) = self.min_exponent {
            config.min_exponent = min_exponent;
        }
        if let Some(max_exponent) = self.max_exponent {
            config.max_exponent = max_exponent;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(seed) = self.seed {
            config.kernel.rng_seed = seed;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), SNNError> {
    let args = Args::parse();

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{l} - {m}{n}")))
        .build();

    let log_config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(args.log_level))
        .map_err(|e| SNNError::IOError(e.to_string()))?;

    log4rs::init_config(log_config).map_err(|e| SNNError::IOError(e.to_string()))?;

    log::info!("{:?}", args);

    let config = args.regression_config()?;
    let report = run_regression(&config)?;

    if let Some(path) = &args.save_spike_train {
        SpikeTrain::from_times(&report.spike_times, config.weight, config.delay)?.save_to(path)?;
        log::info!("Spike train saved to {}", path.display());
    }

    for resolution in report.resolutions.iter() {
        println!(
            "h = {:>12} ms   V_m = {:.15} mV   error = {:.3e} mV",
            resolution.resolution,
            resolution.potential,
            resolution.error()
        );
    }

    if report.passed(config.tolerance) {
        log::info!(
            "All resolutions agree with the closed form (max error {:e} mV, tolerance {:e} mV)",
            report.max_error(),
            config.tolerance
        );
        Ok(())
    } else {
        log::error!(
            "Maximum error {:e} mV exceeds the tolerance {:e} mV",
            report.max_error(),
            config.tolerance
        );
        std::process::exit(1);
    }
}
