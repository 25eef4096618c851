//! Mechanism for loading and sharing the analysis configuration

use crate::{
    histogram::Axis,
    pipeline::FitOptions,
    q2bins::{self, Q2Bin},
    selection::ProfileRegistry,
};

use eyre::{ensure, eyre, Result, WrapErr};
use tracing::Level;

use std::{fs, str::FromStr};

/// Analysis configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Event table to be read
    pub input_file: String,

    /// Output table of selected candidates
    pub output_table: String,

    /// Text file receiving the fit summary
    pub fit_summary: String,

    /// Name of the candidate selection profile
    pub profile: String,

    /// Whether the input is simulation, with generator-level information
    pub is_mc: bool,

    /// q² bin whose candidates are histogrammed and fitted
    pub q2_bin: Q2Bin,

    /// Number of cosθ_L bins
    pub x_bins: usize,

    /// Number of cosθ_K bins
    pub y_bins: usize,

    /// Order of the fitted polynomial in cosθ_L
    pub x_order: usize,

    /// Order of the fitted polynomial in cosθ_K
    pub y_order: usize,

    /// Settings of the histogram fit
    pub fit: FitOptions,

    /// Most verbose log level which is displayed
    pub log_level: Level,
}
//
impl Configuration {
    /// Load the configuration from a file, check it, and print it out
    pub fn load(file_name: &str) -> Result<Self> {
        let config_str = fs::read_to_string(file_name)
            .wrap_err_with(|| format!("Could not read configuration file {file_name}"))?;
        let config = Self::parse(&config_str)?;
        config.print();
        Ok(config)
    }

    /// Decode and check the contents of a configuration file
    ///
    /// Configuration items are the first non-whitespace chunk of text on each
    /// line, in a fixed order. Blank lines are ignored, so is everything that
    /// follows an item on its line.
    ///
    pub fn parse(config_str: &str) -> Result<Self> {
        let mut config_iter = config_str
            .lines()
            .filter_map(|line| line.split_whitespace().next());

        // Fetch the next item, tagged with the field it is supposed to fill
        let mut next_item = |name: &'static str| -> Result<ConfigItem> {
            config_iter
                .next()
                .map(|data| ConfigItem::new(name, data))
                .ok_or_else(|| eyre!("Missing configuration of {}", name))
        };

        let config = Configuration {
            input_file: next_item("input_file")?.data.to_owned(),
            output_table: next_item("output_table")?.data.to_owned(),
            fit_summary: next_item("fit_summary")?.data.to_owned(),
            profile: next_item("profile")?.data.to_owned(),
            is_mc: next_item("is_mc")?.parse_bool()?,
            q2_bin: next_item("q2_bin")?.parse_q2_bin()?,
            x_bins: next_item("x_bins")?.parse::<usize>()?,
            y_bins: next_item("y_bins")?.parse::<usize>()?,
            x_order: next_item("x_order")?.parse::<usize>()?,
            y_order: next_item("y_order")?.parse::<usize>()?,
            fit: FitOptions {
                migrad_retries: next_item("migrad_retries")?.parse::<usize>()?,
                minos_retries: next_item("minos_retries")?.parse::<usize>()?,
                run_hesse: next_item("run_hesse")?.parse_bool()?,
                run_minos: next_item("run_minos")?.parse_bool()?,
                seed: next_item("seed")?.parse::<u64>()?,
            },
            log_level: next_item("log_level")?.parse::<Level>()?,
        };

        ProfileRegistry::with_builtin()
            .get(&config.profile)
            .wrap_err("Invalid configuration of profile")?;
        ensure!(
            config.x_bins > 0 && config.y_bins > 0,
            "The angular histogram needs at least one bin per axis"
        );
        ensure!(
            config.num_params() <= config.x_bins * config.y_bins,
            "A polynomial of orders ({}, {}) cannot be fitted to {} bins",
            config.x_order,
            config.y_order,
            config.x_bins * config.y_bins
        );
        Ok(config)
    }

    /// Binning of cosθ_L
    pub fn x_axis(&self) -> Axis {
        Axis::new(self.x_bins, -1., 1.)
    }

    /// Binning of cosθ_K
    pub fn y_axis(&self) -> Axis {
        Axis::new(self.y_bins, -1., 1.)
    }

    /// Number of coefficients of the fitted polynomial
    fn num_params(&self) -> usize {
        (self.x_order + 1) * (self.y_order + 1)
    }

    /// Display the configuration
    pub fn print(&self) {
        println!("Input file     : {}", self.input_file);
        println!("Output table   : {}", self.output_table);
        println!("Fit summary    : {}", self.fit_summary);
        println!("Profile        : {}", self.profile);
        println!("Simulation     : {}", self.is_mc);
        println!(
            "q² bin         : {} [{}, {}] GeV²",
            self.q2_bin.key, self.q2_bin.q2_min, self.q2_bin.q2_max
        );
        println!("Binning        : {} × {}", self.x_bins, self.y_bins);
        println!("Model orders   : {} × {}", self.x_order, self.y_order);
        println!("Migrad retries : {}", self.fit.migrad_retries);
        println!("Minos retries  : {}", self.fit.minos_retries);
        println!("Run Hesse      : {}", self.fit.run_hesse);
        println!("Run Minos      : {}", self.fit.run_minos);
        println!("Seed           : {}", self.fit.seed);
        println!("Log level      : {}", self.log_level);
    }
}

/// A value from the configuration file, tagged with the struct field which it
/// is supposed to map for error reporting purposes.
struct ConfigItem<'data> {
    name: &'static str,
    data: &'data str,
}
//
impl<'data> ConfigItem<'data> {
    /// Build a config item from a struct field tag and raw iterator data
    fn new(name: &'static str, data: &'data str) -> Self {
        Self { name, data }
    }

    /// Parse this data using Rust's standard parsing logic
    fn parse<T: FromStr>(self) -> Result<T>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        self.data
            .parse::<T>()
            .wrap_err_with(|| format!("Could not parse configuration of {}", self.name))
    }

    /// Parse a boolean, also accepting the 0/1 spelling of the event tables
    fn parse_bool(self) -> Result<bool> {
        match self.data {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => self.parse::<bool>(),
        }
    }

    /// Look up a q² bin by its key
    fn parse_q2_bin(self) -> Result<Q2Bin> {
        q2bins::find(self.data).copied().ok_or_else(|| {
            eyre!(
                "Unknown q² bin \"{}\" in configuration of {}",
                self.data,
                self.name
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\
events.txt      input_file
selected.txt    output_table
fit.txt         fit_summary
ANv18           profile
1               is_mc
belowJpsi       q2_bin

5               x_bins
4               y_bins
2               x_order
1               y_order
10              migrad_retries
3               minos_retries
true            run_hesse
false           run_minos
42              seed
debug           log_level
";

    #[test]
    fn valid_configuration() {
        let config = Configuration::parse(VALID).unwrap();
        assert_eq!(config.input_file, "events.txt");
        assert_eq!(config.profile, "ANv18");
        assert!(config.is_mc);
        assert_eq!(config.q2_bin.key, "belowJpsi");
        assert_eq!(config.x_axis(), Axis::new(5, -1., 1.));
        assert_eq!(config.y_axis().bins, 4);
        assert_eq!(config.fit.seed, 42);
        assert!(config.fit.run_hesse && !config.fit.run_minos);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn missing_items_are_named() {
        let truncated = VALID.lines().take(7).collect::<Vec<_>>().join("\n");
        let err = Configuration::parse(&truncated).unwrap_err();
        assert_eq!(err.to_string(), "Missing configuration of x_bins");
    }

    #[test]
    fn invalid_items_are_rejected() {
        let replace = |from: &str, to: &str| Configuration::parse(&VALID.replacen(from, to, 1));
        let err = replace("ANv18 ", "tight ").unwrap_err();
        assert_eq!(err.to_string(), "Invalid configuration of profile");
        let err = replace("belowJpsi", "nowhere").unwrap_err();
        assert!(err.to_string().contains("nowhere"));
        let err = replace("5      ", "five   ").unwrap_err();
        assert_eq!(err.to_string(), "Could not parse configuration of x_bins");
        assert!(replace("4      ", "0      ").is_err());
        // Six coefficients do not fit in four bins
        assert!(replace("5      ", "1      ").is_err());
    }
}
