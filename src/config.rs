//! Mechanism for loading and sharing the selection configuration

use crate::{
    chain::CutChain,
    cuts::{CutThresholds, StageKind, TimingMode},
    numeric::Float,
    Result,
};

use eyre::{ensure, eyre, WrapErr};
use tracing::info;

use std::{fs, path::Path, str::FromStr};

/// Selection configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Stages of the selection, in evaluation order
    pub stages: Vec<StageKind>,

    /// Thresholds of the selection criteria
    pub thresholds: CutThresholds,
}
//
impl Default for Configuration {
    /// Full selection in canonical order, with reference thresholds
    fn default() -> Self {
        Self {
            stages: StageKind::CANONICAL.to_vec(),
            thresholds: CutThresholds::default(),
        }
    }
}
//
impl Configuration {
    /// Load the configuration from a file, check it, and print it out
    pub fn load(file_name: impl AsRef<Path>) -> Result<Self> {
        let file_name = file_name.as_ref();
        let config_str = fs::read_to_string(file_name)
            .wrap_err_with(|| format!("Failed to read {}", file_name.display()))?;
        let config = Self::parse(&config_str)?;
        config.print();
        Ok(config)
    }

    /// Decode and check a configuration
    ///
    /// Configuration items are the first non-whitespace chunk of text on each
    /// line, in a fixed order. Blank lines and lines starting with '#' are
    /// ignored, so the rest of each line is free for comments.
    ///
    pub fn parse(config_str: &str) -> Result<Self> {
        let mut config_iter = config_str
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter(|item| !item.starts_with('#'));

        // This closure fetches the next configuration item, tagging it with
        // the name of the configuration field which it is supposed to fill to
        // ease error reporting, and handling unexpected end-of-file too.
        let mut next_item = |name: &'static str| -> Result<ConfigItem> {
            config_iter
                .next()
                .map(|data| ConfigItem::new(name, data))
                .ok_or_else(|| eyre!("Missing configuration of {}", name))
        };

        // Decode the configuration items into concrete values
        let config = Configuration {
            stages: next_item("stages")?.parse_list::<StageKind>()?,
            thresholds: CutThresholds {
                module_limit: next_item("module_limit")?.parse::<i32>()?,
                x_foil_buffer: next_item("x_foil_buffer")?.parse::<Float>()?,
                x_calo_buffer: next_item("x_calo_buffer")?.parse::<Float>()?,
                y_buffer: next_item("y_buffer")?.parse::<Float>()?,
                x_max: next_item("x_max")?.parse::<Float>()?,
                y_max: next_item("y_max")?.parse::<Float>()?,
                t_threshold: next_item("t_threshold")?.parse::<Float>()?,
                timing_mode: next_item("timing_mode")?.parse::<TimingMode>()?,
                min_e: next_item("min_e")?.parse::<Float>()?,
                max_e_tot: next_item("max_e_tot")?.parse::<Float>()?,
                require_no_other: next_item("require_no_other")?.parse_bool()?,
            },
        };
        ensure!(
            next_item("end of file").is_err(),
            "Unexpected trailing configuration items"
        );

        config.check()?;
        Ok(config)
    }

    /// Make sure that the configuration describes a sensible selection
    pub fn check(&self) -> Result<()> {
        ensure!(!self.stages.is_empty(), "Please select at least one stage");
        for (idx, stage) in self.stages.iter().enumerate() {
            ensure!(
                !self.stages[..idx].contains(stage),
                "Stage {} is selected more than once",
                stage.name()
            );
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("x_foil_buffer", t.x_foil_buffer),
            ("x_calo_buffer", t.x_calo_buffer),
            ("y_buffer", t.y_buffer),
            ("t_threshold", t.t_threshold),
            ("min_e", t.min_e),
        ] {
            ensure!(value >= 0., "{} must be non-negative, got {}", name, value);
        }
        ensure!(
            t.x_max > t.x_calo_buffer,
            "Calorimeter buffer ({} mm) leaves no room within x_max ({} mm)",
            t.x_calo_buffer,
            t.x_max
        );
        ensure!(
            t.y_max > t.y_buffer,
            "y buffer ({} mm) leaves no room within y_max ({} mm)",
            t.y_buffer,
            t.y_max
        );
        ensure!(
            t.min_e <= t.max_e_tot,
            "Minimal candidate energy ({} MeV) exceeds the total energy cut ({} MeV)",
            t.min_e,
            t.max_e_tot
        );
        Ok(())
    }

    /// Build the selection chain described by this configuration
    pub fn chain(&self) -> CutChain {
        CutChain::from_kinds(&self.stages, &self.thresholds)
    }

    /// Send the configuration to the log
    pub fn print(&self) {
        let t = &self.thresholds;
        let stages = self
            .stages
            .iter()
            .map(|stage| stage.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        info!("STAGES           : {}", stages);
        info!("MODULE_LIMIT     : {}", t.module_limit);
        info!("X_FOIL_BUFFER    : {} mm", t.x_foil_buffer);
        info!("X_CALO_BUFFER    : {} mm", t.x_calo_buffer);
        info!("Y_BUFFER         : {} mm", t.y_buffer);
        info!("X_MAX            : {} mm", t.x_max);
        info!("Y_MAX            : {} mm", t.y_max);
        info!("T_THRESHOLD      : {}", t.t_threshold);
        info!("TIMING_MODE      : {}", t.timing_mode);
        info!("MIN_E            : {} MeV", t.min_e);
        info!("MAX_E_TOT        : {} MeV", t.max_e_tot);
        info!("REQUIRE_NO_OTHER : {}", t.require_no_other);
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
        parse_str(self.name, self.data)
    }

    /// Parse this data as a comma-separated list
    fn parse_list<T: FromStr>(self) -> Result<Vec<T>>
    where
        <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    {
        self.data
            .split(',')
            .filter(|entry| !entry.is_empty())
            .map(|entry| parse_str(self.name, entry))
            .collect()
    }

    /// Parse this data as a boolean, also accepting on/off and yes/no
    fn parse_bool(self) -> Result<bool> {
        match self.data.to_lowercase().as_str() {
            "on" | "yes" => Ok(true),
            "off" | "no" => Ok(false),
            // Delegate other booleans to the standard Rust parser
            _ => self.parse::<bool>(),
        }
    }
}

/// Parse a configuration value, tagging errors with the item name
fn parse_str<T: FromStr>(name: &'static str, data: &str) -> Result<T>
where
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    data.parse::<T>()
        .wrap_err_with(|| format!("Could not parse configuration of {}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "\
# 1e1gamma selection, reference thresholds
topology,module_fiducial,vertex_fiducial,timing,min_energy,total_energy   stages
519       module_limit
60.0      x_foil_buffer (mm)
100.0     x_calo_buffer (mm)
30.0      y_buffer (mm)
436.0     x_max (mm)
2494.0    y_max (mm)
0.0323    t_threshold (ns/mm)
normalised timing_mode

0.05      min_e (MeV)
3.0       max_e_tot (MeV)
on        require_no_other
";

    fn with_item(position: usize, replacement: &str) -> String {
        let mut lines: Vec<String> = REFERENCE
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        lines[position] = replacement.to_owned();
        lines.join("\n")
    }

    #[test]
    fn reference_configuration() {
        assert_eq!(
            Configuration::parse(REFERENCE).unwrap(),
            Configuration::default()
        );
    }

    #[test]
    fn custom_stage_order() {
        let config = Configuration::parse(&with_item(0, "timing,topology")).unwrap();
        assert_eq!(config.stages, [StageKind::Timing, StageKind::Topology]);
        assert_eq!(config.chain().labels(), ["timing", "topology"]);
    }

    #[test]
    fn raw_timing_and_booleans() {
        let config = Configuration::parse(&with_item(8, "raw")).unwrap();
        assert_eq!(config.thresholds.timing_mode, TimingMode::Raw);
        let config = Configuration::parse(&with_item(11, "false")).unwrap();
        assert!(!config.thresholds.require_no_other);
    }

    #[test]
    fn errors_name_the_faulty_item() {
        let error = Configuration::parse(&with_item(1, "lots")).unwrap_err();
        assert!(format!("{error:#}").contains("module_limit"), "{error:#}");
        let error = Configuration::parse(&with_item(0, "topology,magic")).unwrap_err();
        assert!(format!("{error:#}").contains("magic"), "{error:#}");
    }

    #[test]
    fn missing_and_trailing_items() {
        let truncated: String = REFERENCE.lines().take(4).collect::<Vec<_>>().join("\n");
        let error = Configuration::parse(&truncated).unwrap_err();
        assert!(error.to_string().contains("x_calo_buffer"), "{error}");
        let extended = format!("{REFERENCE}\n42\n");
        assert!(Configuration::parse(&extended).is_err());
    }

    #[test]
    fn inconsistent_thresholds() {
        assert!(Configuration::parse(&with_item(2, "-1.0")).is_err());
        assert!(Configuration::parse(&with_item(3, "500.0")).is_err());
        assert!(Configuration::parse(&with_item(9, "5.0")).is_err());
        assert!(Configuration::parse(&with_item(0, "timing,timing")).is_err());
    }
}
