/// Config file loading and creation for the springpick CLI.
///
/// Config lives at ~/.config/springpick/config.toml.
/// All fields are optional. CLI flags override config values, which override
/// the library defaults.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use springpick_core::{RankConfig, Representation, SelectorConfig, SolverKind};

use crate::bail;

#[derive(Deserialize, Default)]
pub struct SpringpickConfig {
    /// Default comparison log.
    pub comparisons: Option<PathBuf>,
    pub alpha: Option<f64>,
    pub l0: Option<f64>,
    pub l1: Option<f64>,
    pub solver: Option<String>,
    pub representation: Option<Representation>,
    pub tie_tolerance: Option<f64>,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<usize>,
    pub max_redraws: Option<usize>,
}

/// Ranking knobs taken from the command line. Each `Some` beats the file.
#[derive(Default)]
pub struct RankOverrides {
    pub alpha: Option<f64>,
    pub l0: Option<f64>,
    pub l1: Option<f64>,
    pub solver: Option<String>,
    pub representation: Option<Representation>,
    pub tie_tolerance: Option<f64>,
    pub max_redraws: Option<usize>,
}

impl SpringpickConfig {
    pub fn rank_config(&self, overrides: &RankOverrides) -> RankConfig {
        let defaults = RankConfig::default();
        let solver = overrides.solver.as_deref()
            .or(self.solver.as_deref())
            .map(SolverKind::from_name)
            .unwrap_or(defaults.solver);

        RankConfig {
            alpha: overrides.alpha.or(self.alpha).unwrap_or(defaults.alpha),
            l0: overrides.l0.or(self.l0).unwrap_or(defaults.l0),
            l1: overrides.l1.or(self.l1).unwrap_or(defaults.l1),
            solver,
            representation: overrides.representation
                .or(self.representation)
                .unwrap_or(defaults.representation),
            tie_tolerance: overrides.tie_tolerance.or(self.tie_tolerance).unwrap_or(defaults.tie_tolerance),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            max_iterations: self.max_iterations.or(defaults.max_iterations),
        }
    }

    pub fn selector_config(&self, overrides: &RankOverrides) -> SelectorConfig {
        let defaults = SelectorConfig::default();
        SelectorConfig {
            max_redraws: overrides.max_redraws.or(self.max_redraws).unwrap_or(defaults.max_redraws),
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# springpick configuration
# All values here can be overridden by CLI flags.

# Comparison log used when --comparisons is not given
# comparisons = \"/path/to/comparisons.txt\"

# Regularization strength. 0 pins the last item at score 0 and requires a
# connected comparison graph; > 0 pulls every score toward l0 instead.
# alpha = 0.0
# l0 = 1.0
# l1 = 1.0

# Linear solver: \"direct\" or \"iterative\"
# solver = \"iterative\"

# Matrix representation: \"dense\" or \"sparse\"
# representation = \"sparse\"

# Scores closer than this share a tier
# tie_tolerance = 1e-6

# Iterative solver settings
# tolerance = 1e-10
# max_iterations = 1000

# Random redraws before the pair selector reports exhaustion
# max_redraws = 1000
";

/// Returns the default config path: ~/.config/springpick/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("springpick").join("config.toml")
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> SpringpickConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            tracing::debug!(path = %path.display(), "Loaded config");
            toml::from_str(&content)
                .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => SpringpickConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config(path: &Path) {
    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));
}
