// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `serve`, `predict`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, ColumnRename, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::serve_use_case::ServeConfig;
use crate::application::train_use_case::{EncoderScope, TrainConfig};
use crate::domain::feature_spec::{ColumnRename, FeatureSpec};
use crate::ml::boosted::BoostedTrees;
use crate::ml::regressor::RegressorKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit encoders and regressors on a CSV file and publish the bundles
    Train(TrainArgs),

    /// Serve predictions over HTTP from published bundles
    Serve(ServeArgs),

    /// Predict a single price from a JSON object of features
    Predict(PredictArgs),
}

/// Regression algorithm selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegressorChoice {
    Linear,
    Ridge,
    BoostedTrees,
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with a header row
    #[arg(long, default_value = "data/raw_material_prices.csv")]
    pub data: String,

    /// Directory the bundles are published into
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Feature columns, in the order the model sees them
    #[arg(long, value_delimiter = ',', default_values = ["Date_day_of_year", "Weather", "Demand"])]
    pub features: Vec<String>,

    /// Which of the features are categorical
    #[arg(long, value_delimiter = ',', default_values = ["Weather", "Demand"])]
    pub categorical: Vec<String>,

    /// Numeric column to predict
    #[arg(long, default_value = "Price")]
    pub target: String,

    /// Train one bundle per distinct value of this column
    #[arg(long)]
    pub segment_key: Option<String>,

    /// Only train these segment values (default: all)
    #[arg(long, value_delimiter = ',')]
    pub segments: Vec<String>,

    /// Date column expanded into <col>_day_of_year, _day, _month, _year.
    /// Pass an empty string to disable.
    #[arg(long, default_value = "Date")]
    pub date_column: String,

    /// Rename a column after header normalisation, e.g. "District Name=District"
    #[arg(long = "rename")]
    pub renames: Vec<ColumnRename>,

    #[arg(long, value_enum, default_value_t = RegressorChoice::Linear)]
    pub regressor: RegressorChoice,

    /// Ridge regularisation strength
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Boosting rounds
    #[arg(long, default_value_t = 100)]
    pub iterations: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 3)]
    pub max_depth: u32,

    /// Learning rate of each boosting round
    #[arg(long, default_value_t = 0.1)]
    pub shrinkage: f32,

    /// Fraction of rows held out from fitting
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed of the train / held-out shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fewest usable rows a bundle may be trained on
    #[arg(long, default_value_t = 2)]
    pub min_rows: usize,

    /// Bundle id when there is no segment key
    #[arg(long, default_value = "default")]
    pub bundle_id: String,

    /// Fit encoders per segment or once over all segments
    #[arg(long, value_enum, default_value_t = EncoderScope::Segment)]
    pub encoder_scope: EncoderScope,
}

impl TrainArgs {
    fn regressor_kind(&self) -> RegressorKind {
        match self.regressor {
            RegressorChoice::Linear => RegressorKind::Linear,
            RegressorChoice::Ridge  => RegressorKind::Ridge { alpha: self.alpha },
            RegressorChoice::BoostedTrees => RegressorKind::BoostedTrees(BoostedTrees {
                iterations: self.iterations,
                max_depth:  self.max_depth,
                shrinkage:  self.shrinkage,
                ..BoostedTrees::default()
            }),
        }
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let regressor = a.regressor_kind();

        let mut spec = FeatureSpec::new(&a.features, &a.categorical, a.target);
        if let Some(key) = a.segment_key {
            spec = spec.with_segment_key(key);
        }
        if !a.segments.is_empty() {
            spec = spec.with_segments(a.segments);
        }
        if !a.date_column.trim().is_empty() {
            spec = spec.with_date_column(a.date_column);
        }
        spec.renames = a.renames;

        TrainConfig {
            data_path:     a.data,
            artifacts_dir: a.artifacts_dir,
            spec,
            regressor,
            test_fraction: a.test_fraction,
            seed:          a.seed,
            min_rows:      a.min_rows,
            bundle_id:     a.bundle_id,
            encoder_scope: a.encoder_scope,
        }
    }
}

/// All arguments for the `serve` command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Directory the bundles were published into
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Bundles to load (default: every bundle in the store)
    #[arg(long = "bundle", value_delimiter = ',')]
    pub bundles: Vec<String>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub listen: String,

    /// Decimal places of returned prices
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(0..=15))]
    pub decimals: u32,
}

impl From<ServeArgs> for ServeConfig {
    fn from(a: ServeArgs) -> Self {
        ServeConfig {
            artifacts_dir: a.artifacts_dir,
            bundles:       a.bundles,
            listen_addr:   a.listen,
            decimals:      a.decimals,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON object of feature name → value
    #[arg(long)]
    pub input: String,

    /// Bundle to predict with (default: routed like POST /predict)
    #[arg(long)]
    pub bundle: Option<String>,

    /// Directory the bundles were published into
    #[arg(long, default_value = "artifacts")]
    pub artifacts_dir: String,

    /// Decimal places of the printed price
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(0..=15))]
    pub decimals: u32,
}
