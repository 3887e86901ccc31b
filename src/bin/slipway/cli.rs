//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Slipway - a declarative build driver for cross-platform native plugins
#[derive(Parser)]
#[command(name = "slipway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a plugin release for one platform
    Build(BuildArgs),

    /// Run a plugin test against a built artifact
    Test(TestArgs),

    /// List the plugins known to the plugins directory
    List(ListArgs),

    /// Generate the CI build or test matrix
    Matrix(MatrixArgs),

    /// Restrict a test matrix to entries whose build succeeded
    FilterTests(FilterTestsArgs),

    /// Aggregate build and test records into the release matrix
    ReleaseMatrix(ReleaseMatrixArgs),

    /// Record the outcome of a build job
    RecordBuild(RecordBuildArgs),

    /// Record the outcome of a single test invocation
    RecordTest(RecordTestArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Plugin name
    #[arg(long)]
    pub plugin: String,

    /// Release version to build
    #[arg(long)]
    pub version: String,

    /// Target platform
    #[arg(long)]
    pub platform: String,

    /// Working directory for sources and build steps
    #[arg(long)]
    pub workdir: PathBuf,

    /// Installation prefix directory (overrides the platform default)
    #[arg(long)]
    pub prefixdir: Option<String>,

    /// Directory containing plugin configs
    #[arg(long, default_value = "plugins")]
    pub plugins_dir: PathBuf,

    /// Number of parallel jobs (default: CPU count)
    #[arg(long)]
    pub nproc: Option<usize>,
}

#[derive(Args)]
pub struct TestArgs {
    /// Plugin name
    #[arg(long)]
    pub plugin: String,

    /// Plugin version under test
    #[arg(long)]
    pub version: String,

    /// Target platform
    #[arg(long)]
    pub platform: String,

    /// Name of the test to run
    #[arg(long)]
    pub test_name: String,

    /// Path to the plugin file (auto-detected when unset)
    #[arg(long)]
    pub plugin_path: Option<PathBuf>,

    /// Directory containing built artifacts, scanned for the plugin file
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// Test working directory
    #[arg(long)]
    pub testdir: PathBuf,

    /// Directory containing plugin configs
    #[arg(long, default_value = "plugins")]
    pub plugins_dir: PathBuf,
}

#[derive(Args)]
pub struct ListArgs {
    /// Directory containing plugin configs
    #[arg(long, default_value = "plugins")]
    pub plugins_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MatrixType {
    Build,
    Test,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Github,
}

#[derive(Args)]
pub struct MatrixArgs {
    /// Type of matrix to generate
    #[arg(long = "type", value_enum)]
    pub matrix_type: MatrixType,

    /// Plugin names (default: all plugins)
    #[arg(long, num_args = 0..)]
    pub plugins: Vec<String>,

    /// Directory containing plugin configs
    #[arg(long, default_value = "plugins")]
    pub plugins_dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

#[derive(Args)]
pub struct FilterTestsArgs {
    /// Base test matrix JSON file
    #[arg(long)]
    pub base_matrix: PathBuf,

    /// Directory of build result records
    #[arg(long, default_value = "build-results")]
    pub build_results_dir: PathBuf,

    /// CI output file
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct ReleaseMatrixArgs {
    /// Directory of build result records
    #[arg(long, default_value = "release-info/build-results")]
    pub build_results_dir: PathBuf,

    /// Directory of test result records
    #[arg(long, default_value = "release-info/test-results")]
    pub test_results_dir: PathBuf,

    /// Base test matrix the test jobs were fanned out from
    #[arg(long, default_value = "base_test_matrix.json")]
    pub base_test_matrix: PathBuf,

    /// CI output file
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct RecordBuildArgs {
    /// Plugin name
    #[arg(long, env = "PLUGIN")]
    pub plugin: String,

    /// Plugin version
    #[arg(long, env = "VERSION")]
    pub version: String,

    /// Target platform
    #[arg(long, env = "PLATFORM")]
    pub platform: String,

    /// CI runner label the job ran on
    #[arg(long, env = "RUNNER")]
    pub runner: String,

    /// Build outcome, `success` or `failure`
    #[arg(long, env = "BUILD_STATUS")]
    pub status: String,

    /// File to write the record to
    #[arg(long, env = "RESULT_FILE")]
    pub result_file: PathBuf,
}

#[derive(Args)]
pub struct RecordTestArgs {
    /// Plugin name
    #[arg(long, env = "PLUGIN")]
    pub plugin: String,

    /// Plugin version
    #[arg(long, env = "VERSION")]
    pub version: String,

    /// Target platform
    #[arg(long, env = "PLATFORM")]
    pub platform: String,

    /// Name of the test that ran
    #[arg(long, env = "TEST_NAME")]
    pub test_name: String,

    /// CI runner label the job ran on
    #[arg(long, env = "RUNNER")]
    pub runner: String,

    /// Test outcome, `success` or `failure`
    #[arg(long, env = "TEST_STATUS", default_value = "")]
    pub status: String,

    /// File to write the record to (derived from the record when unset)
    #[arg(long, env = "RESULT_FILE")]
    pub result_file: Option<PathBuf>,

    /// File to write the chosen record path to
    #[arg(long, env = "RESULT_PATH_FILE")]
    pub result_path_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
