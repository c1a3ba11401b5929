use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tspack_bundler::OutputFormat;

/// Options shared by `build` and `watch`.
///
/// Everything except `input` is optional here so that unset flags fall
/// through to `tspack.config.json` and `TSPACK_*` variables.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Entry module to bundle
    ///
    /// Required unless `input` is set in tspack.config.json.
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output directory for index.js and index.js.map
    ///
    /// Purged before every build.
    #[arg(short = 'o', long = "output", visible_alias = "out-dir", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Path to the package.json declaring dependencies
    #[arg(short = 'p', long, value_name = "PATH")]
    pub packages: Option<PathBuf>,

    /// Output module format
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<FormatArg>,

    /// Skip minification
    #[arg(long)]
    pub no_uglify: bool,

    /// Do not emit index.js.map
    #[arg(long)]
    pub no_sourcemap: bool,

    /// Do not inline node_modules dependencies
    #[arg(long)]
    pub no_resolve: bool,

    /// Skip stylesheet imports
    #[arg(long)]
    pub no_styles: bool,

    /// Leave declared dependencies as bare imports for the runtime
    #[arg(long, conflicts_with = "cdn")]
    pub externalize: bool,

    /// Rewrite bare imports to versioned CDN URLs
    #[arg(long)]
    pub cdn: bool,

    /// Base URL used by --cdn
    #[arg(long, value_name = "URL")]
    pub cdn_base: Option<String>,

    /// Where --cdn looks up package versions
    #[arg(long, value_enum)]
    pub registry: Option<RegistryArg>,

    /// Keep rebuilding on file changes
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Working directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Path to a config file (defaults to tspack.config.json in the working directory)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Output format accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// ECMAScript module
    Esm,
    /// CommonJS
    Cjs,
    /// Immediately invoked function expression
    Iife,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Esm => OutputFormat::Esm,
            FormatArg::Cjs => OutputFormat::Cjs,
            FormatArg::Iife => OutputFormat::Iife,
        }
    }
}

/// Version source for CDN rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RegistryArg {
    /// Read versions from node_modules/<pkg>/package.json
    Installed,
    /// Ask `npm view <pkg> version`
    Npm,
}
