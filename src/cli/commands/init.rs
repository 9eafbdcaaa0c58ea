//! `pst init` command - create the project skeleton

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::core::Project;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,
}

const DEFAULT_CONFIG: &str = "\
# pst project configuration
#
# user: your-name
#
# status_maps:
#   default:
#     tested:
#       origins: [\"\"]
#       role: item_admin
#     shipped:
#       origins: [tested]
#       unavailable: true
#
# item_requirements:
#   AB1234:
#     required_fields: [batch]
#     integer_fields: [cycles]
";

pub fn run(args: InitArgs) -> Result<()> {
    let project = Project::init(&args.path).into_diagnostic()?;

    let config_path = project.config_path();
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG).into_diagnostic()?;
    }

    println!(
        "{} Initialized pst project in {}",
        style("✓").green(),
        style(project.root().display()).cyan()
    );
    println!("  Edit {} to configure status maps", config_path.display());
    Ok(())
}
