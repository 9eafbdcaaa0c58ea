use clap::Parser;
use miette::Result;
use pst::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => pst::cli::commands::init::run(args),
        Commands::Part(cmd) => pst::cli::commands::part::run(cmd, &cli.global),
        Commands::Stock(cmd) => pst::cli::commands::stock::run(cmd, &cli.global),
        Commands::Item(cmd) => pst::cli::commands::item::run(cmd, &cli.global),
        Commands::Completions(args) => pst::cli::commands::completions::run(args),
    }
}
