//! `pst part` command - catalog part definitions

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{context, parse_partno, require_role};
use crate::cli::output::{kv, separator, success};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::part::{Part, SourceRef};

#[derive(Subcommand, Debug)]
pub enum PartCommands {
    /// Create a new part definition (starts at revision 'a')
    New(NewArgs),

    /// List part definitions
    List(ListArgs),

    /// Show a part definition
    Show(ShowArgs),

    /// Append a new revision to a part
    Revise(ReviseArgs),

    /// Mark a part as released
    Release(FlagArgs),

    /// Mark a part as obsolete
    Obsolete(FlagArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Base part number (no revision letter)
    pub partno: String,

    /// Descriptive name
    #[arg(long, short = 'n')]
    pub name: String,

    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    #[arg(long, short = 'c', default_value = "")]
    pub category: String,

    /// Supplier as NAME or NAME=THEIR_PARTNO (repeatable)
    #[arg(long)]
    pub supplier: Vec<String>,

    /// Manufacturer as NAME or NAME=THEIR_PARTNO (repeatable)
    #[arg(long)]
    pub manufacturer: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include obsolete parts
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Part number, optionally with a revision letter
    pub partno: String,
}

#[derive(clap::Args, Debug)]
pub struct ReviseArgs {
    /// Base part number
    pub partno: String,

    /// What changed in this revision
    #[arg(long, short = 'm')]
    pub message: String,
}

#[derive(clap::Args, Debug)]
pub struct FlagArgs {
    /// Base part number
    pub partno: String,
}

#[derive(Tabled)]
struct PartRow {
    #[tabled(rename = "PARTNO")]
    partno: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "REV")]
    revision: char,
    #[tabled(rename = "FLAGS")]
    flags: String,
}

pub fn run(cmd: PartCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PartCommands::New(args) => run_new(args, global),
        PartCommands::List(args) => run_list(args, global),
        PartCommands::Show(args) => run_show(args, global),
        PartCommands::Revise(args) => run_revise(args, global),
        PartCommands::Release(args) => run_flag(args, global, Flag::Release),
        PartCommands::Obsolete(args) => run_flag(args, global, Flag::Obsolete),
    }
}

fn parse_source(text: &str) -> SourceRef {
    match text.split_once('=') {
        Some((name, partno)) => SourceRef {
            name: name.trim().to_string(),
            partno: Some(partno.trim().to_string()),
        },
        None => SourceRef {
            name: text.trim().to_string(),
            partno: None,
        },
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "component_edit")?;

    let pn = parse_partno(&args.partno)?;
    if pn.revision().is_some() {
        return Err(miette::miette!(
            "a part is created without a revision letter; '{}' carries one",
            args.partno
        ));
    }
    if ctx.store.part(pn.base_number()).into_diagnostic()?.is_some() {
        return Err(miette::miette!("part {} exists already", pn.base_number()));
    }

    let mut part = Part::new(pn.base_number(), &args.name, &ctx.user);
    part.description = args.description;
    part.category = args.category;
    part.suppliers = args.supplier.iter().map(|s| parse_source(s)).collect();
    part.manufacturers = args.manufacturer.iter().map(|s| parse_source(s)).collect();
    ctx.store.put_part(&part).into_diagnostic()?;

    success(format!(
        "Created part {} ({})",
        style(pn.base_number()).cyan(),
        style(&part.name).yellow()
    ));
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let parts: Vec<Part> = ctx
        .store
        .list_parts()
        .into_diagnostic()?
        .into_iter()
        .filter(|part| args.all || !part.obsolete)
        .collect();

    if parts.is_empty() {
        println!("No parts found.");
        return Ok(());
    }

    match global.output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&parts).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&parts).into_diagnostic()?);
        }
        OutputFormat::Pretty => {
            let rows: Vec<PartRow> = parts
                .iter()
                .map(|part| PartRow {
                    partno: part.partno.clone(),
                    name: part.name.clone(),
                    category: part.category.clone(),
                    revision: crate::core::PartNumber::revision_repr(part.active_revision()),
                    flags: match (part.released, part.obsolete) {
                        (_, true) => "obsolete".to_string(),
                        (true, false) => "released".to_string(),
                        (false, false) => String::new(),
                    },
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
            println!("{} part(s) found", parts.len());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let mut pn = parse_partno(&args.partno)?;

    let part = ctx
        .store
        .part(pn.base_number())
        .into_diagnostic()?
        .ok_or_else(|| miette::miette!("unknown part number {}", pn.base_number()))?;

    match global.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&part).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&part).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Pretty => {}
    }

    pn.set_revision_count(part.revisions.len().max(1));

    separator();
    kv("Part", style(&pn.id()).cyan());
    kv("Name", style(&part.name).yellow());
    if !part.category.is_empty() {
        kv("Category", &part.category);
    }
    if !part.description.is_empty() {
        kv("Description", &part.description);
    }
    if part.released {
        kv("Released", "yes");
    }
    if part.obsolete {
        kv("Obsolete", "yes");
    }
    if pn.is_outdated().into_diagnostic()? {
        println!(
            "{}",
            style(format!(
                "Revision {} is outdated; the active revision is {}",
                pn.id(),
                pn.revision_id(part.active_revision())
            ))
            .red()
        );
    }
    separator();

    println!("{} ({}):", style("Revisions").bold(), part.revisions.len());
    for (index, revision) in part.revisions.iter().enumerate() {
        let marker = if index == part.active_revision() {
            " (active)"
        } else {
            ""
        };
        println!(
            "  {} {} - {}{}",
            crate::core::PartNumber::revision_repr(index),
            revision.created.format("%Y-%m-%d"),
            revision.description,
            marker
        );
    }

    for (label, sources) in [
        ("Suppliers", &part.suppliers),
        ("Manufacturers", &part.manufacturers),
    ] {
        if !sources.is_empty() {
            println!("{}:", style(label).bold());
            for source in sources {
                match &source.partno {
                    Some(their) => println!("  • {} ({})", source.name, their),
                    None => println!("  • {}", source.name),
                }
            }
        }
    }

    separator();
    kv("Author", &part.author);
    kv("Created", part.created.format("%Y-%m-%d %H:%M"));
    Ok(())
}

fn run_revise(args: ReviseArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "component_edit")?;

    let pn = parse_partno(&args.partno)?;
    let mut part = ctx
        .store
        .part(pn.base_number())
        .into_diagnostic()?
        .ok_or_else(|| miette::miette!("unknown part number {}", pn.base_number()))?;
    if part.obsolete {
        return Err(miette::miette!(
            "part {} is obsolete and cannot be revised",
            part.partno
        ));
    }

    part.revise(&args.message);
    ctx.store.put_part(&part).into_diagnostic()?;

    success(format!(
        "Part {} is now at revision {}",
        style(&part.partno).cyan(),
        crate::core::PartNumber::revision_repr(part.active_revision())
    ));
    Ok(())
}

enum Flag {
    Release,
    Obsolete,
}

fn run_flag(args: FlagArgs, global: &GlobalOpts, flag: Flag) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "component_admin")?;

    let pn = parse_partno(&args.partno)?;
    let mut part = ctx
        .store
        .part(pn.base_number())
        .into_diagnostic()?
        .ok_or_else(|| miette::miette!("unknown part number {}", pn.base_number()))?;

    let label = match flag {
        Flag::Release => {
            part.released = true;
            "released"
        }
        Flag::Obsolete => {
            part.obsolete = true;
            "obsolete"
        }
    };
    ctx.store.put_part(&part).into_diagnostic()?;

    success(format!("Part {} marked {}", style(&part.partno).cyan(), label));
    Ok(())
}
