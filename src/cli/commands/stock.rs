//! `pst stock` command - stock counts, BOMs and batches
//!
//! Stock entries are keyed by the revisionless base part number. Anyone may
//! view the stock; changing counts or BOM rules requires the `stock_admin`
//! role when a team roster is configured.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{context, parse_partno, require_role, Ctx};
use crate::cli::output::{kv, row_error, separator, success};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::import::Table as ImportTable;
use crate::stock::store::{Catalog, StockChange, StockStore};
use crate::stock::StockService;

#[derive(Subcommand, Debug)]
pub enum StockCommands {
    /// List all stock entries
    List(ListArgs),

    /// Show one part's stock entry, BOM and batches
    Show(ShowArgs),

    /// Add (or with a negative quantity, remove) units of a part
    Add(AddArgs),

    /// Correct a part's count to an absolute value
    Correct(CorrectArgs),

    /// Replace a part's BOM
    SetBom(SetBomArgs),

    /// Show a part's stock history
    History(ShowArgs),

    /// Import counts from a CSV file (columns: partno, quantity[, batch][, comment])
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Part number (revision letters are ignored for stock)
    pub partno: String,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    pub partno: String,

    /// Quantity to add
    #[arg(long, short = 'q', allow_hyphen_values = true)]
    pub quantity: i64,

    /// Batch name to attribute the addition to
    #[arg(long, short = 'b', default_value = "")]
    pub batch: String,

    #[arg(long, short = 'm', default_value = "added to stock")]
    pub message: String,
}

#[derive(clap::Args, Debug)]
pub struct CorrectArgs {
    pub partno: String,

    /// New absolute quantity
    #[arg(long, short = 'q', allow_hyphen_values = true)]
    pub quantity: i64,

    /// Comment appended to the ledger message
    #[arg(long, short = 'm')]
    pub comment: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetBomArgs {
    /// The assembly whose BOM is replaced
    pub partno: String,

    /// BOM line as CHILD=MULTIPLIER (repeatable)
    #[arg(long, short = 'l')]
    pub line: Vec<String>,

    /// CSV file with columns partno, quantity
    #[arg(long, short = 'f')]
    pub file: Option<std::path::PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: std::path::PathBuf,

    /// Treat quantities as absolute corrections instead of additions
    #[arg(long)]
    pub correct: bool,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "PARTNO")]
    partno: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "QUANTITY")]
    quantity: i64,
    #[tabled(rename = "BOM")]
    bom: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "CHANGE")]
    change: String,
    #[tabled(rename = "MESSAGE")]
    message: String,
}

pub fn run(cmd: StockCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        StockCommands::List(_) => run_list(global),
        StockCommands::Show(args) => run_show(args, global),
        StockCommands::Add(args) => run_add(args, global),
        StockCommands::Correct(args) => run_correct(args, global),
        StockCommands::SetBom(args) => run_set_bom(args, global),
        StockCommands::History(args) => run_history(args, global),
        StockCommands::Import(args) => run_import(args, global),
    }
}

fn part_name(ctx: &Ctx, partno: &str) -> String {
    ctx.store
        .part(partno)
        .ok()
        .flatten()
        .map(|part| part.name)
        .unwrap_or_default()
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let entries = ctx.store.list_entries().into_diagnostic()?;

    if entries.is_empty() {
        println!("No stock entries found.");
        return Ok(());
    }

    match global.output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&entries).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&entries).into_diagnostic()?);
        }
        OutputFormat::Pretty => {
            let rows: Vec<EntryRow> = entries
                .iter()
                .map(|entry| EntryRow {
                    partno: entry.partno.clone(),
                    name: part_name(&ctx, &entry.partno),
                    quantity: entry.quantity,
                    bom: if entry.bom.is_empty() {
                        String::new()
                    } else {
                        format!("{} line(s)", entry.bom.len())
                    },
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
            println!("{} stock entry(s) found", entries.len());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let pn = parse_partno(&args.partno)?;
    let base = pn.base_number();

    let entry = ctx
        .store
        .entry(base)
        .into_diagnostic()?
        .ok_or_else(|| miette::miette!("no stock entry for {}", base))?;

    match global.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entry).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&entry).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Pretty => {}
    }

    separator();
    kv("Part", style(base).cyan());
    let name = part_name(&ctx, base);
    if !name.is_empty() {
        kv("Name", style(&name).yellow());
    }
    kv("Quantity", entry.quantity);
    separator();

    if !entry.bom.is_empty() {
        println!("{}:", style("BOM").bold());
        for line in &entry.bom {
            let child_name = part_name(&ctx, &line.partno);
            println!("  {} ×{}  {}", line.partno, line.quantity, child_name);
        }
    }

    let batches = ctx.store.batches(base).into_diagnostic()?;
    if !batches.is_empty() {
        println!("{}:", style("Batches").bold());
        for batch in &batches {
            println!("  {}  {}", batch.name, batch.quantity);
        }
    }
    Ok(())
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "stock_admin")?;

    let pn = parse_partno(&args.partno)?;
    let service = StockService::new(&ctx.store, &ctx.store);
    service
        .update_counts(
            pn.base_number(),
            args.quantity,
            Some(args.batch.as_str()),
            &args.message,
        )
        .into_diagnostic()?;

    success(format!(
        "Stock of {} changed by {}",
        style(pn.base_number()).cyan(),
        args.quantity
    ));
    Ok(())
}

fn run_correct(args: CorrectArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "stock_admin")?;

    let pn = parse_partno(&args.partno)?;
    let base = pn.base_number();
    if !Catalog::exists(&ctx.store, base).into_diagnostic()? {
        return Err(miette::miette!("unknown part number {}", base));
    }

    let current = ctx
        .store
        .entry(base)
        .into_diagnostic()?
        .map(|entry| entry.quantity)
        .unwrap_or(0);

    if !global.yes {
        let proceed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "You are about to override the existing stock of {} ({} -> {}). Continue?",
                base, current, args.quantity
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !proceed {
            return Ok(());
        }
    }

    let mut message = "stock correction".to_string();
    if let Some(comment) = &args.comment {
        message.push_str(&format!(" ({})", comment));
    }

    let service = StockService::new(&ctx.store, &ctx.store);
    service
        .correct_counts(base, args.quantity, &message)
        .into_diagnostic()?;

    success(format!(
        "Stock of {} set to {}",
        style(base).cyan(),
        args.quantity
    ));
    Ok(())
}

fn run_set_bom(args: SetBomArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "stock_admin")?;

    let pn = parse_partno(&args.partno)?;
    let mut lines: Vec<(String, String)> = Vec::new();

    for raw in &args.line {
        let (child, multiplier) = raw
            .split_once('=')
            .ok_or_else(|| miette::miette!("BOM line '{}' is not CHILD=MULTIPLIER", raw))?;
        lines.push((child.trim().to_string(), multiplier.trim().to_string()));
    }

    if let Some(file) = &args.file {
        let table = ImportTable::read(file, &["partno", "quantity"], &[]).into_diagnostic()?;
        for row in &table.rows {
            lines.push((
                row.get("partno").cloned().unwrap_or_default(),
                row.get("quantity").cloned().unwrap_or_default(),
            ));
        }
    }

    if lines.is_empty() {
        return Err(miette::miette!(
            "no BOM lines given; use --line CHILD=MULTIPLIER or --file"
        ));
    }

    let service = StockService::new(&ctx.store, &ctx.store);
    service
        .set_bom(pn.base_number(), &lines)
        .into_diagnostic()?;

    success(format!(
        "BOM of {} replaced ({} line(s))",
        style(pn.base_number()).cyan(),
        lines.len()
    ));
    Ok(())
}

fn run_history(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let pn = parse_partno(&args.partno)?;
    let records = ctx.store.history(pn.base_number()).into_diagnostic()?;

    if records.is_empty() {
        println!("No history for {}.", pn.base_number());
        return Ok(());
    }

    match global.output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&records).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&records).into_diagnostic()?);
        }
        OutputFormat::Pretty => {
            let rows: Vec<HistoryRow> = records
                .iter()
                .map(|record| HistoryRow {
                    date: record.date.format("%Y-%m-%d %H:%M:%S").to_string(),
                    change: match record.change {
                        StockChange::Delta { delta } => format!("{:+}", delta),
                        StockChange::Absolute { quantity } => format!("={}", quantity),
                    },
                    message: record.message.clone(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
        }
    }
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "stock_admin")?;

    let table =
        ImportTable::read(&args.file, &["partno", "quantity"], &[]).into_diagnostic()?;

    // validate every row before applying any of them
    let mut parsed: Vec<(String, i64, Option<String>, Option<String>)> = Vec::new();
    let mut failed = false;
    for (index, row) in table.rows.iter().enumerate() {
        let number = ImportTable::row_number(index);
        let partno = row.get("partno").cloned().unwrap_or_default();

        let base = match parse_partno(&partno) {
            Ok(pn) => pn.base_number().to_string(),
            Err(_) => {
                row_error(number, format!("'{}' is not a valid part number", partno));
                failed = true;
                continue;
            }
        };
        if !Catalog::exists(&ctx.store, &base).into_diagnostic()? {
            row_error(number, format!("unknown part number {}", base));
            failed = true;
            continue;
        }

        // quantity is optional, zero if missing
        let quantity = match row.get("quantity").map(String::as_str).unwrap_or("0").parse::<i64>() {
            Ok(quantity) if quantity >= 0 => quantity,
            Ok(_) => {
                row_error(number, "quantity must be non-negative");
                failed = true;
                continue;
            }
            Err(_) => {
                row_error(number, "quantity must be an integer");
                failed = true;
                continue;
            }
        };

        parsed.push((
            base,
            quantity,
            row.get("batch").cloned(),
            row.get("comment").cloned(),
        ));
    }
    if failed {
        return Err(miette::miette!("stock import aborted, no rows applied"));
    }

    let service = StockService::new(&ctx.store, &ctx.store);
    for (partno, quantity, batch, comment) in &parsed {
        if *quantity == 0 && !args.correct {
            continue;
        }
        if args.correct {
            let message = comment.as_deref().unwrap_or("manual correction");
            service
                .correct_counts(partno, *quantity, message)
                .into_diagnostic()?;
        } else {
            let message = comment.as_deref().unwrap_or("added to stock");
            service
                .update_counts(partno, *quantity, batch.as_deref(), message)
                .into_diagnostic()?;
        }
    }

    success(format!(
        "Stock {} successful ({} row(s))",
        if args.correct { "correction" } else { "import" },
        parsed.len()
    ));
    Ok(())
}
