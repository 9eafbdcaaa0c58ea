//! `pst item` command - serialized items
//!
//! Anyone may view items and add comments; importing requires the
//! `item_admin` role, and status changes may require a role depending on the
//! configured status map.

use std::collections::BTreeMap;

use chrono::Utc;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde_yml::Value;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::helpers::{context, parse_partno, require_role, Ctx};
use crate::cli::output::{kv, row_error, separator, success};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::item::{Comment, Item};
use crate::import::Table as ImportTable;
use crate::status::StatusBook;
use crate::stock::store::Catalog;
use crate::stock::StockService;

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Import items from a CSV file (columns: serial, partno[, status][, project][, batch][, comment], ...)
    Import(ImportArgs),

    /// List items (available ones unless --all)
    List(ListArgs),

    /// Show one item
    Show(SerialArgs),

    /// Change an item's status
    Status(StatusArgs),

    /// Add a comment to an item
    Comment(CommentArgs),

    /// Set an item's project association
    Project(ProjectArgs),
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: std::path::PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Include unavailable items
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct SerialArgs {
    pub serial: String,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    pub serial: String,

    /// The new status
    pub status: String,

    /// Also set the project association
    #[arg(long, short = 'p')]
    pub project: Option<String>,

    /// Comment recorded alongside the change
    #[arg(long, short = 'm')]
    pub comment: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CommentArgs {
    pub serial: String,

    #[arg(long, short = 'm')]
    pub message: String,
}

#[derive(clap::Args, Debug)]
pub struct ProjectArgs {
    pub serial: String,

    pub project: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "SERIAL")]
    serial: String,
    #[tabled(rename = "PARTNO")]
    partno: String,
    #[tabled(rename = "PROJECT")]
    project: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "AVAILABLE")]
    available: &'static str,
}

/// Columns that map onto typed item fields rather than free-form extras
const CORE_COLUMNS: &[&str] = &["serial", "partno", "project", "status", "comment"];

/// Column names that would clash with managed item fields
const RESERVED_COLUMNS: &[&str] = &["comments", "available"];

pub fn run(cmd: ItemCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ItemCommands::Import(args) => run_import(args, global),
        ItemCommands::List(args) => run_list(args, global),
        ItemCommands::Show(args) => run_show(args, global),
        ItemCommands::Status(args) => run_status(args, global),
        ItemCommands::Comment(args) => run_comment(args, global),
        ItemCommands::Project(args) => run_project(args, global),
    }
}

fn load_item(ctx: &Ctx, serial: &str) -> Result<Item> {
    ctx.store
        .item(serial)
        .into_diagnostic()?
        .ok_or_else(|| miette::miette!("no item with serial '{}'", serial))
}

fn status_book(ctx: &Ctx) -> StatusBook {
    StatusBook::new(ctx.config.status_maps.clone())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    require_role(&ctx, "item_admin")?;

    let table =
        ImportTable::read(&args.file, &["serial", "partno"], RESERVED_COLUMNS).into_diagnostic()?;
    let book = status_book(&ctx);

    // validate every row before storing any item
    let mut failed = false;
    let mut prepared: Vec<Item> = Vec::new();
    for (index, row) in table.rows.iter().enumerate() {
        let number = ImportTable::row_number(index);
        match prepare_row(&ctx, &book, row, &prepared) {
            Ok(item) => prepared.push(item),
            Err(message) => {
                row_error(number, message);
                failed = true;
            }
        }
    }
    if failed {
        return Err(miette::miette!("item import aborted, no rows applied"));
    }

    // store the items, then reflect them in the stock counts
    let service = StockService::new(&ctx.store, &ctx.store);
    let mut quantities: BTreeMap<String, i64> = BTreeMap::new();
    for item in &prepared {
        ctx.store.put_item(item).into_diagnostic()?;

        let pn = parse_partno(&item.partno)?;
        *quantities.entry(pn.base_number().to_string()).or_insert(0) += 1;

        if let Some(batch) = item.extra.get("batch").and_then(Value::as_str) {
            service
                .update_batch(pn.base_number(), batch, 1)
                .into_diagnostic()?;
        }
    }
    for (partno, quantity) in &quantities {
        service
            .update_counts(partno, *quantity, None, "items added")
            .into_diagnostic()?;
    }

    success(format!("Imported {} item(s)", prepared.len()));
    Ok(())
}

/// Validate one import row and build the item document it describes.
fn prepare_row(
    ctx: &Ctx,
    book: &StatusBook,
    row: &crate::import::Row,
    already_prepared: &[Item],
) -> std::result::Result<Item, String> {
    let partno_text = row.get("partno").cloned().unwrap_or_default();
    let pn = parse_partno(&partno_text).map_err(|_| {
        format!("'{}' is not a valid part number", partno_text)
    })?;
    if !Catalog::exists(&ctx.store, pn.base_number())
        .map_err(|e| e.to_string())?
    {
        return Err(format!("unknown part number {}", pn.base_number()));
    }
    if pn.revision().is_none() {
        return Err("part number requires a revision".to_string());
    }

    let serial = row
        .get("serial")
        .cloned()
        .ok_or_else(|| "serial number is missing".to_string())?;
    let exists = ctx.store.item(&serial).map_err(|e| e.to_string())?.is_some()
        || already_prepared.iter().any(|item| item.serial == serial);
    if exists {
        return Err(format!("serial number '{}' exists already", serial));
    }

    // typed coercion of the non-core columns, per part family
    let mut fields: BTreeMap<String, Value> = row
        .iter()
        .filter(|(key, _)| !CORE_COLUMNS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), Value::from(value.as_str())))
        .collect();
    ctx.config
        .requirements(&pn)
        .apply(&mut fields)
        .map_err(|e| e.to_string())?;

    let mut item = Item::new(&serial, &pn.id());
    item.project = row.get("project").cloned().unwrap_or_default();
    if let Some(status) = row.get("status") {
        book.check_transition(&pn, "", status, &ctx.user, &ctx.caps)
            .map_err(|e| e.to_string())?;
        item.status = status.clone();
        item.available = !book.is_unavailable(&pn, status);
    }
    item.extra = fields;

    item.comments.push(Comment::new(&ctx.user, "[Auto] created"));
    if let Some(comment) = row.get("comment") {
        item.comments.push(Comment::new(&ctx.user, comment));
    }
    Ok(item)
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let items: Vec<Item> = ctx
        .store
        .list_items()
        .into_diagnostic()?
        .into_iter()
        .filter(|item| args.all || item.available)
        .collect();

    if items.is_empty() {
        println!("No items found.");
        return Ok(());
    }

    match global.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&items).into_diagnostic()?);
        }
        OutputFormat::Pretty => {
            let rows: Vec<ItemRow> = items
                .iter()
                .map(|item| ItemRow {
                    serial: item.serial.clone(),
                    partno: item.partno.clone(),
                    project: item.project.clone(),
                    status: item.status.clone(),
                    available: if item.available { "yes" } else { "no" },
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
            println!("{} item(s) found", items.len());
        }
    }
    Ok(())
}

fn run_show(args: SerialArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let item = load_item(&ctx, &args.serial)?;

    match global.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&item).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&item).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Pretty => {}
    }

    separator();
    kv("Serial", style(&item.serial).cyan());
    kv("Part", &item.partno);
    if let Ok(Some(part)) = ctx.store.part(parse_partno(&item.partno)?.base_number()) {
        kv("Name", style(&part.name).yellow());
    }
    if !item.project.is_empty() {
        kv("Project", &item.project);
    }
    kv(
        "Status",
        if item.status.is_empty() {
            "(none)"
        } else {
            item.status.as_str()
        },
    );
    kv("Available", if item.available { "yes" } else { "no" });

    if !item.extra.is_empty() {
        separator();
        for (key, value) in &item.extra {
            let rendered = match value.as_str() {
                Some(text) => text.to_string(),
                None => serde_yml::to_string(value)
                    .unwrap_or_default()
                    .trim_end()
                    .to_string(),
            };
            kv(key, rendered);
        }
    }

    if !item.comments.is_empty() {
        separator();
        println!("{} ({}):", style("Comments").bold(), item.comments.len());
        for comment in &item.comments {
            println!(
                "  {} {} - {}",
                comment.date.format("%Y-%m-%d %H:%M"),
                style(&comment.user).dim(),
                comment.message
            );
        }
    }
    Ok(())
}

fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let mut item = load_item(&ctx, &args.serial)?;
    let pn = parse_partno(&item.partno)?;

    let book = status_book(&ctx);
    let definition = book
        .check_transition(&pn, &item.status, &args.status, &ctx.user, &ctx.caps)
        .into_diagnostic()?;

    item.status = args.status.clone();
    item.available = !definition.unavailable;
    if let Some(project) = &args.project {
        item.project = project.clone();
    }

    let now = Utc::now();
    item.comments.push(Comment::at(
        &ctx.user,
        &format!("[Auto] changed status to '{}'", args.status),
        now,
    ));
    if let Some(comment) = &args.comment {
        item.comments.push(Comment::at(&ctx.user, comment, now));
    }

    ctx.store.put_item(&item).into_diagnostic()?;
    success(format!(
        "Item {} is now '{}'{}",
        style(&item.serial).cyan(),
        args.status,
        if item.available { "" } else { " (unavailable)" }
    ));
    Ok(())
}

fn run_comment(args: CommentArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let mut item = load_item(&ctx, &args.serial)?;

    item.comments.push(Comment::new(&ctx.user, &args.message));
    ctx.store.put_item(&item).into_diagnostic()?;

    success(format!("Comment added to {}", style(&item.serial).cyan()));
    Ok(())
}

fn run_project(args: ProjectArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = context(global)?;
    let mut item = load_item(&ctx, &args.serial)?;

    item.project = args.project.clone();
    item.comments.push(Comment::new(
        &ctx.user,
        &format!("[Auto] changed project association to '{}'", args.project),
    ));
    ctx.store.put_item(&item).into_diagnostic()?;

    success(format!(
        "Item {} assigned to project '{}'",
        style(&item.serial).cyan(),
        args.project
    ));
    Ok(())
}
