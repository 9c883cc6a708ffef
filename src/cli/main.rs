use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use filetagger::config::{Config, TAG_SLOTS};
use filetagger::exif::{self, CorruptMetadataPolicy, GpsCoords, PhotoSummary};
use filetagger::{files, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "filetagger",
    version,
    about = "Rename and tag photos, edit EXIF capture dates and GPS, and suggest tags from maps and reverse image search"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// What to do with unreadable EXIF data: abort (default) or discard
    #[arg(long = "on-corrupt", value_name = "POLICY", global = true)]
    on_corrupt: Option<CorruptMetadataPolicy>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config.json and exit
    Init,
    /// List matching images in a folder (default: the last folder listed)
    List { folder: Option<PathBuf> },
    /// Show file facts and EXIF date, camera and GPS
    Show {
        #[arg(required = true, value_name = "FILE")]
        paths: Vec<PathBuf>,
    },
    /// Set the capture date, formatted YYYY:MM:DD HH:MM:SS
    SetDate { file: PathBuf, date: String },
    /// Set GPS coordinates in decimal degrees
    SetGps {
        file: PathBuf,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
    /// Look up a place name and store its coordinates
    Geotag {
        file: PathBuf,
        place: String,
        /// Replace coordinates the image already has
        #[arg(long)]
        force: bool,
    },
    /// Suggest tags from the image's GPS position
    PlaceTags {
        file: PathBuf,
        /// Store the suggestions in the tag slots
        #[arg(long)]
        save: bool,
    },
    /// Suggest tags with Google Lens reverse image search
    LensTags {
        file: PathBuf,
        /// Store the suggestions in the tag slots
        #[arg(long)]
        save: bool,
    },
    /// Show the tag slots
    Tags,
    /// Set the text of a tag slot (1-based)
    SetTag { slot: usize, text: String },
    /// Append a tag slot's text to file names
    ApplyTag {
        slot: usize,
        #[arg(required = true, value_name = "FILE")]
        paths: Vec<PathBuf>,
    },
    /// Rename a file, keeping its extension
    Rename { file: PathBuf, name: String },
    /// Move a file into the archive folder
    Archive {
        file: PathBuf,
        /// Folder that holds the archive folder (default: the last folder listed)
        #[arg(long, value_name = "FOLDER")]
        root: Option<PathBuf>,
    },
    /// Move the most recently archived file back
    UndoArchive,
    /// Show or set the listed extensions, e.g. "jpg;png;webp"
    Extensions { list: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config_path = cli.config.as_deref();

    if matches!(cli.command, Command::Init) {
        let config = Config::default();
        config.save(config_path)?;
        let save_path = match config_path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let mut config = Config::load(config_path)?;
    let policy = cli.on_corrupt.unwrap_or(config.on_corrupt_metadata);

    match cli.command {
        Command::Init => {}

        Command::List { folder } => {
            let folder = folder
                .or_else(|| config.last_folder.clone())
                .context("No folder given and none listed before")?;
            let images =
                files::collect_images(&folder, &config.allowed_extensions, &config.archive_folder)?;

            if cli.json {
                let rel: Vec<String> = images.iter().map(|p| relative(&folder, p)).collect();
                println!("{}", serde_json::to_string_pretty(&rel)?);
            } else {
                println!("{BOLD}Folder:{RESET} {}", folder.display());
                for image in &images {
                    println!("  {}", relative(&folder, image));
                }
                println!("{DIM}Files: {}{RESET}", images.len());
            }

            config.last_folder = Some(folder);
            config.save(config_path)?;
        }

        Command::Show { paths } => {
            let mut summaries = Vec::new();
            for file in &paths {
                summaries.push(exif::read_summary(file)?);
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for summary in &summaries {
                    print_summary(summary);
                }
            }
        }

        Command::SetDate { file, date } => {
            pipeline::set_capture_date(&file, &date, policy)?;
            println!("{GREEN}Capture date set:{RESET} {}", date.trim());
        }

        Command::SetGps {
            file,
            latitude,
            longitude,
        } => {
            pipeline::set_gps(&file, GpsCoords { latitude, longitude }, policy)?;
            println!("{GREEN}GPS set:{RESET} {latitude:.6}, {longitude:.6}");
        }

        Command::Geotag { file, place, force } => {
            let geocoder = pipeline::build_geocoder(&config)?;
            let outcome = pipeline::geotag(&file, &place, &geocoder, force, policy).await?;
            match outcome {
                pipeline::GeotagOutcome::Written(coords) => {
                    if cli.json {
                        println!("{}", serde_json::json!({ "written": true, "gps": coords }));
                    } else {
                        println!(
                            "{GREEN}GPS set:{RESET} {:.6}, {:.6}  {DIM}{}{RESET}",
                            coords.latitude,
                            coords.longitude,
                            exif::maps_url(coords)
                        );
                    }
                }
                pipeline::GeotagOutcome::Skipped { existing } => {
                    if cli.json {
                        println!("{}", serde_json::json!({ "written": false, "gps": existing }));
                    } else {
                        println!(
                            "{DIM}Already tagged at {:.6}, {:.6}; use --force to replace{RESET}",
                            existing.latitude, existing.longitude
                        );
                    }
                }
            }
        }

        Command::PlaceTags { file, save } => {
            let geocoder = pipeline::build_geocoder(&config)?;
            let tags = pipeline::place_tags_for(&file, &geocoder, TAG_SLOTS, policy).await?;
            report_suggestions(&mut config, config_path, &tags, save, cli.json)?;
        }

        Command::LensTags { file, save } => {
            let search = pipeline::build_image_search(&config)?;
            let tags = pipeline::lens_tags_for(&file, &search, TAG_SLOTS).await?;
            report_suggestions(&mut config, config_path, &tags, save, cli.json)?;
        }

        Command::Tags => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config.tags)?);
            } else {
                print_tags(&config);
            }
        }

        Command::SetTag { slot, text } => {
            config.set_tag(slot, &text)?;
            config.save(config_path)?;
            println!("{GREEN}Tag {slot}:{RESET} {text}");
        }

        Command::ApplyTag { slot, paths } => {
            let tag = config.tag(slot)?.to_string();
            if tag.is_empty() {
                anyhow::bail!("Tag slot {slot} is empty; set it first with `set-tag {slot} <TEXT>`");
            }
            let total = paths.len();
            let mut failed = 0;
            for file in &paths {
                match files::append_tag(file, &tag) {
                    Ok(renamed) => println!("  {} -> {}", file.display(), renamed.display()),
                    Err(e) => {
                        failed += 1;
                        log::error!("{e:#}");
                    }
                }
            }
            log::info!("Done: {} renamed, {failed} failed", total - failed);
        }

        Command::Rename { file, name } => {
            let renamed = files::rename_stem(&file, &name)?;
            println!("  {} -> {}", file.display(), renamed.display());
        }

        Command::Archive { file, root } => {
            let root = root
                .or_else(|| config.last_folder.clone())
                .or_else(|| file.parent().map(Path::to_path_buf))
                .context("Cannot tell which folder to archive into; pass --root")?;
            let record = files::archive(&file, &root, &config.archive_folder)?;
            println!(
                "{GREEN}Archived:{RESET} {}",
                record.archived.display()
            );
            config.archived_files.push(record);
            config.save(config_path)?;
        }

        Command::UndoArchive => {
            let undone = files::undo_archive(&mut config.archived_files);
            // The history may have changed either way.
            config.save(config_path)?;
            match undone? {
                Some(record) => println!("{GREEN}Restored:{RESET} {}", record.original.display()),
                None => println!("{DIM}Nothing to undo{RESET}"),
            }
        }

        Command::Extensions { list } => {
            if let Some(list) = list {
                config.set_extensions(&list);
                config.save(config_path)?;
            }
            println!("{}", config.allowed_extensions.join(";"));
        }
    }

    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn report_suggestions(
    config: &mut Config,
    config_path: Option<&Path>,
    tags: &[String],
    save: bool,
    json: bool,
) -> Result<()> {
    if save {
        config.fill_tags(tags);
        config.save(config_path)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(tags)?);
        return Ok(());
    }

    println!("  {BOLD}Suggested tags{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    for (i, tag) in tags.iter().enumerate() {
        print_row(&format!("{}", i + 1), tag);
    }
    if save {
        println!("  {GREEN}*{RESET} saved to tag slots 1-{}", tags.len());
    }
    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

fn print_summary(summary: &PhotoSummary) {
    println!();
    println!("{BOLD}File:{RESET} {}", summary.path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    println!("  {BOLD}File{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    print_row("Image size", &summary.dimensions_label());
    print_optional("Last modified", summary.modified.as_deref());
    println!();

    println!("  {BOLD}Camera / Capture{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    print_optional("Capture date", summary.capture_date.as_deref());
    print_optional("Make", summary.make.as_deref());
    print_optional("Model", summary.model.as_deref());
    println!();

    println!("  {BOLD}GPS{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    print_optional("Latitude", summary.latitude.map(|v| format!("{v:.6}")).as_deref());
    print_optional("Longitude", summary.longitude.map(|v| format!("{v:.6}")).as_deref());
    if let Some(url) = summary.maps_url() {
        print_row("Map", &url);
    }
    println!();

    if let Some(warning) = &summary.warning {
        println!("  {DIM}warning: {warning}{RESET}");
        println!();
    }
}

fn print_tags(config: &Config) {
    println!("  {BOLD}Tag slots{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    for (i, tag) in config.tags.iter().enumerate() {
        print_optional(&format!("{}", i + 1), Some(tag.as_str()).filter(|t| !t.is_empty()));
    }
}

/// Print a row, or "N/A" when there is no value.
fn print_optional(tag: &str, value: Option<&str>) {
    match value {
        Some(v) => print_row(tag, v),
        None => println!("  {DIM}{:<22} : N/A{RESET}", tag),
    }
}

/// Print a single row in the display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    for (i, line) in wrap_text(val, VAL_WIDTH).iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in s.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= max_width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
