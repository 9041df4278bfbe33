mod dates;
mod docx;
mod fsio;
mod ftp;
mod ops;
mod page;
mod settings;
mod slug;

use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::ops::{
    canonical, clean_spacing, convert, export_docx, fix_docx_ids, flag_audit, flag_sync, images,
    lead, propagate, publish, renumber,
};
use crate::page::Lang;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "blogsync", about = "Maintenance steps for the bilingual RO/EN blog")]
struct Cli {
    /// Configuration file (default: ./blogsync.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit and reassign article IDs of one language
    Renumber {
        #[arg(short, long, value_enum)]
        lang: Lang,
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove whitespace after paragraph opening tags in the RO and EN folders
    CleanSpacing {
        #[arg(long)]
        dry_run: bool,
    },
    /// Collect RO articles into one Word document for translation
    ExportDocx {
        /// Document to write
        #[arg(short, long)]
        out: PathBuf,
        /// RO file names, looked up in ro_dir
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// Correct the article IDs of a translation document against the RO articles
    FixDocxIds {
        #[arg(long)]
        docx: PathBuf,
        /// Write the corrected document here instead of in place
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Turn a translated Word document into EN article pages
    Convert {
        #[arg(long)]
        docx: PathBuf,
        /// HTML template (default: the configured one)
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output folder (default: output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Byline date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Cross-link RO articles and their fresh EN translations by ID
    SyncFlags {
        #[arg(long)]
        dry_run: bool,
    },
    /// Check the language links of every RO article against its EN page
    CheckFlags {
        /// Rename files and rewrite wrong links
        #[arg(long)]
        fix: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Point canonical links and own flag links of RO and EN pages at their file names
    FixCanonical {
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy date and category from RO articles into their EN translations
    PropagateMeta {
        #[arg(long)]
        dry_run: bool,
    },
    /// Publish converted articles into the EN site and stage them for upload
    Publish {
        /// Reference date for the index window, YYYY-MM-DD (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Turn h3 leads into emphasized h2 leads (default folder: backup_dir)
    NormalizeLead {
        dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Give EN pages the article image of their RO counterpart (default folder: backup_dir)
    SyncImages {
        dir: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Upload staged pages over FTP and copy them to the local mirror
    Upload {
        /// Folder to upload (default: backup_dir)
        #[arg(short, long)]
        source: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy converted pages from output_dir into en_dir
    Stage {
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let today = Local::now().date_naive();

    let result = match cli.command {
        Commands::Renumber { lang, dry_run } => {
            let report = renumber::run(&settings, lang, dry_run)?;
            let (_, max) = settings.id_range(lang);
            report.print(max);
            if lang == Lang::Ro {
                println!("\nCleaning paragraph spacing...");
                clean_spacing::print(&clean_spacing::run(&settings.scan_dirs(Lang::Ro), dry_run)?);
            }
            Ok(())
        }
        Commands::CleanSpacing { dry_run } => {
            let dirs = [settings.ro_dir.clone(), settings.en_dir.clone()];
            clean_spacing::print(&clean_spacing::run(&dirs, dry_run)?);
            Ok(())
        }
        Commands::ExportDocx { out, files } => {
            export_docx::run(&settings, &files, &out)?.print();
            Ok(())
        }
        Commands::FixDocxIds { docx, out, dry_run } => {
            fix_docx_ids::run(&settings, &docx, out.as_deref(), dry_run)?.print();
            Ok(())
        }
        Commands::Convert {
            docx,
            template,
            out,
            date,
            dry_run,
        } => {
            let template = template.unwrap_or_else(|| settings.template.clone());
            let out = out.unwrap_or_else(|| settings.output_dir.clone());
            let date = date.unwrap_or(today);
            convert::run(&settings, &docx, &template, &out, date, dry_run)?.print();
            Ok(())
        }
        Commands::SyncFlags { dry_run } => {
            flag_sync::run(&settings, dry_run)?.print();
            Ok(())
        }
        Commands::CheckFlags { fix, dry_run } => {
            flag_audit::run(&settings, fix, dry_run)?.print();
            Ok(())
        }
        Commands::FixCanonical { dry_run } => {
            canonical::run(&settings, dry_run)?.print();
            Ok(())
        }
        Commands::PropagateMeta { dry_run } => {
            propagate::run(&settings, dry_run)?.print();
            Ok(())
        }
        Commands::Publish {
            today: reference,
            dry_run,
        } => {
            publish::run(&settings, reference.unwrap_or(today), dry_run)?.print();
            Ok(())
        }
        Commands::NormalizeLead { dir, dry_run } => {
            let dir = dir.unwrap_or_else(|| settings.backup_dir.clone());
            lead::run(&dir, dry_run)?.print();
            Ok(())
        }
        Commands::SyncImages { dir, dry_run } => {
            let dir = dir.unwrap_or_else(|| settings.backup_dir.clone());
            images::run(&settings, &dir, dry_run)?.print();
            Ok(())
        }
        Commands::Upload { source, dry_run } => {
            let source = source.unwrap_or_else(|| settings.backup_dir.clone());
            ftp::upload(&settings, &source, dry_run)?.print();
            Ok(())
        }
        Commands::Stage { dry_run } => {
            ftp::stage(&settings, dry_run)?.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
