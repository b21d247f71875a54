use std::{env, path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use maquetes_admin::{
    entities::{image::SelectedFile, maquete::{MaqueteForm, MaqueteId}},
    feedback::{AssumeYes, Confirmer, StdinConfirmer, TracingNotifier},
    settings::AppConfig,
    use_cases::gallery::{DeleteOutcome, GalleryView},
    AppState,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: maquetes-admin [--yes] <command>

Commands:
  health                              database status of the backend
  list                                list maquetes
  kpis                                totals with and without a main image
  show <id>                           print one maquete
  create <form.json> [images...]      create a maquete and link secondary images
  update <id> <form.json>             replace the fields of a maquete
  delete <id>                         delete a maquete
  gallery <id>                        list the secondary images of a maquete
  add-images <id> <images...>         upload and link images one by one
  remove-image <id> <image-id>        unlink a secondary image";

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_id(raw: Option<&String>) -> anyhow::Result<MaqueteId> {
    let raw = raw.context("missing id")?;
    raw.parse().with_context(|| format!("invalid id: {}", raw))
}

async fn read_form(path: Option<&String>) -> anyhow::Result<MaqueteForm> {
    let path = path.context("missing form file")?;
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a valid maquete form", path))
}

fn selected_files(paths: &[String]) -> Vec<SelectedFile> {
    paths.iter().map(PathBuf::from).map(SelectedFile::from_path).collect()
}

fn print_gallery(view: &GalleryView) {
    match view {
        GalleryView::Placeholder => println!("Select a maquete"),
        GalleryView::Empty => println!("No images"),
        GalleryView::Images(items) => {
            for item in items {
                println!(
                    "#{}\t{}\t{}",
                    item.id,
                    item.public_id,
                    item.display_url.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config);
    tracing::debug!("Loaded configuration: {:?}", config);

    let mut args: Vec<String> = env::args().skip(1).collect();
    let assume_yes = args.iter().any(|a| a == "--yes" || a == "-y");
    args.retain(|a| a != "--yes" && a != "-y");

    let confirmer: Box<dyn Confirmer> = if assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirmer)
    };

    let app = AppState::new(config, Arc::new(TracingNotifier))?;

    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };

    match command {
        "health" => println!("{}", app.catalog().health().await),
        "list" => {
            let catalog = app.catalog();
            let maquetes = catalog.list().await?;
            if maquetes.is_empty() {
                println!("No maquetes registered");
            }
            for m in &maquetes {
                println!(
                    "#{}\t{}\t{}\t{}\t{}",
                    m.id,
                    m.title(),
                    m.escala.as_deref().unwrap_or(""),
                    m.proprietario.as_deref().unwrap_or(""),
                    catalog.card_image(m).as_deref().unwrap_or("-")
                );
            }
        }
        "kpis" => match app.catalog().kpis().await {
            Ok(kpis) => println!(
                "total: {}\nwith image: {}\nwithout image: {}",
                kpis.total, kpis.with_image, kpis.without_image
            ),
            Err(e) => {
                tracing::warn!("Could not load KPIs: {}", e);
                println!("total: -\nwith image: -\nwithout image: -");
            }
        },
        "show" => {
            let id = parse_id(args.get(1))?;
            let maquete = app.edit_form(id).load().await?;
            println!("{}", serde_json::to_string_pretty(&maquete)?);
        }
        "create" => {
            let form = read_form(args.get(1)).await?;
            let controller = app.create_form();
            controller.staged().add_files(selected_files(&args[2.min(args.len())..]));

            let report = controller.submit(form).await?;
            println!("Created maquete #{}", report.maquete_id);
            println!("Linked {} image(s), {} failed", report.linked, report.failed_links);
            for name in &report.dropped {
                println!("Not saved: {}", name);
            }
            print_gallery(&report.gallery);
        }
        "update" => {
            let id = parse_id(args.get(1))?;
            let form = read_form(args.get(2)).await?;
            app.edit_form(id).save(form).await?;
            println!("Maquete #{} saved", id);
        }
        "delete" => {
            let id = parse_id(args.get(1))?;
            match app.catalog().delete(id, confirmer.as_ref()).await? {
                Some(remaining) => println!("Deleted; {} maquete(s) left", remaining.len()),
                None => println!("Cancelled"),
            }
        }
        "gallery" => {
            let id = parse_id(args.get(1))?;
            let view = app.gallery().refresh(Some(id)).await?;
            print_gallery(&view);
        }
        "add-images" => {
            let id = parse_id(args.get(1))?;
            let files = selected_files(&args[2.min(args.len())..]);
            if files.is_empty() {
                bail!("select at least one image");
            }
            let view = app.edit_form(id).add_secondary_images(files).await?;
            print_gallery(&view);
        }
        "remove-image" => {
            let id = parse_id(args.get(1))?;
            let image_id = parse_id(args.get(2))?;
            match app.gallery().delete_image(Some(id), image_id, confirmer.as_ref()).await? {
                DeleteOutcome::Deleted(view) => print_gallery(&view),
                DeleteOutcome::Cancelled => println!("Cancelled"),
            }
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
