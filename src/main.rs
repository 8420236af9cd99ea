use std::{path::PathBuf, time::Duration};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use leafcare::{
    LeafCareConfig, LeafCareSession, ModelHost, RawImage,
    model_store::{ModelStoreEvent, default_bundled_model_path, default_model_path},
    types::Language,
};

#[derive(Debug, Parser)]
#[command(name = "leafcare", version, about = "Classify plant leaf photos")]
struct Args {
    /// Read-only model artifact shipped with the application
    #[arg(long, value_name = "FILE", default_value_os_t = default_bundled_model_path())]
    bundled_model: PathBuf,

    /// Writable location the artifact is copied to before loading
    #[arg(long, value_name = "FILE", default_value_os_t = default_model_path())]
    model: PathBuf,

    /// Intra-op threads for the inference runtime
    #[arg(long, value_name = "COUNT", default_value_t = 2)]
    threads: usize,

    #[arg(long, value_enum, default_value_t = Lang::Vi)]
    lang: Lang,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify one or more leaf images
    Classify {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Print the model's inputs and outputs
    Inspect,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Lang {
    Vi,
    En,
}

impl From<Lang> for Language {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Vi => Language::Vietnamese,
            Lang::En => Language::English,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = LeafCareConfig::default();
    config.model.bundled_path = args.bundled_model;
    config.model.model_path = args.model;
    config.model.intra_threads = args.threads;
    config.pipeline.language = args.lang.into();

    match args.command {
        Command::Classify { images } => classify(config, images),
        Command::Inspect => inspect(config),
    }
}

fn classify(config: LeafCareConfig, images: Vec<PathBuf>) -> Result<()> {
    let session = LeafCareSession::open_with(config, copy_progress());
    if !session.host().is_loaded() {
        log::warn!("model unavailable, every image will be reported with the fallback result");
    }

    let (loaded, failed) = load_images(images);
    let mut pending = Vec::with_capacity(loaded.len());
    for (path, image) in loaded {
        pending.push((path, session.submit(image)?));
    }

    for (path, job) in pending {
        let result = job.wait()?;
        println!("{}: {}", path.display(), result.display);
    }

    session.close();
    if failed > 0 {
        return Err(anyhow!("{failed} image(s) could not be opened"));
    }
    Ok(())
}

/// Decodes every path, logging the ones that fail. Returns the decoded
/// images and the failure count.
fn load_images(paths: Vec<PathBuf>) -> (Vec<(PathBuf, RawImage)>, usize) {
    let mut loaded = Vec::with_capacity(paths.len());
    let mut failed = 0;
    for path in paths {
        match RawImage::open(&path) {
            Ok(image) => loaded.push((path, image)),
            Err(err) => {
                log::error!("failed to open {}: {err}", path.display());
                failed += 1;
            }
        }
    }
    (loaded, failed)
}

fn inspect(config: LeafCareConfig) -> Result<()> {
    let host = ModelHost::try_initialize(&config.model, copy_progress())?;
    let info = host
        .describe()
        .ok_or_else(|| anyhow!("model metadata unavailable"))?;

    println!("Model: {}", config.model.model_path.display());
    println!("Inputs:");
    for (idx, input) in info.inputs.iter().enumerate() {
        println!("  {}: name=\"{}\" {}", idx, input.name, input.detail);
    }
    println!("Outputs:");
    for (idx, output) in info.outputs.iter().enumerate() {
        println!("  {}: name=\"{}\" {}", idx, output.name, output.detail);
    }

    host.release();
    Ok(())
}

fn copy_progress() -> impl FnMut(ModelStoreEvent) {
    let mut progress: Option<ProgressBar> = None;
    move |event| match event {
        ModelStoreEvent::Started { total } => {
            progress = Some(create_progress_bar(total));
        }
        ModelStoreEvent::Progress { copied, .. } => {
            if let Some(pb) = progress.as_ref() {
                pb.set_position(copied);
            }
        }
        ModelStoreEvent::Finished => {
            if let Some(pb) = progress.take() {
                pb.finish_with_message("model ready");
            }
        }
        ModelStoreEvent::AlreadyPresent => {}
    }
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes}",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} copying model") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn unreadable_images_are_counted_as_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("leaf.png");
        image::RgbImage::from_pixel(4, 4, image::Rgb([40, 160, 60]))
            .save(&good)
            .unwrap();
        let garbage = dir.path().join("notes.png");
        fs::write(&garbage, b"not an image").unwrap();
        let missing = dir.path().join("missing.jpg");

        let (loaded, failed) = load_images(vec![good.clone(), garbage, missing]);

        assert_eq!(failed, 2);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, good);
    }
}
