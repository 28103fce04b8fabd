use super::load_codebooks;
use anyhow::{Context, Result, bail};
use bnk::{Bnk, BnkManifest, Wem};
use clap::Subcommand;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use wem::{CodebookLibrary, VorbisOptions};

#[derive(Subcommand)]
pub enum BnkCommands {
    /// Print the section layout and media index as JSON
    Info {
        /// Input BNK file
        input: PathBuf,
    },
    /// Extract embedded WEM files
    Extract {
        /// Input BNK file
        input: PathBuf,
        /// Output directory (optional, defaults to file name stem)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Convert each WEM to WAV/OGG instead of writing it raw
        #[arg(long)]
        convert: bool,
        /// Path to packed codebooks library (for Vorbis)
        #[arg(short, long)]
        codebooks: Option<PathBuf>,
        /// Codebooks are stored inline in the setup packet (for Vorbis)
        #[arg(long)]
        inline_codebooks: bool,
        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Replace one embedded WEM and rebuild the media index
    Replace {
        /// Input BNK file
        input: PathBuf,
        /// Id of the WEM to replace
        #[arg(long)]
        id: u32,
        /// Replacement WEM file
        #[arg(long = "with")]
        with: PathBuf,
        /// Output BNK file
        #[arg(short, long)]
        output: PathBuf,
    },
}

pub fn handle(cmd: BnkCommands) -> Result<()> {
    match cmd {
        BnkCommands::Info { input } => bnk_info(&input),
        BnkCommands::Extract {
            input,
            output,
            convert,
            codebooks,
            inline_codebooks,
            jobs,
        } => {
            let options = VorbisOptions::new().with_inline_codebooks(inline_codebooks);
            let codebooks = load_codebooks(codebooks.as_deref())?;
            let extract = Extract {
                convert,
                codebooks: &codebooks,
                options: &options,
            };
            extract.run(&input, output, jobs)
        }
        BnkCommands::Replace {
            input,
            id,
            with,
            output,
        } => bnk_replace(&input, id, &with, &output),
    }
}

fn open_bnk(input: &Path) -> Result<Bnk> {
    let data = fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    Bnk::from_bytes(&data).with_context(|| format!("Failed to parse {:?}", input))
}

fn bnk_info(input: &Path) -> Result<()> {
    let bnk = open_bnk(input)?;
    let json = serde_json::to_string_pretty(&BnkManifest::from(&bnk))?;
    println!("{}", json);
    Ok(())
}

struct Extract<'a> {
    convert: bool,
    codebooks: &'a CodebookLibrary,
    options: &'a VorbisOptions,
}

impl Extract<'_> {
    fn run(&self, input: &Path, output: Option<PathBuf>, jobs: Option<usize>) -> Result<()> {
        let bnk = open_bnk(input)?;
        let wems = bnk.resolve_wem_entities()?;

        let out_dir = output.unwrap_or_else(|| input.with_extension(""));
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create {:?}", out_dir))?;

        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = jobs {
            pool = pool.num_threads(jobs);
        }
        let pool = pool.build()?;

        let total = wems.len();
        let done = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        pool.install(|| {
            wems.par_iter().for_each(|wem| {
                match self.write_one(wem, &out_dir) {
                    Ok(path) => tracing::debug!(id = wem.id(), "wrote {:?}", path),
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(id = wem.id(), "{:#}", e);
                    }
                }
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!("[{}/{}] WEM {}", n, total, wem.id());
            });
        });

        let failed = failed.into_inner();
        if failed > 0 {
            bail!("{} of {} WEM files failed to extract", failed, total);
        }
        tracing::info!("Extracted {} WEM files to {:?}", total, out_dir);
        Ok(())
    }

    fn write_one(&self, wem: &Wem, out_dir: &Path) -> Result<PathBuf> {
        let (bytes, extension) = if self.convert {
            let converted = wem
                .to_standard(self.codebooks, self.options)
                .with_context(|| format!("Failed to convert WEM {}", wem.id()))?;
            let extension = converted.extension();
            (converted.bytes, extension)
        } else {
            (wem.payload().to_vec(), "wem")
        };

        let path = out_dir.join(format!("{}.{}", wem.id(), extension));
        fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }
}

fn bnk_replace(input: &Path, id: u32, with: &Path, output: &Path) -> Result<()> {
    let mut bnk = open_bnk(input)?;
    let payload = fs::read(with).with_context(|| format!("Failed to read {:?}", with))?;

    let mut wems = bnk.resolve_wem_entities()?;
    let Some(target) = wems.iter_mut().find(|wem| wem.id() == id) else {
        bail!("WEM {} not found in {:?}", id, input);
    };
    target.set_payload(payload);
    bnk.replace_wems(&wems)?;

    let bytes = bnk.to_bytes()?;
    fs::write(output, &bytes).with_context(|| format!("Failed to write {:?}", output))?;
    tracing::info!("Replaced WEM {} and wrote {:?}", id, output);
    Ok(())
}
