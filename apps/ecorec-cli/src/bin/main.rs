use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use ecorec_core::config::{Config, Settings};
use ecorec_core::types::PlaceId;
use ecorec_hybrid::price::display_price;
use ecorec_hybrid::{ArtifactPaths, HybridRecommender, UserRatings};
use ecorec_rag::{open_store, retrieve, BootstrapStatus, Health, OpenAiChat, RagError, RagIndex};

#[derive(Parser)]
#[command(name = "ecorec", about = "Eco-tourism place recommender and document Q&A")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index location, vector count and configured models.
    Health,
    /// Parse, chunk, embed and index documents.
    Ingest {
        files: Vec<PathBuf>,
        /// Directory to walk recursively; dotfiles are skipped.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Comma-separated tags stored with every chunk.
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Answer a question from the indexed documents.
    Query {
        question: String,
        #[arg(short, long)]
        k: Option<usize>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        json: bool,
        /// Print the retrieved chunks without calling the chat model.
        #[arg(long)]
        retrieval_only: bool,
    },
    /// Delete the vector index.
    Reset {
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Recommend places from ratings given as `ID=RATING`.
    Recommend {
        #[arg(long = "rate", value_parser = parse_rating, required = true)]
        ratings: Vec<(PlaceId, f64)>,
        #[arg(short, long)]
        k: Option<usize>,
        /// Content-based weight in [0, 1].
        #[arg(long, value_parser = parse_alpha)]
        alpha: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Highest rated places in the catalog.
    TopRated {
        #[arg(short, long, default_value_t = 10)]
        k: usize,
    },
}

fn parse_rating(s: &str) -> Result<(PlaceId, f64), String> {
    let (id, rating) =
        s.split_once('=').ok_or_else(|| format!("expected ID=RATING, got '{s}'"))?;
    let id = id.trim().parse::<PlaceId>().map_err(|e| format!("bad place id '{id}': {e}"))?;
    let rating =
        rating.trim().parse::<f64>().map_err(|e| format!("bad rating '{rating}': {e}"))?;
    if !(1.0..=5.0).contains(&rating) {
        return Err(format!("rating {rating} is outside 1-5"));
    }
    Ok((id, rating))
}

fn parse_alpha(s: &str) -> Result<f64, String> {
    let alpha = s.trim().parse::<f64>().map_err(|e| format!("bad alpha '{s}': {e}"))?;
    if !alpha.is_finite() {
        return Err(format!("alpha must be a finite number, got '{s}'"));
    }
    Ok(alpha)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;

    match cli.command {
        Command::Health => {
            let store = open_store(&settings.rag)?;
            println!("{}", serde_json::to_string_pretty(&Health::collect(&store, &settings.rag)?)?);
        }
        Command::Ingest { files, dir, tags } => {
            let paths = collect_paths(&files, dir.as_deref())?;
            if paths.is_empty() {
                return Err(anyhow!("nothing to ingest; pass files or --dir"));
            }
            let tags: Vec<String> = tags.split(',').map(str::to_string).collect();
            let index = open_index(&settings)?;
            let report =
                index.ingestor()?.with_progress(true).ingest_paths(&paths, &tags)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Query { question, k, model, temperature, json, retrieval_only } => {
            let index = open_index(&settings)?;
            let k = k.unwrap_or(settings.rag.top_k);
            if retrieval_only {
                let hits = retrieve(index.embedder(), index.store(), &question, k, None)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                } else {
                    for (i, hit) in hits.iter().enumerate() {
                        println!(
                            "[{}] ({} p.{}) d={:.4}\n{}\n",
                            i + 1,
                            hit.source,
                            hit.page,
                            hit.distance,
                            hit.text
                        );
                    }
                }
                return Ok(());
            }

            let chat = OpenAiChat::from_settings(&settings.rag, model.as_deref(), temperature)?;
            match index.answerer(&chat).answer(&question, k, &[]) {
                Ok(answer) if json => println!("{}", serde_json::to_string_pretty(&answer)?),
                Ok(answer) => {
                    println!("{}\n", answer.text);
                    for c in &answer.citations {
                        println!("- {} p.{}", c.source, c.page);
                    }
                }
                Err(RagError::GenerationFailed(reason)) => {
                    eprintln!("Could not generate an answer: {reason}")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Reset { yes } => {
            let mut store = open_store(&settings.rag)?;
            let prompt = format!("Delete the index at {}?", store.db_path().display());
            if !yes && !confirm(&prompt)? {
                println!("Aborted.");
                return Ok(());
            }
            store.reset()?;
            println!("Index reset.");
        }
        Command::Recommend { ratings, k, alpha, json } => {
            let recommender = load_recommender(&settings)?;
            let ratings: UserRatings = ratings.into_iter().collect();
            let recs = recommender.recommend(
                &ratings,
                k.unwrap_or(settings.recommend.k),
                alpha.unwrap_or(settings.recommend.alpha),
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&recs)?);
            } else if recs.is_empty() {
                println!("No recommendations.");
            } else {
                for (i, r) in recs.iter().enumerate() {
                    println!(
                        "{:>2}. [{}] {} ({}) {} | {} | rating {:.1} | score {:.4}",
                        i + 1,
                        r.place_id,
                        r.name,
                        r.city,
                        r.category,
                        r.price,
                        r.rating,
                        r.score
                    );
                }
            }
        }
        Command::TopRated { k } => {
            let recommender = load_recommender(&settings)?;
            for (i, p) in recommender.top_rated(k).iter().enumerate() {
                println!(
                    "{:>2}. [{}] {} ({}) | {} | rating {:.1}",
                    i + 1,
                    p.id,
                    p.place_name,
                    p.city,
                    display_price(&p.price_str, p.price_num),
                    p.rating
                );
            }
        }
    }
    Ok(())
}

/// Opens the index and ingests the configured catalog CSV if it is not there yet.
/// Only commands that embed go through here.
fn open_index(settings: &Settings) -> anyhow::Result<RagIndex> {
    let index = RagIndex::open(settings)?;
    if let Some(csv) = &settings.rag.bootstrap_csv {
        match index.ingestor()?.bootstrap(csv)? {
            BootstrapStatus::Ingested { chunks } => {
                info!(chunks, "catalog bootstrapped into index")
            }
            BootstrapStatus::Skipped => {}
            BootstrapStatus::Missing { path } => {
                warn!(path = %path.display(), "bootstrap catalog missing")
            }
            BootstrapStatus::Failed { reason } => warn!(%reason, "bootstrap failed"),
        }
    }
    Ok(index)
}

fn load_recommender(settings: &Settings) -> anyhow::Result<HybridRecommender> {
    let paths = ArtifactPaths::from(&settings.artifacts);
    HybridRecommender::load(&paths).with_context(|| {
        format!(
            "loading artifacts from {} and {}",
            paths.cbf_dir.display(),
            paths.cf_dir.display()
        )
    })
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Explicit files plus every non-hidden file under `dir`, de-duplicated by
/// canonical path in first-seen order.
fn collect_paths(files: &[PathBuf], dir: Option<&Path>) -> anyhow::Result<Vec<PathBuf>> {
    let mut candidates: Vec<PathBuf> = files.to_vec();
    if let Some(dir) = dir {
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in walker {
            let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
            if entry.file_type().is_file() {
                candidates.push(entry.into_path());
            }
        }
    }

    let mut seen = HashSet::new();
    Ok(candidates
        .into_iter()
        .filter(|p| seen.insert(p.canonicalize().unwrap_or_else(|_| p.clone())))
        .collect())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_must_be_finite() {
        assert_eq!(parse_alpha("0.6"), Ok(0.6));
        assert_eq!(parse_alpha(" 1 "), Ok(1.0));
        assert!(parse_alpha("NaN").is_err());
        assert!(parse_alpha("inf").is_err());
        assert!(parse_alpha("-infinity").is_err());
        assert!(parse_alpha("half").is_err());
    }

    #[test]
    fn rating_pairs_are_validated() {
        assert_eq!(parse_rating("12=4.5").map(|(_, r)| r), Ok(4.5));
        assert!(parse_rating("12").is_err());
        assert!(parse_rating("12=6").is_err());
        assert!(parse_rating("12=NaN").is_err());
        assert!(parse_rating("x=3").is_err());
    }

    #[test]
    fn recommend_rejects_nan_alpha() {
        let args = |alpha: &'static str| ["ecorec", "recommend", "--rate", "1=5", "--alpha", alpha];
        assert!(Cli::try_parse_from(args("NaN")).is_err());
        let parsed = Cli::try_parse_from(args("0.3")).map(|c| c.command);
        assert!(matches!(parsed, Ok(Command::Recommend { alpha: Some(a), .. }) if a == 0.3));
    }
}
