use clap::{Parser, Subcommand};
use dxcat_core::seed::{load_import_records, load_stores, write_catalog};
use dxcat_core::symptoms::normalize;
use dxcat_core::{
    CatalogService, CodingSystem, CoreConfig, MatchQuery, MatchingEngine, PageRequest, Principal,
    Role, TriageContext, VisibilityResolver, VocabularyService,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dxcat")]
#[command(about = "Diagnosis catalog CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how symptom tags are normalised
    Normalise {
        /// Raw symptom tags, e.g. "#Depressed Mood"
        symptoms: Vec<String>,
    },
    /// Rank a catalog snapshot against symptoms, as seen by one principal
    Match {
        /// Catalog snapshot (.json, .yaml or .yml)
        #[arg(long)]
        catalog: PathBuf,
        /// Organization membership file (.json, .yaml or .yml)
        #[arg(long)]
        membership: Option<PathBuf>,
        /// Principal id
        #[arg(long, default_value = "cli")]
        principal: String,
        /// super_admin, company_admin or psychologist
        #[arg(long, default_value = "super_admin")]
        role: String,
        /// Principal's organization id
        #[arg(long)]
        organization: Option<String>,
        /// Restrict to DSM-5 or ICD-10
        #[arg(long)]
        system: Option<String>,
        /// Include entries without any matching symptom
        #[arg(long)]
        show_all: bool,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        page_size: Option<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Observed symptoms
        symptoms: Vec<String>,
    },
    /// Bulk-import create-shaped records into the global section of a catalog snapshot
    Import {
        /// Catalog snapshot to update; created if it does not exist
        #[arg(long)]
        catalog: PathBuf,
        /// Records to import (.json, .yaml or .yml)
        records: PathBuf,
        /// Id recorded as owner of the imported entries
        #[arg(long, default_value = "importer")]
        importer: String,
    },
    /// List symptom names known to a catalog snapshot
    Vocabulary {
        /// Catalog snapshot (.json, .yaml or .yml)
        #[arg(long)]
        catalog: PathBuf,
        /// Only names starting with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Arc::new(CoreConfig::default());

    match cli.command {
        Some(Commands::Normalise { symptoms }) => {
            for raw in symptoms {
                let key = normalize(&raw);
                if key.is_empty() {
                    println!("{raw:?} -> (discarded)");
                } else {
                    println!("{raw:?} -> {key}");
                }
            }
        }
        Some(Commands::Match {
            catalog,
            membership,
            principal,
            role,
            organization,
            system,
            show_all,
            page,
            page_size,
            json,
            symptoms,
        }) => {
            let seeded = load_stores(Some(&catalog), membership.as_deref())?;
            let role: Role = role.parse()?;
            let principal = Principal::new(principal, role, organization.as_deref());
            let coding_system = system.map(|s| s.parse::<CodingSystem>()).transpose()?;

            let engine = MatchingEngine::new(
                VisibilityResolver::new(seeded.stores.membership.clone()),
                seeded.stores.catalog.clone(),
            );
            let query = MatchQuery {
                symptoms,
                coding_system,
                page: PageRequest::coerce(page.as_deref(), page_size.as_deref(), &cfg),
                show_all,
                context: TriageContext::default(),
            };
            let outcome = engine.match_symptoms(&principal, &query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if outcome.results.is_empty() {
                println!("No matching diagnoses.");
            } else {
                for ranked in &outcome.results {
                    println!(
                        "{:>6.2}%  {}/{}  {} [{}]  matched: {}",
                        ranked.match_percentage,
                        ranked.match_count,
                        ranked.entry.symptoms.len(),
                        ranked.entry.name,
                        ranked.entry.scope.as_str(),
                        ranked.matched_symptoms.join(", ")
                    );
                }
                let p = &outcome.pagination;
                println!(
                    "page {}/{} ({} results)",
                    p.current_page, p.total_pages, p.total_items
                );
            }
        }
        Some(Commands::Import {
            catalog,
            records,
            importer,
        }) => {
            let existing = catalog.exists().then_some(catalog.as_path());
            let seeded = load_stores(existing, None)?;
            let records = load_import_records(&records)?;

            let service = CatalogService::new(cfg.clone(), &seeded.stores);
            let importer = Principal::new(importer, Role::SuperAdmin, None);
            let summary = service.bulk_import(&importer, records).await?;

            write_catalog(&catalog, &seeded.catalog.snapshot().await)?;
            println!(
                "Imported {} record(s) into {}",
                summary.inserted_count,
                catalog.display()
            );
            for failure in &summary.failures {
                eprintln!("record {}: {}", failure.index, failure.reason);
            }
        }
        Some(Commands::Vocabulary {
            catalog,
            prefix,
            limit,
        }) => {
            let seeded = load_stores(Some(&catalog), None)?;
            let vocabulary = VocabularyService::new(seeded.stores.vocabulary.clone());
            for name in vocabulary.suggest(&prefix, limit).await? {
                println!("{name}");
            }
        }
        None => {
            println!("Use 'dxcat --help' for commands");
        }
    }

    Ok(())
}
