//! taxon-trial CLI: what-if classification against a release taxonomy.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use taxon_trial::axiom::syntax::FunctionalSyntaxDeserialiser;
use taxon_trial::concept::ConceptId;
use taxon_trial::config::ClassifierConfig;
use taxon_trial::error::TaxonResult;
use taxon_trial::hierarchy::AncestorGraph;
use taxon_trial::loader::BaseModelLoader;
use taxon_trial::reasoner::structural::StructuralReasoner;
use taxon_trial::report::{ReportFormat, ResultReporter};
use taxon_trial::session::{Candidate, ClassificationSession};

#[derive(Parser)]
#[command(
    name = "taxon-trial",
    version,
    about = "Transient classification of candidate axioms"
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify candidate axioms against the base model, then discard them.
    Classify {
        /// OWL axiom reference set release file.
        #[arg(long)]
        release: PathBuf,

        /// Candidate axiom in functional syntax (repeatable).
        #[arg(long = "expression", required_unless_present = "candidates")]
        expressions: Vec<String>,

        /// Label for the candidate at the same position (repeatable). Give one
        /// per --expression, or none to number the candidates from 1.
        #[arg(long = "label")]
        labels: Vec<String>,

        /// File of `# label` headed candidate blocks separated by blank lines.
        #[arg(long, conflicts_with = "expressions")]
        candidates: Option<PathBuf>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the transitive ancestors of a concept in the base model.
    Ancestors {
        /// OWL axiom reference set release file.
        #[arg(long)]
        release: PathBuf,

        /// Concept id, e.g. `404684003` or `:404684003`.
        #[arg(long)]
        concept: ConceptId,
    },

    /// Print the loaded base axioms, one per line.
    Dump {
        /// OWL axiom reference set release file.
        #[arg(long)]
        release: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClassifierConfig::from_toml_file(path)?,
        None => ClassifierConfig::default(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Classify {
            release,
            expressions,
            labels,
            candidates,
            json,
        } => {
            let batch = match candidates {
                Some(path) => {
                    let text = std::fs::read_to_string(&path).into_diagnostic()?;
                    Candidate::parse_batch(&text)
                }
                None => Candidate::labelled(expressions, labels)?,
            };

            let mut session = open_session(&release, config)?;
            let result = session.classify(&batch)?;

            let format = if json {
                ReportFormat::Json
            } else {
                ReportFormat::Text
            };
            let rendered = ResultReporter::new(format)
                .render(&result)
                .into_diagnostic()?;
            write!(out, "{rendered}").into_diagnostic()?;
            if json {
                writeln!(out).into_diagnostic()?;
            }
        }

        Commands::Ancestors { release, concept } => {
            let mut session = open_session(&release, config)?;
            let mut graph = AncestorGraph::new();
            session.populate_ancestors(&mut graph)?;

            let ancestors = graph.ancestors(concept);
            if !graph.contains(concept) {
                eprintln!("Concept :{concept}: is not in the base model");
            }
            writeln!(out, "Ancestors of :{concept}: ({})", ancestors.len()).into_diagnostic()?;
            for ancestor in ancestors {
                writeln!(out, "- :{ancestor}").into_diagnostic()?;
            }
        }

        Commands::Dump { release } => {
            let de = FunctionalSyntaxDeserialiser::new();
            let file = std::fs::File::open(&release).into_diagnostic()?;
            let (axioms, stats) = BaseModelLoader::with_config(&de, &config)
                .read(std::io::BufReader::new(file))?;

            let mut lines: Vec<String> = axioms.iter().map(ToString::to_string).collect();
            lines.sort();
            for line in &lines {
                writeln!(out, "{line}").into_diagnostic()?;
            }
            tracing::info!(
                rows = stats.rows,
                axioms = stats.axioms,
                inactive = stats.inactive,
                other_refset = stats.other_refset,
                "dump complete"
            );
        }
    }

    Ok(())
}

fn open_session(
    release: &Path,
    config: ClassifierConfig,
) -> TaxonResult<ClassificationSession<StructuralReasoner, FunctionalSyntaxDeserialiser>> {
    let (session, _stats) = ClassificationSession::from_release(
        release,
        StructuralReasoner::new(),
        FunctionalSyntaxDeserialiser::new(),
        config,
    )?;
    Ok(session)
}
