use clap::{Parser, Subcommand};
use consult_core::{
    case::{list_cases, load_case},
    chart::render_chart_html,
    config::resolve_cases_dir,
    labs::abnormal_rule,
    markdown_to_html,
    summary::{note_view_html, NoteView},
    surface::render_completed_page,
};
use consult_types::CaseName;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "consult")]
#[command(about = "Surgical consult demo CLI")]
struct Cli {
    /// Directory holding the case fixtures (defaults to ./cases)
    #[arg(long, global = true)]
    cases_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cases
    List,
    /// Render a markdown file to HTML
    RenderMarkdown {
        /// Markdown file to render
        file: PathBuf,
    },
    /// Check whether a lab line is abnormal
    ClassifyLab {
        /// Lab line, for example "WBC: 18.2 x10^3/uL"
        line: String,
    },
    /// Print a case's chart
    Chart {
        /// Case name
        case: String,
        /// Print the plain-text chart instead of HTML
        #[arg(long)]
        text: bool,
    },
    /// Print a case's consult note
    Summary {
        /// Case name
        case: String,
        /// Print the full note instead of the summary
        #[arg(long)]
        full: bool,
    },
    /// Render a case as a static HTML page with all stages completed
    Page {
        /// Case name
        case: String,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'consult --help' for commands");
        return Ok(());
    };

    match command {
        Commands::List => {
            let dir = resolve_cases_dir(cli.cases_dir)?;
            let cases = list_cases(&dir)?;
            if cases.is_empty() {
                println!("No cases found in {}.", dir.display());
            } else {
                for case in cases {
                    println!("{}", case);
                }
            }
        }
        Commands::RenderMarkdown { file } => {
            let markdown = std::fs::read_to_string(&file)?;
            println!("{}", markdown_to_html(&markdown));
        }
        Commands::ClassifyLab { line } => match abnormal_rule(&line) {
            Some(rule) => println!("abnormal ({} {})", rule.test, rule.threshold),
            None => println!("normal"),
        },
        Commands::Chart { case, text } => {
            let dir = resolve_cases_dir(cli.cases_dir)?;
            let case = load_case(&dir, &CaseName::new(&case)?)?;
            if text {
                println!("{}", case.chart_text());
            } else {
                println!("{}", render_chart_html(&case.chart));
            }
        }
        Commands::Summary { case, full } => {
            let dir = resolve_cases_dir(cli.cases_dir)?;
            let case = load_case(&dir, &CaseName::new(&case)?)?;
            let view = if full { NoteView::Full } else { NoteView::Summary };
            let note = markdown_to_html(&case.stages.note);
            println!("{}", note_view_html(&note, view));
        }
        Commands::Page { case, out } => {
            let dir = resolve_cases_dir(cli.cases_dir)?;
            let name = CaseName::new(&case)?;
            let page = render_completed_page(&name, load_case(&dir, &name)?)?;
            match out {
                Some(path) => {
                    page.write_page(&path)?;
                    println!("Wrote {} to {}", name, path.display());
                }
                None => println!("{}", page.render_page()),
            }
        }
    }

    Ok(())
}
