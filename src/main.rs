mod server;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use job_crawler::config::{default_output, CrawlRequest, Numeric, SourceList};
use job_crawler::debug::FileDebugSink;
use job_crawler::output::write_records;
use job_crawler::providers::Registry;
use job_crawler::session::HttpSessionFactory;
use job_crawler::Orchestrator;

#[derive(Parser)]
#[command(name = "job_crawler", about = "Job listing crawler for 104, yourator and 1111")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one crawl and write the result file
    Crawl {
        /// Search keyword (env KEYWORD)
        #[arg(short, long)]
        keyword: Option<String>,
        /// Page budget per source (env PAGES)
        #[arg(short = 'n', long)]
        pages: Option<u32>,
        /// Delay between pages in milliseconds (env DELAY)
        #[arg(short, long)]
        delay: Option<u64>,
        /// Comma separated sources (env PROVIDERS)
        #[arg(short, long)]
        providers: Option<String>,
        /// Dump page contents of empty or failed pages
        #[arg(long)]
        debug: bool,
        /// Output file, empty to skip writing (env OUTPUT)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Serve the crawl over HTTP
    Serve {
        #[arg(long, env = "PORT", default_value = "3000")]
        port: u16,
    },
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(Registry::builtin(), Arc::new(HttpSessionFactory::default()))
        .with_debug_sink(Arc::new(FileDebugSink::new(".")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            keyword,
            pages,
            delay,
            providers,
            debug,
            output,
        } => {
            let request = CrawlRequest {
                keyword,
                pages: pages.map(Numeric::from),
                delay: delay.map(Numeric::from),
                providers: providers.map(SourceList::Csv),
                // absent flag falls through to DEBUG
                debug: debug.then_some(true),
                output,
            };
            let settings = request.resolve();

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
            pb.set_message(format!("crawling {}", settings.run.sources.join(", ")));
            pb.enable_steady_tick(Duration::from_millis(120));
            let outcome = orchestrator().run(&settings.run).await;
            pb.finish_and_clear();
            let outcome = outcome?;

            for status in &outcome.sources {
                println!(
                    "{:<10} {:>4} records  {:>3} pages  {:?}",
                    status.source, status.records, status.pages_requested, status.stop
                );
            }
            if let Some(path) = &settings.output {
                write_records(path, &outcome.records).await?;
                println!("Wrote {}", path.display());
            }
            println!(
                "Done: {} records ({} before dedup) in {}",
                outcome.records.len(),
                outcome.raw_count,
                format_duration(t0.elapsed())
            );
        }
        Commands::Serve { port } => {
            let state = Arc::new(server::AppState::new(Arc::new(orchestrator()), default_output()));
            server::serve(state, port).await?;
        }
    }

    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
