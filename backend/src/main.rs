//! DataDash CLI - Membership and agent-performance analytics
//!
//! # Main Commands
//!
//! ```bash
//! datadash serve                     # Start HTTP server (port 3000)
//! datadash members members.xlsx      # Member insights as JSON
//! datadash agents evals.csv          # Agent insights as JSON
//! datadash export evals.csv          # Agent summary as XLSX
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! datadash parse input.csv           # Just parse a table to JSON
//! ```

use clap::{Parser, Subcommand};
use datadash::{
    agent_insights, agent_summary_export, load_agent_table, load_member_table, member_insights,
    read_table, AgentCriteria, DateFilter, MemberCriteria,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "datadash")]
#[command(about = "Membership and agent-performance analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV or XLSX file and output the raw table as JSON
    Parse {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Member insights: clean the table, filter it and print the page data
    Members {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Restrict to these branches (repeatable)
        #[arg(short, long)]
        branch: Vec<String>,

        /// Restrict to these genders (repeatable)
        #[arg(short, long)]
        gender: Vec<String>,

        /// Restrict to these member statuses (repeatable)
        #[arg(short, long)]
        status: Vec<String>,

        /// Lower bound of the age interval
        #[arg(long, default_value = "0")]
        min_age: i32,

        /// Upper bound of the age interval
        #[arg(long, default_value = "100")]
        max_age: i32,

        /// Registration year (default: latest in the data)
        #[arg(short, long)]
        year: Option<i32>,

        /// Registration month, 1-12 (default: all months)
        #[arg(short, long)]
        month: Option<u32>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Agent insights: clean the evaluation table and print the page data
    Agents {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Evaluation year (default: latest in the data)
        #[arg(short, long)]
        year: Option<i32>,

        /// Evaluation month, 1-12 (default: all months)
        #[arg(short, long)]
        month: Option<u32>,

        /// Restrict to these subscriber statuses (repeatable)
        #[arg(short, long)]
        status: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the agent performance summary as an XLSX workbook
    Export {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Evaluation year (default: latest in the data)
        #[arg(short, long)]
        year: Option<i32>,

        /// Evaluation month, 1-12 (default: all months)
        #[arg(short, long)]
        month: Option<u32>,

        /// Output workbook path
        #[arg(short, long, default_value = "agent_summary.xlsx")]
        output: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Members {
            input,
            branch,
            gender,
            status,
            min_age,
            max_age,
            year,
            month,
            output,
        } => {
            let criteria = MemberCriteria {
                branches: branch,
                genders: gender,
                statuses: status,
                age_range: (min_age, max_age),
                date: year.map(|year| DateFilter::Discrete { year, month }),
                ..MemberCriteria::default()
            };
            cmd_members(&input, &criteria, output.as_deref())
        }

        Commands::Agents {
            input,
            year,
            month,
            status,
            output,
        } => {
            let criteria = AgentCriteria {
                year,
                month,
                statuses: status,
            };
            cmd_agents(&input, &criteria, output.as_deref())
        }

        Commands::Export {
            input,
            year,
            month,
            output,
        } => {
            let criteria = AgentCriteria {
                year,
                month,
                statuses: Vec::new(),
            };
            cmd_export(&input, &criteria, &output)
        }

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let bytes = fs::read(input)?;
    let filename = file_name(input);
    let parsed = read_table(&bytes, &filename)?;

    if let Some(ref encoding) = parsed.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(d) = parsed.delimiter {
        eprintln!(
            "   Delimiter: '{}'",
            match d {
                '\t' => "\\t".to_string(),
                c => c.to_string(),
            }
        );
    }
    eprintln!("   Columns: {}", parsed.table.headers.join(", "));
    eprintln!("✅ Parsed {} rows", parsed.table.len());

    let json = serde_json::to_string_pretty(&parsed.table)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_members(
    input: &Path,
    criteria: &MemberCriteria,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let bytes = fs::read(input)?;
    let (records, info) = load_member_table(&bytes, &file_name(input))?;
    eprintln!("   Columns: {}", info.headers.join(", "));
    eprintln!("   Cleaned {} member records", records.len());

    let insights = member_insights(&records, criteria);
    eprintln!(
        "📊 {} of {} records match the filter",
        insights.filtered_count,
        records.len()
    );

    let json = serde_json::to_string_pretty(&insights)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_agents(
    input: &Path,
    criteria: &AgentCriteria,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let bytes = fs::read(input)?;
    let (records, info) = load_agent_table(&bytes, &file_name(input))?;
    eprintln!("   Columns: {}", info.headers.join(", "));
    eprintln!("   Cleaned {} evaluation records", records.len());

    let insights = agent_insights(&records, criteria);
    if let Some(year) = insights.selected_year {
        let scope = match insights.selected_month {
            Some(m) => format!("{}, month {}", year, m),
            None => year.to_string(),
        };
        eprintln!("📊 {} records in {}", insights.filtered_count, scope);
    }

    let json = serde_json::to_string_pretty(&insights)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_export(
    input: &Path,
    criteria: &AgentCriteria,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let bytes = fs::read(input)?;
    let (records, _) = load_agent_table(&bytes, &file_name(input))?;
    eprintln!("   Cleaned {} evaluation records", records.len());

    let workbook = agent_summary_export(&records, criteria)?;
    fs::write(output, &workbook)?;
    eprintln!("💾 Summary written to: {}", output.display());

    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    datadash::api::start_server(port).await
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
