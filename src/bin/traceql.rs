// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! traceql CLI - run trace queries against OTLP/JSON files
//!

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, DefaultEditor, EditMode, Editor};
use tracing_subscriber::EnvFilter;

use traceql::core::format_duration;
use traceql::{
    CandidateSource, Engine, EngineConfig, MemoryStorage, SearchRequest,
    SearchResponse, StorageIndex, TimeRange,
};

/// Trace query CLI
#[derive(Parser, Debug)]
#[command(name = "traceql")]
#[command(author)]
#[command(version = traceql::common::VERSION)]
#[command(about = "Query distributed traces stored as OTLP/JSON")]
#[command(
    long_about = "Runs trace queries against one or more OTLP/JSON trace files.\n\
Without --query an interactive prompt is opened.\n\n\
ENGINE OPTIONS (--config):\n\
  key=value&key=value\n\n\
  limit=COUNT                 Traces returned by default (default: 20)\n\
  span_limit=COUNT            Spans per spanset by default (default: 3)\n\
  most_recent_shards=COUNT    Windows scanned in most-recent mode (default: 200)\n\
  max_traces_scanned=COUNT    Scan budget per search, 0 = unbounded (default: 0)\n\
  workers=COUNT               Worker threads, 0 = one per core (default: 0)\n\
  parallel_threshold=COUNT    Minimum batch for parallel evaluation (default: 2)\n\
  regex_cache_size=COUNT      Cached regular expressions (default: 256)\n\n\
EXAMPLES:\n\
  traceql -t traces.json -q '{ status = error }'\n\
  traceql -t traces.json -q '{ resource.service.name = \"api\" } >> { .db.system = \"redis\" }'\n\
  traceql -t a.json -t b.json -q '{ } | count() > 10' --most-recent --limit 5\n\
  traceql -t traces.json --explain -q '{ .http.status_code >= 500 || duration > 2s }'"
)]
struct Args {
    /// OTLP/JSON trace file; repeat to search several files
    #[arg(short = 't', long = "traces", value_name = "FILE", required = true)]
    traces: Vec<PathBuf>,

    /// Run a single query and exit
    #[arg(short = 'q', long = "query")]
    query: Option<String>,

    /// Maximum traces returned (0 for the configured default)
    #[arg(short = 'l', long = "limit", default_value = "0")]
    limit: usize,

    /// Maximum spans per spanset (0 for the configured default)
    #[arg(short = 's', long = "span-limit", default_value = "0")]
    span_limit: usize,

    /// Start of the time range (RFC 3339)
    #[arg(long = "start", value_name = "TIME")]
    start: Option<String>,

    /// End of the time range (RFC 3339)
    #[arg(long = "end", value_name = "TIME")]
    end: Option<String>,

    /// Return the most recent matching traces, newest first
    #[arg(long = "most-recent", default_value = "false")]
    most_recent: bool,

    /// Abandon a search after this many milliseconds
    #[arg(long = "timeout-ms", value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Engine options as key=value&key=value
    #[arg(short = 'c', long = "config", value_name = "OPTIONS")]
    config: Option<String>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", default_value = "false")]
    json_output: bool,

    /// Print the parsed query and extracted conditions instead of searching
    #[arg(long = "explain", default_value = "false")]
    explain: bool,

    /// Treat truncated results as an error
    #[arg(long = "strict", default_value = "false")]
    strict: bool,

    /// Scan every candidate instead of pruning with extracted conditions
    #[arg(long = "no-prune", default_value = "false")]
    no_prune: bool,
}

/// Everything a search needs besides the query text
struct Session {
    engine: Engine,
    storages: Vec<MemoryStorage>,
    range: TimeRange,
    limit: usize,
    span_limit: usize,
    most_recent: bool,
    timeout: Option<Duration>,
    json_output: bool,
    strict: bool,
    prune: bool,
}

impl Session {
    fn request(&self) -> SearchRequest {
        let mut request = SearchRequest::new()
            .with_range(self.range)
            .with_limit(self.limit)
            .with_span_limit(self.span_limit);
        if self.most_recent {
            request = request.with_most_recent(true);
        }
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }
        request
    }

    fn search(&self, query: &str) -> Result<SearchResponse, String> {
        let sources: Vec<&dyn CandidateSource> = self
            .storages
            .iter()
            .map(|s| s as &dyn CandidateSource)
            .collect();
        // A single store can prune its own candidates
        let index: Option<&dyn StorageIndex> = match self.storages.as_slice() {
            [only] if self.prune => Some(only as &dyn StorageIndex),
            _ => None,
        };
        let response = self
            .engine
            .evaluate_with_index(query, &self.request(), &sources, index)
            .map_err(|e| format_error(query, &e))?;
        if self.strict {
            return response.ensure_complete().map_err(|e| e.to_string());
        }
        Ok(response)
    }

    fn run_query(&self, query: &str) -> Result<(), String> {
        let start = Instant::now();
        let response = self.search(query)?;
        if self.json_output {
            let json = serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?;
            println!("{}", json);
        } else {
            print_table(&response);
            println!(
                "\x1b[1;32m{} {} in {:?}\x1b[0m (inspected {} traces, {} spans)",
                response.traces.len(),
                if response.traces.len() == 1 { "trace" } else { "traces" },
                start.elapsed(),
                response.metrics.inspected_traces,
                response.metrics.inspected_spans,
            );
            if let Some(reason) = response.truncated {
                println!("\x1b[1;33mResults truncated: {}\x1b[0m", reason);
            }
        }
        Ok(())
    }

    fn explain(&self, query: &str) -> Result<(), String> {
        let plan = self
            .engine
            .explain(query)
            .map_err(|e| format_error(query, &e))?;
        print!("{}", plan);
        Ok(())
    }
}

/// CLI state for interactive mode
struct Repl {
    session: Session,
    editor: Editor<(), DefaultHistory>,
}

impl Repl {
    fn new(session: Session) -> io::Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .edit_mode(EditMode::Emacs)
            .build();

        let mut editor =
            DefaultEditor::with_config(config).map_err(|e| io::Error::other(e.to_string()))?;

        if let Some(home) = dirs::home_dir() {
            let _ = editor.load_history(&home.join(".traceql_history"));
        }

        Ok(Self { session, editor })
    }

    fn run(&mut self) -> io::Result<()> {
        println!("{}", traceql::version_info());
        let traces: usize = self.session.storages.iter().map(|s| s.len()).sum();
        println!("Loaded {} traces. Enter queries, 'help' for assistance, or 'exit' to quit.", traces);
        println!();

        loop {
            match self.editor.readline("\x1b[1;36mtraceql>\x1b[0m ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    match line {
                        "exit" | "quit" | "\\q" => break,
                        "help" | "\\h" | "\\?" => {
                            print_help();
                            continue;
                        }
                        "\\json" => {
                            self.session.json_output = !self.session.json_output;
                            println!(
                                "JSON output {}",
                                if self.session.json_output { "on" } else { "off" }
                            );
                            continue;
                        }
                        "\\recent" => {
                            self.session.most_recent = !self.session.most_recent;
                            println!(
                                "Most-recent mode {}",
                                if self.session.most_recent { "on" } else { "off" }
                            );
                            continue;
                        }
                        _ => {}
                    }

                    let result = if let Some(query) = line.strip_prefix("\\explain ") {
                        self.session.explain(query)
                    } else if let Some(value) = line.strip_prefix("\\limit ") {
                        match value.trim().parse() {
                            Ok(limit) => {
                                self.session.limit = limit;
                                Ok(())
                            }
                            Err(_) => Err(format!("invalid limit '{}'", value.trim())),
                        }
                    } else {
                        self.session.run_query(line)
                    };
                    if let Err(e) = result {
                        eprintln!("\x1b[1;31mError:\x1b[0m {}", e);
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    break;
                }
            }
        }

        if let Some(home) = dirs::home_dir() {
            let _ = self.editor.save_history(&home.join(".traceql_history"));
        }

        Ok(())
    }
}

fn print_help() {
    println!("\x1b[1mtraceql commands:\x1b[0m");
    println!();
    println!("  \x1b[1;33mQueries:\x1b[0m");
    println!("    {{ .attr = value }}            Select spans by attribute");
    println!("    {{ A }} >> {{ B }}               B spans below A spans (also >, <<, <, ~)");
    println!("    {{ A }} !>> {{ B }}              B spans not below any A span");
    println!("    {{ }} | count() > 3            Filter spansets by an aggregate");
    println!("    {{ }} | by(resource.service.name) | select(.http.url)");
    println!("    ... with(most_recent=true)   Query hints");
    println!();
    println!("  \x1b[1;33mSpecial Commands:\x1b[0m");
    println!("    \\explain <query>       Show the parsed query and extracted conditions");
    println!("    \\limit <n>             Set the trace limit (0 for the default)");
    println!("    \\json                  Toggle JSON output");
    println!("    \\recent                Toggle most-recent mode");
    println!("    exit, quit, \\q         Exit the CLI");
    println!("    help, \\h, \\?          Show this help message");
    println!();
}

fn print_table(response: &SearchResponse) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Trace ID",
        "Root Service",
        "Root Name",
        "Start",
        "Duration",
        "Spans",
    ]);

    for trace in &response.traces {
        let matched: usize = trace.spansets.iter().map(|s| s.matched).sum();
        table.add_row(vec![
            Cell::new(trace.trace_id),
            Cell::new(&trace.root_service_name),
            Cell::new(&trace.root_trace_name),
            Cell::new(format_time(trace.start_time_unix_nano)),
            Cell::new(format_duration(
                i64::try_from(trace.duration_ms).unwrap_or(i64::MAX / 1_000_000) * 1_000_000,
            )),
            Cell::new(matched),
        ]);
    }

    println!("{table}");
}

fn format_time(nanos: u64) -> String {
    let secs = (nanos / 1_000_000_000) as i64;
    let sub = (nanos % 1_000_000_000) as u32;
    match DateTime::<Utc>::from_timestamp(secs, sub) {
        Some(time) => time.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => nanos.to_string(),
    }
}

fn parse_time(value: &str) -> Result<u64, String> {
    let time = DateTime::parse_from_rfc3339(value)
        .map_err(|e| format!("invalid time '{}': {}", value, e))?;
    time.timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| format!("time '{}' is out of range", value))
}

/// Render query errors with a caret under the offending position
fn format_error(query: &str, err: &traceql::Error) -> String {
    match err {
        traceql::Error::Syntax { column, line: 1, .. } => format!(
            "{}\n  {}\n  {}^",
            err,
            query,
            " ".repeat(column.saturating_sub(1))
        ),
        _ => err.to_string(),
    }
}

fn build_session(args: &Args) -> Result<Session, String> {
    let config = match &args.config {
        Some(params) => EngineConfig::from_params(params).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(config).map_err(|e| e.to_string())?;

    let mut storages = Vec::with_capacity(args.traces.len());
    for path in &args.traces {
        storages.push(MemoryStorage::open(path).map_err(|e| e.to_string())?);
    }

    let start = match &args.start {
        Some(value) => parse_time(value)?,
        None => 0,
    };
    let end = match &args.end {
        Some(value) => parse_time(value)?,
        None => u64::MAX,
    };
    if end <= start {
        return Err("--end must be after --start".to_string());
    }

    Ok(Session {
        engine,
        storages,
        range: TimeRange::new(start, end),
        limit: args.limit,
        span_limit: args.span_limit,
        most_recent: args.most_recent,
        timeout: args.timeout_ms.map(Duration::from_millis),
        json_output: args.json_output,
        strict: args.strict,
        prune: !args.no_prune,
    })
}

fn run_piped(session: &Session, explain: bool) -> Result<(), String> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| format!("Error reading input: {}", e))?;
        let query = line.trim();
        // Skip blank and comment lines
        if query.is_empty() || query.starts_with('#') {
            continue;
        }
        if explain {
            session.explain(query)?;
        } else {
            session.run_query(query)?;
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let session = match build_session(&args) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Handle query flag - run single query and exit
    if let Some(ref query) = args.query {
        let result = if args.explain {
            session.explain(query)
        } else {
            session.run_query(query)
        };
        if let Err(e) = result {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if !io::stdin().is_terminal() {
        if let Err(e) = run_piped(&session, args.explain) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Interactive mode
    let mut repl = match Repl::new(session) {
        Ok(repl) => repl,
        Err(e) => {
            eprintln!("Error initializing CLI: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = repl.run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
