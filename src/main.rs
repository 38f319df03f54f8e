use std::{collections::HashMap, sync::Arc};
use clap::Parser;
use dotenv::dotenv;
use log::*;
use anyhow::{Context, Result};
use hot_threads::{utility, attach::HotspotAttach, hotthreads::{HotThreads, PrintOptions, ReportConfig}, identity::Pid, procfs::ProcfsThreadStats};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Opts {
    /// process id of the JVM
    #[arg(value_parser = clap::value_parser!(i32).range(1..))]
    pid: i32,
    /// number of parallel threads reading the OS thread statistics.
    /// Every read runs on a thread of its own so it can time out, a read that times out keeps its thread until it finishes
    #[arg(long, value_name = "nr")]
    parallel: Option<String>,
    /// milliseconds reading the statistics of a single OS thread may take
    #[arg(long, value_name = "ms")]
    query_timeout_ms: Option<String>,
    /// milliseconds to wait for the JVM to respond to the attach request
    #[arg(long, value_name = "ms")]
    attach_timeout_ms: Option<String>,
    /// only show the first nr threads
    #[arg(long, value_name = "nr")]
    top: Option<usize>,
    /// regex to select thread names
    #[arg(long, value_name = "regex")]
    name_match: Option<String>,
    /// show the thread dump text of every thread
    #[arg(long)]
    print_stack: bool,
    /// print the threads as JSON
    #[arg(long)]
    json: bool,
    /// write the used settings to .env
    #[arg(long)]
    write_dotenv: bool,
}

#[tokio::main]
async fn main() -> Result<()>
{
    env_logger::init();
    dotenv().ok();
    let options = Opts::parse();

    let mut changed_options = HashMap::new();
    let parallel = utility::set_parallel(&options.parallel, &mut changed_options)?;
    let query_timeout = utility::set_query_timeout(&options.query_timeout_ms, &mut changed_options)?;
    let attach_timeout = utility::set_attach_timeout(&options.attach_timeout_ms, &mut changed_options)?;
    let print_options = PrintOptions {
        top: options.top,
        name_filter: utility::set_regex(&options.name_match)?,
        print_stack: options.print_stack,
    };

    let pid = Pid(options.pid);
    let attach = HotspotAttach::new(attach_timeout, attach_timeout);
    let dump = attach.thread_dump(pid)
        .await
        .with_context(|| format!("Unable to obtain the thread dump of process {}", pid))?;
    debug!("thread dump of {} bytes", dump.len());

    let source = Arc::new(ProcfsThreadStats::new()?);
    let config = ReportConfig { parallel, query_timeout };
    let hotthreads = HotThreads::report(pid, &dump, source, &config)?;

    if options.json {
        hotthreads.print_json(&print_options)?;
    } else {
        hotthreads.print(&print_options);
    }

    utility::dotenv_writer(options.write_dotenv, changed_options)?;

    Ok(())
}
