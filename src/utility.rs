//! Utilities
//!
//! The settings are taken from, in this order:
//! - the command line argument.
//! - the environment variable, which can be set in the `.env` file (read via `dotenv().ok()`).
//! - the default in [crate::DEFAULT_PARALLEL], [crate::DEFAULT_QUERY_TIMEOUT_MS] and [crate::DEFAULT_ATTACH_TIMEOUT_MS].
//!
//! A setting that came from the command line or the environment is recorded in `changed_options`,
//! so it can be written to `.env` with `--write-dotenv`.
use std::{env, fs, collections::HashMap, io::Write, time::Duration};
use log::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use crate::{DEFAULT_ATTACH_TIMEOUT_MS, DEFAULT_PARALLEL, DEFAULT_QUERY_TIMEOUT_MS};

pub fn resolve_setting(
    option: &Option<String>,
    env_name: &'static str,
    default: &str,
    changed_options: &mut HashMap<&'static str, String>,
) -> String
{
    match option {
        Some(value) => {
            info!("{} set via argument: using: {}", env_name, value);
            changed_options.insert(env_name, value.to_string());
            value.to_string()
        },
        None => match env::var(env_name) {
            Ok(set_var) => {
                info!("{} not set: set via .env: {}", env_name, set_var);
                changed_options.insert(env_name, set_var.to_owned());
                set_var
            },
            Err(_e) => {
                info!("{} not set: and not set via .env: using default: {}", env_name, default);
                default.to_string()
            },
        },
    }
}

pub fn set_parallel(
    option: &Option<String>,
    changed_options: &mut HashMap<&'static str, String>,
) -> Result<usize>
{
    let parallel_string = resolve_setting(option, "HOTTHREADS_PARALLEL", DEFAULT_PARALLEL, changed_options);
    let parallel: usize = parallel_string.parse()
        .with_context(|| format!("Invalid number for parallel: {}", parallel_string))?;
    if parallel == 0 {
        bail!("parallel must be at least 1");
    }
    Ok(parallel)
}

fn set_milliseconds(
    option: &Option<String>,
    env_name: &'static str,
    default: &str,
    changed_options: &mut HashMap<&'static str, String>,
) -> Result<Duration>
{
    let ms_string = resolve_setting(option, env_name, default, changed_options);
    let ms: u64 = ms_string.parse()
        .with_context(|| format!("Invalid number of milliseconds for {}: {}", env_name, ms_string))?;
    Ok(Duration::from_millis(ms))
}

pub fn set_query_timeout(
    option: &Option<String>,
    changed_options: &mut HashMap<&'static str, String>,
) -> Result<Duration>
{
    set_milliseconds(option, "HOTTHREADS_QUERY_TIMEOUT_MS", DEFAULT_QUERY_TIMEOUT_MS, changed_options)
}

pub fn set_attach_timeout(
    option: &Option<String>,
    changed_options: &mut HashMap<&'static str, String>,
) -> Result<Duration>
{
    set_milliseconds(option, "HOTTHREADS_ATTACH_TIMEOUT_MS", DEFAULT_ATTACH_TIMEOUT_MS, changed_options)
}

pub fn set_regex(
    regex: &Option<String>,
) -> Result<Regex>
{
    let regex = regex.as_deref().unwrap_or(".*");
    Regex::new(regex).with_context(|| format!("Invalid regex: {}", regex))
}

pub fn dotenv_writer(
    write_dotenv: bool,
    changed_options: HashMap<&str, String>,
) -> Result<()>
{
    if !changed_options.is_empty() && write_dotenv {
        info!("Writing .env file");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(".env")
            .with_context(|| "Error writing .env file: .env")?;

        for (key, value) in changed_options {
            file.write_all(format!("{}={}\n", key, value).as_bytes())?;
            info!("{}={}", key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_resolve_setting_argument_first() {
        env::set_var("HOTTHREADS_TEST_ARGUMENT", "8");
        let mut changed_options = HashMap::new();
        let value = resolve_setting(&Some("4".to_string()), "HOTTHREADS_TEST_ARGUMENT", "1", &mut changed_options);
        assert_eq!(value, "4");
        assert_eq!(changed_options["HOTTHREADS_TEST_ARGUMENT"], "4");
    }

    #[test]
    fn unit_resolve_setting_environment() {
        env::set_var("HOTTHREADS_TEST_ENVIRONMENT", "8");
        let mut changed_options = HashMap::new();
        let value = resolve_setting(&None, "HOTTHREADS_TEST_ENVIRONMENT", "1", &mut changed_options);
        assert_eq!(value, "8");
        assert_eq!(changed_options["HOTTHREADS_TEST_ENVIRONMENT"], "8");
    }

    #[test]
    fn unit_resolve_setting_default() {
        let mut changed_options = HashMap::new();
        let value = resolve_setting(&None, "HOTTHREADS_TEST_NOT_SET", "1", &mut changed_options);
        assert_eq!(value, "1");
        // defaults are not written to .env
        assert!(changed_options.is_empty());
    }

    #[test]
    fn unit_set_parallel_rejects_invalid() {
        let mut changed_options = HashMap::new();
        assert_eq!(set_parallel(&Some("3".to_string()), &mut changed_options).unwrap(), 3);
        assert!(set_parallel(&Some("0".to_string()), &mut changed_options).is_err());
        assert!(set_parallel(&Some("many".to_string()), &mut changed_options).is_err());
    }

    #[test]
    fn unit_set_timeouts() {
        let mut changed_options = HashMap::new();
        assert_eq!(set_query_timeout(&Some("250".to_string()), &mut changed_options).unwrap(), Duration::from_millis(250));
        assert_eq!(set_attach_timeout(&Some("3000".to_string()), &mut changed_options).unwrap(), Duration::from_secs(3));
        assert!(set_query_timeout(&Some("-1".to_string()), &mut changed_options).is_err());
    }

    #[test]
    fn unit_set_regex() {
        assert!(set_regex(&None).unwrap().is_match("anything"));
        assert!(set_regex(&Some("^pool-".to_string())).unwrap().is_match("pool-1-thread-1"));
        assert!(set_regex(&Some("(".to_string())).is_err());
    }
}
