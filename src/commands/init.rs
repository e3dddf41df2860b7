use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::config::{self, Config, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::error::{Result, UsersError};

pub async fn run() -> Result<()> {
    let config_path = Config::config_path()?;
    let stdin = io::stdin();
    let mut input = stdin.lock();

    if config_path.exists() {
        let answer = prompt(
            &mut input,
            &format!(
                "Config file already exists at {}. Overwrite? [y/N] ",
                config_path.display()
            ),
        )?;

        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("Users CLI Configuration");
    println!("=======================\n");

    let config = ask_config(&mut input)?;
    write_config(&config_path, &config)?;

    println!("\nConfig saved to {}", config_path.display());
    println!("You can now use 'users' commands!");

    Ok(())
}

fn prompt(input: &mut impl BufRead, question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn ask_config(input: &mut impl BufRead) -> Result<Config> {
    let base_url = prompt(input, &format!("API base URL [{DEFAULT_BASE_URL}]: "))?;
    let base_url = if base_url.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else {
        config::parse_base_url(&base_url)?;
        base_url
    };

    let timeout = prompt(
        input,
        &format!("Request timeout in seconds [{DEFAULT_TIMEOUT_SECS}]: "),
    )?;
    let timeout_secs = if timeout.is_empty() {
        DEFAULT_TIMEOUT_SECS
    } else {
        match timeout.parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => return Err(UsersError::InvalidTimeout(timeout)),
        }
    };

    Ok(Config {
        base_url: Some(base_url),
        timeout_secs: Some(timeout_secs),
        cache_ttl_secs: None,
    })
}

fn write_config(path: &Path, config: &Config) -> Result<()> {
    let write_err = |e| UsersError::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let contents = toml::to_string(config)
        .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    std::fs::write(path, contents).map_err(write_err)
}
