//! `.netrc`-style credential lookup.
//!
//! Minimal parser for the token stream `machine <host> login <l> password
//! <p>`, with a `default` entry honored as a fallback. `macdef` bodies are
//! not interpreted.

use std::path::{Path, PathBuf};

use anyhow::Context;

use natter_client::Credentials;

pub fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".netrc"))
}

/// The machine name to look up for an API base URL: scheme, port and path
/// stripped.
pub fn host_of(api_base: &str) -> &str {
    let rest = api_base
        .split_once("://")
        .map_or(api_base, |(_, rest)| rest);
    let rest = rest.split('/').next().unwrap_or(rest);
    rest.split(':').next().unwrap_or(rest)
}

#[derive(Default)]
struct Entry {
    machine: Option<String>, // None = the `default` entry
    login: Option<String>,
    password: Option<String>,
}

impl Entry {
    fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            login: self.login.clone()?,
            password: self.password.clone()?,
        })
    }
}

/// Find credentials for `host`. A matching `machine` entry wins over
/// `default`; entries missing a login or password are ignored. `Ok(None)`
/// means the file parsed but holds nothing usable for this host.
pub fn lookup(path: &Path, host: &str) -> anyhow::Result<Option<Credentials>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let mut entries: Vec<Entry> = Vec::new();
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        match token {
            "machine" => {
                let name = tokens
                    .next()
                    .context("`machine` keyword without a host name")?;
                entries.push(Entry {
                    machine: Some(name.to_string()),
                    ..Entry::default()
                });
            }
            "default" => entries.push(Entry::default()),
            "login" => {
                if let Some(entry) = entries.last_mut() {
                    entry.login = tokens.next().map(str::to_string);
                }
            }
            "password" => {
                if let Some(entry) = entries.last_mut() {
                    entry.password = tokens.next().map(str::to_string);
                }
            }
            // keyword takes a value we do not use
            "account" | "macdef" => {
                tokens.next();
            }
            _ => {}
        }
    }

    let matched = entries
        .iter()
        .find(|e| e.machine.as_deref() == Some(host) && e.credentials().is_some())
        .or_else(|| {
            entries
                .iter()
                .find(|e| e.machine.is_none() && e.credentials().is_some())
        });
    Ok(matched.and_then(Entry::credentials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn netrc(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn host_of_strips_scheme_port_and_path() {
        assert_eq!(host_of("https://convore.com"), "convore.com");
        assert_eq!(host_of("http://localhost:8080/api"), "localhost");
        assert_eq!(host_of("convore.com/api"), "convore.com");
    }

    #[test]
    fn machine_entry_wins() {
        let file = netrc(
            "machine example.org login other password nope\n\
             machine convore.com login ana password s3cret\n\
             default login fallback password fb\n",
        );
        let creds = lookup(file.path(), "convore.com").unwrap().unwrap();
        assert_eq!(creds.login, "ana");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn default_entry_is_the_fallback() {
        let file = netrc("machine example.org login a password b\ndefault login fb password pw\n");
        let creds = lookup(file.path(), "convore.com").unwrap().unwrap();
        assert_eq!(creds.login, "fb");
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        let file = netrc("machine convore.com login ana\n");
        assert!(lookup(file.path(), "convore.com").unwrap().is_none());
    }

    #[test]
    fn no_match_is_none_not_an_error() {
        let file = netrc("machine example.org login a password b\n");
        assert!(lookup(file.path(), "convore.com").unwrap().is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(lookup(Path::new("/nonexistent/.netrc"), "convore.com").is_err());
    }

    #[test]
    fn single_line_entry_parses() {
        let file = netrc("machine convore.com login ana password s3cret");
        assert!(lookup(file.path(), "convore.com").unwrap().is_some());
    }
}
