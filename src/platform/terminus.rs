//! Platform implementation backed by the platform's command-line client.
//!
//! Each [`Platform`] method maps onto one client invocation. Queries request
//! `--format=json` and are decoded with `serde_json`; mutations are judged by
//! exit status alone. The client handles authentication and waits for the
//! platform workflows it starts, so every call here blocks until the platform
//! has finished.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;

use super::{Platform, RemoteCommand};
use crate::error::{Error, Result};
use crate::runner::{CommandOutput, CommandRunner, Invocation};
use crate::site::{
    Backup, ConnectionInfo, ConnectionMode, Element, Env, EnvironmentInfo, NewSite, RemoteOutput,
    Site,
};

/// Drives the platform client binary (`terminus` by default).
pub struct TerminusCli {
    binary: String,
    runner: Box<dyn CommandRunner>,
}

impl TerminusCli {
    pub fn new(binary: impl Into<String>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn invocation(&self, args: &[String]) -> Invocation {
        Invocation::new(self.binary.clone()).args(args.iter().cloned())
    }

    fn exec(&self, args: Vec<String>) -> Result<CommandOutput> {
        let invocation = self.invocation(&args);
        debug!("platform: {}", invocation);
        self.runner.run(&invocation)
    }

    /// Runs a command that must succeed; returns its stdout.
    fn exec_checked(&self, args: Vec<String>) -> Result<String> {
        let command = self.invocation(&args).to_string();
        let output = self.exec(args)?;
        if !output.success {
            return Err(Error::Platform {
                command,
                message: output.failure_message(),
            });
        }
        Ok(output.stdout)
    }

    fn query<T: DeserializeOwned>(&self, mut args: Vec<String>) -> Result<T> {
        args.push("--format=json".to_string());
        let command = self.invocation(&args).to_string();
        let stdout = self.exec_checked(args)?;
        serde_json::from_str(&stdout).map_err(|e| Error::Platform {
            command,
            message: format!("unexpected output: {}", e),
        })
    }
}

fn flag(name: &str, value: impl AsRef<str>) -> String {
    format!("--{}={}", name, value.as_ref())
}

fn site_env_flags(site: &Site, env: Env) -> [String; 2] {
    [flag("site", &site.name), flag("env", env.as_str())]
}

fn is_not_found(output: &CommandOutput) -> bool {
    let text = format!("{}{}", output.stderr, output.stdout).to_lowercase();
    text.contains("not found") || text.contains("cannot find") || text.contains("does not exist")
}

/// Accepts `true`, `"true"`, `"1"` and their negations.
fn bool_or_string<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
        Number(u64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Number(n) => Ok(n != 0),
        Flag::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(de::Error::custom(format!("not a boolean: {}", other))),
        },
    }
}

/// Upstreams are reported either by name or as an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum UpstreamField {
    Name(String),
    Object {
        #[serde(alias = "url")]
        id: String,
    },
}

#[derive(Deserialize)]
struct SiteRecord {
    #[serde(alias = "site")]
    name: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    upstream: Option<UpstreamField>,
    #[serde(default)]
    framework: Option<String>,
}

impl From<SiteRecord> for Site {
    fn from(record: SiteRecord) -> Self {
        Site {
            name: record.name,
            id: record.id,
            organization: record.organization.filter(|o| !o.is_empty()),
            upstream: record.upstream.map(|u| match u {
                UpstreamField::Name(name) => name,
                UpstreamField::Object { id } => id,
            }),
            framework: record.framework,
        }
    }
}

#[derive(Deserialize)]
struct EnvironmentRecord {
    #[serde(default, alias = "id")]
    name: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    initialized: bool,
}

/// Environment listings arrive as an array or as an object keyed by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum EnvironmentList {
    List(Vec<EnvironmentRecord>),
    Keyed(BTreeMap<String, EnvironmentRecord>),
}

impl EnvironmentList {
    fn into_infos(self) -> Vec<EnvironmentInfo> {
        match self {
            EnvironmentList::List(records) => records
                .into_iter()
                .filter_map(|r| {
                    r.name.map(|name| EnvironmentInfo {
                        name,
                        initialized: r.initialized,
                    })
                })
                .collect(),
            EnvironmentList::Keyed(map) => map
                .into_iter()
                .map(|(key, r)| EnvironmentInfo {
                    name: r.name.unwrap_or(key),
                    initialized: r.initialized,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct EnvironmentDetail {
    #[serde(
        default,
        alias = "number_of_commits_to_deploy",
        alias = "deployable_commit_count"
    )]
    deployable_commits: Option<u32>,
}

#[derive(Deserialize)]
struct ConnectionRecord {
    #[serde(default)]
    git_url: Option<String>,
    #[serde(default)]
    git_command: Option<String>,
}

#[derive(Deserialize)]
struct BackupRecord {
    #[serde(alias = "filename")]
    file: String,
    #[serde(default, alias = "finish_time")]
    finished_at: Option<f64>,
}

impl BackupRecord {
    fn into_backup(self, element: Element) -> Option<Backup> {
        let secs = self.finished_at?;
        let finish_time = DateTime::<Utc>::from_timestamp(secs.trunc() as i64, 0)?;
        Some(Backup {
            id: self.file,
            element,
            finish_time,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BackupList {
    List(Vec<BackupRecord>),
    Keyed(BTreeMap<String, BackupRecord>),
}

impl Platform for TerminusCli {
    fn find_site(&self, name: &str) -> Result<Option<Site>> {
        let mut args = vec!["site".to_string(), "info".to_string(), flag("site", name)];
        args.push("--format=json".to_string());
        let command = self.invocation(&args).to_string();
        let output = self.exec(args)?;

        if !output.success {
            if is_not_found(&output) {
                return Ok(None);
            }
            return Err(Error::Platform {
                command,
                message: output.failure_message(),
            });
        }

        let record: SiteRecord =
            serde_json::from_str(&output.stdout).map_err(|e| Error::Platform {
                command,
                message: format!("unexpected output: {}", e),
            })?;
        Ok(Some(record.into()))
    }

    fn environments(&self, site: &Site) -> Result<Vec<EnvironmentInfo>> {
        let list: EnvironmentList = self.query(vec![
            "site".to_string(),
            "environments".to_string(),
            flag("site", &site.name),
        ])?;
        Ok(list.into_infos())
    }

    fn count_deployable_commits(&self, site: &Site, env: Env) -> Result<u32> {
        let mut args = vec!["site".to_string(), "environment-info".to_string()];
        args.extend(site_env_flags(site, env));
        let command = self.invocation(&args).to_string();
        let detail: EnvironmentDetail = self.query(args)?;
        detail.deployable_commits.ok_or_else(|| Error::Platform {
            command,
            message: format!("no deployable commit count reported for {}", env),
        })
    }

    fn connection_info(&self, site: &Site, env: Env) -> Result<ConnectionInfo> {
        let mut args = vec!["site".to_string(), "connection-info".to_string()];
        args.extend(site_env_flags(site, env));
        let record: ConnectionRecord = self.query(args)?;
        Ok(ConnectionInfo {
            git_url: record.git_url,
            git_command: record.git_command,
        })
    }

    fn set_connection_mode(&self, site: &Site, env: Env, mode: ConnectionMode) -> Result<()> {
        let mut args = vec!["site".to_string(), "set-connection-mode".to_string()];
        args.extend(site_env_flags(site, env));
        args.push(flag("mode", mode.as_str()));
        let stdout = self.exec_checked(args)?;
        if let Some(line) = stdout.lines().find(|l| !l.trim().is_empty()) {
            info!("{}", line.trim());
        }
        Ok(())
    }

    fn finished_backups(&self, site: &Site, env: Env, element: Element) -> Result<Vec<Backup>> {
        let mut args = vec![
            "site".to_string(),
            "backups".to_string(),
            "list".to_string(),
        ];
        args.extend(site_env_flags(site, env));
        args.push(flag("element", element.as_str()));
        let list: BackupList = self.query(args)?;
        let records = match list {
            BackupList::List(records) => records,
            BackupList::Keyed(map) => map.into_values().collect(),
        };
        // Unfinished backups carry no finish time.
        Ok(records
            .into_iter()
            .filter_map(|r| r.into_backup(element))
            .collect())
    }

    fn backup_url(&self, site: &Site, env: Env, backup: &Backup) -> Result<String> {
        let mut args = vec!["site".to_string(), "backups".to_string(), "get".to_string()];
        args.extend(site_env_flags(site, env));
        args.push(flag("element", backup.element.as_str()));
        args.push(flag("file", &backup.id));
        let command = self.invocation(&args).to_string();
        let stdout = self.exec_checked(args)?;
        stdout
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("http"))
            .map(str::to_string)
            .ok_or_else(|| Error::Platform {
                command,
                message: "no backup URL in output".to_string(),
            })
    }

    fn create_backup(&self, site: &Site, env: Env, element: Element) -> Result<()> {
        let mut args = vec![
            "site".to_string(),
            "backups".to_string(),
            "create".to_string(),
        ];
        args.extend(site_env_flags(site, env));
        args.push(flag("element", element.as_str()));
        self.exec_checked(args).map(|_| ())
    }

    fn run_remote_command(
        &self,
        site: &Site,
        env: Env,
        command: &RemoteCommand,
    ) -> Result<RemoteOutput> {
        // The client's own subcommand is named after the remote program.
        let mut args = vec![command.program.clone(), command.args_line()];
        args.extend(site_env_flags(site, env));
        let output = self.exec(args)?;
        Ok(RemoteOutput {
            exit_code: output.code.unwrap_or(-1),
            output: if output.success {
                output.stdout
            } else {
                output.failure_message()
            },
        })
    }

    fn create_site(&self, new_site: &NewSite) -> Result<()> {
        let mut args = vec![
            "sites".to_string(),
            "create".to_string(),
            flag("site", &new_site.name),
            flag("label", &new_site.label),
        ];
        if let Some(org) = &new_site.organization {
            args.push(flag("org", org));
        }
        if let Some(upstream) = &new_site.upstream {
            args.push(flag("upstream", upstream));
        }
        let output = self.exec(args)?;
        if !output.success {
            return Err(Error::Provisioning {
                site: new_site.name.clone(),
                message: output.failure_message(),
            });
        }
        Ok(())
    }

    fn import_content(&self, site: &Site, env: Env, element: Element, url: &str) -> Result<()> {
        let mut args = vec!["site".to_string(), "import-content".to_string()];
        args.extend(site_env_flags(site, env));
        args.push(flag("url", url));
        args.push(flag("element", element.as_str()));
        let output = self.exec(args)?;
        if !output.success {
            return Err(Error::Import {
                site: site.name.clone(),
                env: env.to_string(),
                element: element.to_string(),
                message: output.failure_message(),
            });
        }
        Ok(())
    }

    fn deploy(&self, site: &Site, env: Env, note: &str) -> Result<()> {
        let mut args = vec!["site".to_string(), "deploy".to_string()];
        args.extend(site_env_flags(site, env));
        args.push(flag("note", note));
        self.exec_checked(args).map(|_| ())
    }
}
