use std::io;
use std::path::Path;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod feed;
mod host;
mod models;
mod sync;

use config::Config;
use db::Repository;
use error::{AppError, Result};
use feed::FeedFetcher;
use host::SettingsStore;
use models::{Role, UserId};
use sync::{FeedSyncJob, RunReport, ADMIN_URL_OPTION, LAST_READ_OPTION, UPDATE_EVENT};

const USAGE: &str = "\
Usage: tng-digest <command>

Commands:
  run                       Fetch the TNG feed and publish new days now
  tick                      Run if the scheduled update is due (call from cron)
  activate                  Create the category and schedule the update
  deactivate <user-id>      Remove the scheduled update (administrators only)
  set-admin-url <url>       Store the TNG admin URL, e.g. https://site/tng/admin.php
  add-user <login> [role]   Add a site user (default role: administrator)
  status                    Show watermark, schedule and recent posts";

fn init_logging(log_path: Option<&Path>) {
    use std::fs::OpenOptions;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    let log_file = log_path.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(std::sync::Arc::new(std::sync::Mutex::new(file))),
            Err(err) => {
                eprintln!("Warning: unable to open {:?}: {err}", path);
                None
            }
        }
    });

    struct DualWriter {
        file: Option<std::sync::Arc<std::sync::Mutex<std::fs::File>>>,
    }

    impl Write for DualWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(file) = &self.file {
                if let Ok(mut file) = file.lock() {
                    let _ = file.write_all(buf);
                }
            }
            std::io::stderr().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            if let Some(file) = &self.file {
                if let Ok(mut file) = file.lock() {
                    let _ = file.flush();
                }
            }
            std::io::stderr().flush()
        }
    }

    impl<'a> MakeWriter<'a> for DualWriter {
        type Writer = DualWriter;

        fn make_writer(&'a self) -> Self::Writer {
            DualWriter {
                file: self.file.clone(),
            }
        }
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(env_filter))
        .with_writer(DualWriter { file: log_file })
        .init();
}

fn log_filter(env_filter: EnvFilter) -> EnvFilter {
    // html5ever warns about every malformed title fragment
    match "html5ever=error".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(config.log_file.as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    if matches!(args.first().copied(), None | Some("help" | "-h" | "--help")) {
        println!("{}", USAGE);
        return Ok(());
    }

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let repo = Repository::new(config.database_path.to_string_lossy().as_ref()).await?;
    let fetcher = FeedFetcher::new(config.http_timeout())?;
    let job = FeedSyncJob::new(fetcher, repo, config.job_options()?, config.hooks());

    match args.as_slice() {
        ["run"] => print_report(&job.run().await?),
        ["tick"] => match job.tick(Utc::now()).await? {
            Some(report) => print_report(&report),
            None => println!("Update not due"),
        },
        ["activate"] => {
            job.activate(Utc::now()).await?;
            println!("Activated; '{}' is scheduled", UPDATE_EVENT);
        }
        ["deactivate", user] => {
            let user = user
                .parse::<UserId>()
                .map_err(|_| AppError::Config(format!("'{}' is not a user id", user)))?;
            job.deactivate(user).await?;
            println!("Deactivated; '{}' is unscheduled", UPDATE_EVENT);
        }
        ["set-admin-url", url] => {
            feed::feed_url(url, &config.feed_endpoint)?;
            job.host().set_option(ADMIN_URL_OPTION, url).await?;
            println!("Admin URL set to {}", url);
        }
        ["add-user", login, rest @ ..] => {
            let role = match rest {
                [] => Role::Administrator,
                [role] => role.parse().map_err(AppError::Config)?,
                _ => return Err(AppError::Config(USAGE.to_string())),
            };
            let id = job.host().add_user(login, role).await?;
            println!("Added {} '{}' with id {}", role, login, id);
        }
        ["status"] => print_status(job.host()).await?,
        _ => return Err(AppError::Config(USAGE.to_string())),
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    match report {
        RunReport::Skipped(reason) => println!("Nothing published: {:?}", reason),
        RunReport::Published(summary) => println!(
            "Published {} posts ({} failed), watermark now {}",
            summary.posts_created, summary.posts_failed, summary.watermark
        ),
    }
}

async fn print_status(repo: &Repository) -> Result<()> {
    let admin_url = repo.get_option(ADMIN_URL_OPTION).await?;
    let watermark = repo.get_option(LAST_READ_OPTION).await?;

    println!("Admin URL:  {}", admin_url.as_deref().unwrap_or("(not set)"));
    println!("Last read:  {}", watermark.as_deref().unwrap_or("0"));
    match repo.next_run(UPDATE_EVENT).await? {
        Some(next_run) => println!("Next run:   {}", next_run.to_rfc3339()),
        None => println!("Next run:   (not scheduled)"),
    }

    let posts = repo.recent_posts(10).await?;
    if !posts.is_empty() {
        println!("\nRecent posts:");
    }
    for post in posts {
        let date = post
            .post_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "?".to_string());
        let author = post
            .author_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{} {} [{}] {} (category: {}, author: {})",
            post.id, date, post.status, post.title, post.category, author
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_quiets_html5ever() {
        let filter = log_filter(EnvFilter::new("info")).to_string();

        assert!(filter.contains("html5ever=error"));
        assert!(filter.contains("info"));
    }
}
