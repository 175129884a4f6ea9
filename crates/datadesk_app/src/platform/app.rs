use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, ensure, Context};
use datadesk_core::upload::{parse_url_image_csv, split_into_chunks};
use datadesk_core::{PollPhase, PollerView};
use datadesk_engine::admin;
use datadesk_engine::{
    ApiClient, Browser, ChunkUploader, Dataset, HttpChunkApi, HttpJobApi, HttpListApi,
    ImportPoller, JobApi, JobKind, LoggingUploadSink, SessionHandle, UploadEvent, UploadPolicy,
    UploadSink,
};
use desk_logging::{desk_info, desk_warn};
use serde_json::json;

use super::persistence::{clear_token, load_token, save_token, SessionFileReset};
use super::render;
use crate::cli::{Cli, Command};
use crate::config::AppConfig;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::resolve(&cli.global)?;
    desk_info!(
        "datadesk starting: api={} state_dir={:?}",
        config.settings.base_url,
        config.state_dir
    );

    let session = match load_token(&config.state_dir) {
        Some(token) => SessionHandle::with_token(token),
        None => SessionHandle::default(),
    };
    let client = ApiClient::new(config.settings.clone(), session)?
        .with_auth_failure_handler(Arc::new(SessionFileReset::new(config.state_dir.clone())));

    if !matches!(cli.command, Command::Login { .. } | Command::Logout) {
        ensure!(
            client.session().is_authenticated(),
            "Not logged in. Run `datadesk login` first."
        );
    }
    dispatch(&client, &config, cli.command).await
}

async fn dispatch(client: &ApiClient, config: &AppConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            login(client, &config.state_dir, &username, &password).await
        }
        Command::Logout => {
            if clear_token(&config.state_dir) {
                println!("Logged out.");
            } else {
                println!("No saved session.");
            }
            Ok(())
        }
        Command::Whoami => {
            let user = admin::me(client).await?;
            let role = user.role.as_deref().unwrap_or("user");
            match &user.email {
                Some(email) => println!("{} <{}> ({role})", user.username, email),
                None => println!("{} ({role})", user.username),
            }
            Ok(())
        }
        Command::Browse {
            dataset,
            filters,
            page,
            pages,
            json,
        } => browse(client, config, dataset, filters, page, pages, json).await,
        Command::Import { job, url_column } => import(client, config, job, url_column).await,
        Command::Stop { job, process_id } => {
            let api = HttpJobApi::for_kind(client.clone(), job);
            ensure!(api.stoppable(), "{job} cannot be stopped");
            api.stop(process_id.as_deref()).await?;
            println!("Stop requested for {job}.");
            Ok(())
        }
        Command::UploadSsUrl { file, bucket } => upload(client, config, &file, bucket).await,
        Command::Moderate { ids, adult } => {
            let message = admin::bulk_process_references(client, &ids, adult).await?;
            println!("{message}");
            Ok(())
        }
        Command::Stats { dataset } => {
            match dataset {
                Some(dataset) => {
                    let count = admin::dataset_stats(client, dataset).await?;
                    println!("{dataset}: {count} records");
                }
                None => {
                    let stats = admin::collection_stats(client).await?;
                    print!("{}", render::render_collection_stats(&stats));
                }
            }
            Ok(())
        }
        Command::DeleteAll { dataset, yes } => {
            ensure!(
                yes,
                "Deleting every {dataset} record cannot be undone; pass --yes to confirm"
            );
            desk_warn!("Deleting all records of {}", dataset);
            match admin::delete_all(client, dataset).await? {
                Some(count) => println!("Deleted {count} {dataset} records."),
                None => println!("Deleted all {dataset} records."),
            }
            Ok(())
        }
    }
}

async fn login(
    client: &ApiClient,
    state_dir: &Path,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    let user = admin::login(client, username, password).await?;
    let token = client
        .session()
        .token()
        .ok_or_else(|| anyhow!("login succeeded but no token was issued"))?;
    save_token(state_dir, &token)?;
    println!("Logged in as {}.", user.username);
    Ok(())
}

async fn browse(
    client: &ApiClient,
    config: &AppConfig,
    dataset: Dataset,
    filters: Vec<(String, String)>,
    page: Option<u32>,
    pages: u32,
    json: bool,
) -> anyhow::Result<()> {
    let api = HttpListApi::for_dataset(client.clone(), dataset)?;
    let mut browser = Browser::new(api, config.browser_config());

    for (field, value) in filters {
        browser.edit_filter(field, value);
    }
    let mut view = browser.submit_filters().await;
    if let Some(page) = page.filter(|page| *page > 1) {
        view = browser.jump_to_page(page).await;
    }

    for shown in 0..pages.max(1) {
        if shown > 0 {
            if !view.can_next {
                break;
            }
            view = browser.next_page().await;
        }
        if let Some(error) = &view.error {
            bail!("{error}");
        }
        print!("{}", render::render_page(&view, json));
    }
    Ok(())
}

enum ImportStep {
    Update(Option<PollerView>),
    Interrupted,
}

async fn import(
    client: &ApiClient,
    config: &AppConfig,
    job: JobKind,
    url_column: Option<String>,
) -> anyhow::Result<()> {
    let mut api = HttpJobApi::for_kind(client.clone(), job);
    if let Some(column) = url_column {
        api = api.with_start_body(json!({ "urlColumn": column }));
    }
    let mut poller = ImportPoller::new(api, config.poller_config());
    poller.start();
    println!("Starting {job}... (Ctrl-C to stop)");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut printed_logs = 0;

    loop {
        let step = tokio::select! {
            update = poller.next_update() => ImportStep::Update(update),
            _ = &mut ctrl_c, if !interrupted => ImportStep::Interrupted,
        };

        match step {
            ImportStep::Update(Some(view)) => {
                for entry in &view.logs[printed_logs.min(view.logs.len())..] {
                    println!("{}", render::render_log_entry(entry));
                }
                printed_logs = view.logs.len();
                if matches!(view.phase, PollPhase::Running | PollPhase::Stopping) {
                    println!("{}", render::render_progress(&view));
                }
            }
            ImportStep::Update(None) => break,
            ImportStep::Interrupted => {
                interrupted = true;
                if poller.view().can_stop {
                    eprintln!("Stopping {job}...");
                    poller.stop();
                } else {
                    eprintln!("Detaching; the job keeps running on the server.");
                    poller.dispose();
                    return Ok(());
                }
            }
        }
    }

    let view = poller.view();
    if let Some(error) = view.last_error {
        bail!("{job} failed: {error}");
    }
    println!("{}", view.status_text);
    Ok(())
}

/// Prints upload events as they arrive and mirrors them to the log.
struct TerminalUploadSink;

impl UploadSink for TerminalUploadSink {
    fn emit(&self, event: UploadEvent) {
        let line = render::render_upload_event(&event);
        match event {
            UploadEvent::ChunkFailed { .. } | UploadEvent::ChunkRetrying { .. } => {
                eprintln!("{line}")
            }
            _ => println!("{line}"),
        }
        LoggingUploadSink.emit(event);
    }
}

async fn upload(
    client: &ApiClient,
    config: &AppConfig,
    file: &Path,
    bucket: String,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file).with_context(|| format!("reading {file:?}"))?;
    let rows = parse_url_image_csv(&text).with_context(|| format!("parsing {file:?}"))?;
    ensure!(!rows.is_empty(), "{file:?} has no rows with both url and image");

    let chunks = split_into_chunks(&rows, config.settings.chunk_size);
    println!(
        "Uploading {} rows in {} chunks to bucket {bucket}",
        rows.len(),
        chunks.len()
    );

    let uploader = ChunkUploader::new(
        HttpChunkApi::new(client.clone(), bucket),
        UploadPolicy::from(&config.settings),
    );
    let cancel = uploader.cancel_token();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current batch...");
            cancel.cancel();
        }
    });

    let report = uploader.run(&chunks, &TerminalUploadSink).await;
    watcher.abort();

    println!("{}", render::render_upload_summary(&report.stats));
    match report.aborted {
        Some(err) => Err::<(), _>(err).context("upload stopped before all chunks were sent"),
        None => Ok(()),
    }
}
