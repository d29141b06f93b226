use std::{
    io::{self, Write},
    path::PathBuf,
    process,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use fenceline::{
    application::{
        error::AppError,
        render::{
            MarkdownRenderService, RenderPipelineConfig, RenderRequest, RenderService,
            default_palette_css, init_render_service,
        },
    },
    config,
    infra::{
        error::InfraError,
        output::{OutputTree, discover_markdown},
        telemetry,
    },
};
use futures::stream::{self, TryStreamExt};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

const MAX_RENDERALL_CONCURRENCY: usize = 32;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::ThemeCss => run_theme_css(),
        config::Command::Render(args) => {
            let service = init_render_service(RenderPipelineConfig::from(&settings.render))?;
            run_render(&service, args).await
        }
        config::Command::RenderAll(args) => {
            let service = init_render_service(RenderPipelineConfig::from(&settings.render))?;
            run_renderall(service, args).await
        }
    }
}

fn run_theme_css() -> Result<(), AppError> {
    write_stdout(default_palette_css().as_bytes())
}

async fn run_render(
    service: &MarkdownRenderService,
    args: config::RenderArgs,
) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| InfraError::io(&args.file, err))?;
    let label = args.file.display().to_string();

    let output = service
        .render(&RenderRequest::new(markdown).with_source(label.clone()))
        .map_err(|err| AppError::render(label, err))?;

    if args.json {
        let mut encoded = serde_json::to_vec_pretty(&output).map_err(InfraError::from)?;
        encoded.push(b'\n');
        write_stdout(&encoded)
    } else {
        write_stdout(output.html.as_bytes())
    }
}

async fn run_renderall(
    service: Arc<MarkdownRenderService>,
    args: config::RenderAllArgs,
) -> Result<(), AppError> {
    if !args.input.is_dir() {
        return Err(AppError::validation(format!(
            "`{}` is not a directory",
            args.input.display()
        )));
    }

    let concurrency = args.concurrency.clamp(1, MAX_RENDERALL_CONCURRENCY);
    let input = args.input.clone();
    let sources = tokio::task::spawn_blocking(move || discover_markdown(&input))
        .await
        .map_err(|err| AppError::unexpected(format!("discovery task failed: {err}")))??;

    info!(
        target = "fenceline::renderall",
        concurrency,
        files = sources.len(),
        input = %args.input.display(),
        out = %args.out.display(),
        "Starting renderall"
    );

    let tree = Arc::new(OutputTree::new(args.input, args.out));
    let total = Arc::new(AtomicUsize::new(0));
    let total_handle = total.clone();

    stream::iter(sources.into_iter().map(Ok::<PathBuf, AppError>))
        .try_for_each_concurrent(Some(concurrency), move |source| {
            let service = service.clone();
            let tree = tree.clone();
            let counter = total_handle.clone();
            async move {
                render_file(service, &tree, source).await?;
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        })
        .await?;

    info!(
        target = "fenceline::renderall",
        documents = total.load(Ordering::Relaxed),
        "Rendered all documents"
    );
    Ok(())
}

async fn render_file(
    service: Arc<MarkdownRenderService>,
    tree: &OutputTree,
    source: PathBuf,
) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&source)
        .await
        .map_err(|err| InfraError::io(&source, err))?;
    let label = source.display().to_string();

    let request = RenderRequest::new(markdown).with_source(label.clone());
    let output = tokio::task::spawn_blocking(move || service.render(&request))
        .await
        .map_err(|err| AppError::unexpected(format!("render task failed: {err}")))?
        .map_err(|err| AppError::render(label.clone(), err))?;

    tree.write(&source, &output).await?;
    info!(
        target = "fenceline::renderall",
        source = %label,
        "Rendered document"
    );
    Ok(())
}

fn write_stdout(bytes: &[u8]) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(|err| InfraError::io("<stdout>", err).into())
}
