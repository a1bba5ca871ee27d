use anyhow::Context;
use tracing::{error, info};
use user_upload::config::{command, Action, ImportTarget, UploadConfig};
use user_upload::logging::{init_logging, LogConfig};
use user_upload::{connect, create_table, pipeline, release};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();
    let config = UploadConfig::from_matches(&matches)?;

    init_logging(&LogConfig::verbose(config.verbose).with_env()?)?;

    match &config.action {
        Action::Usage => {
            println!("{}", command().render_help());
        }
        Action::CreateTable(settings) => {
            let mut conn = connect(settings)
                .await
                .context("could not connect to the database")?;
            if let Err(err) = create_table(&mut conn).await {
                error!(error = %err, "could not create users table");
            }
            release(conn).await;
        }
        Action::Import {
            file,
            charset,
            target: ImportTarget::DryRun,
        } => {
            pipeline::dry_run(file, *charset)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
        }
        Action::Import {
            file,
            charset,
            target: ImportTarget::Database(settings),
        } => {
            let mut conn = connect(settings)
                .await
                .context("could not connect to the database")?;
            // no `?` until the connection is released
            let outcome = pipeline::import(file, *charset, &mut conn).await;
            release(conn).await;

            let (result, summary) =
                outcome.with_context(|| format!("failed to read {}", file.display()))?;
            info!(
                rows = result.rows_read,
                rejected = result.rejected.len(),
                inserted = summary.inserted,
                failed = summary.failed.len(),
                "import finished"
            );
        }
    }

    Ok(())
}
