use anyhow::Result;
use chunked_upload::{api::HttpTransport, helper, settings::{Overrides, Settings}};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = env::args().collect::<Vec<_>>();

    match args.as_slice() {
        [_, path, url] => upload(path, url, None).await,
        [_, path, url, config] => upload(path, url, Some(config)).await,
        _ => panic!(
            "
        Please input file path, upload url and optionally a JSON config file
        Example:
            cargo run --example file-upload the/path/to/my_file https://example.com/accept.php upload.json
        "
        ),
    }
}

async fn upload(path: &String, url: &String, config: Option<&String>) -> Result<()> {
    let mut settings = Settings::default();
    if let Some(config) = config {
        settings.defaults(Overrides::from_json_file(config)?);
    }
    settings
        .defaults(Overrides {
            upload_url: Some(url.clone()),
            ..Default::default()
        })
        .on_complete(|| println!("server reported the upload complete"))
        .on_progress(|name, part, acknowledged, total| {
            println!("name: {name} part:{part} {acknowledged}/{total}");
        });

    let report = helper::upload_with(path, settings, Arc::new(HttpTransport::new())).await?;
    println!(
        "acknowledged: {}/{} missing: {:?}",
        report.acknowledged.len(),
        report.total,
        report.missing()
    );

    Ok(())
}
