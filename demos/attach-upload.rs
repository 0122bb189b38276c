use anyhow::Result;
use chunked_upload::{
    api::HttpTransport, client::Upload, file::PathPicker, settings::Overrides,
    trigger::TriggerBoard,
};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = env::args().collect::<Vec<_>>();

    let [_, path, url] = args.as_slice() else {
        panic!(
            "
        Please input file path and upload url
        Example:
            cargo run --example attach-upload the/path/to/my_file https://example.com/accept.php
        "
        )
    };

    let picker = PathPicker::new().select("file", path);
    let upload = Upload::new(Arc::new(picker), Arc::new(HttpTransport::new()));
    upload
        .defaults(Overrides {
            upload_url: Some(url.clone()),
            chunk_size: Some(120_000),
            ..Default::default()
        })
        .on_complete(|| println!("done"));

    let board = TriggerBoard::new();
    upload.attach(&board, "file-upload");

    // one activation, like a single click on the upload button
    for handle in board.activate("file-upload") {
        handle.await?;
    }

    Ok(())
}
