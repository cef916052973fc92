//! Image editing demo - modifies an existing image with a text prompt.
//!
//! Run with: `cargo run --example edit_image -- <input_image.png> "<prompt>"`
//!
//! Requires `GOOGLE_API_KEY` (or `API_KEY`) environment variable.

use retouch::{encode, ClientConfig, FileSource, Session, Status, TransformationClientBuilder};

#[tokio::main]
async fn main() -> retouch::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(input_path), Some(prompt)) = (args.next(), args.next()) else {
        eprintln!("Usage: edit_image <input_image> <prompt>");
        std::process::exit(2);
    };

    let client = TransformationClientBuilder::from_config(ClientConfig::from_env()).build()?;

    let mut session = Session::new();
    session.select_image(encode(&FileSource::new(input_path))?);
    session.set_prompt(prompt);

    if !session.submit(&client).await {
        eprintln!("Nothing to submit: the prompt is empty");
        std::process::exit(2);
    }

    match session.status() {
        Status::Success(image) => {
            let path = retouch::TransformedImage::default_filename();
            image.save(&path)?;
            println!("Edited image saved to {path}");
        }
        Status::Error(message) => eprintln!("Transformation failed: {message}"),
        _ => {}
    }

    Ok(())
}
