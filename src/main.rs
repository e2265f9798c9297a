use std::io::{self, Read, Write};

use markloom::{Options, ParseError, to_html};

/// Reads Markdown on stdin and writes HTML to stdout. An optional first
/// argument names a JSON options file; unspecified options keep defaults.
fn main() -> Result<(), ParseError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("loading options from {}", path);
            Options::from_json(&std::fs::read_to_string(path)?)?
        }
        None => Options::default(),
    };

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;
    let input = String::from_utf8_lossy(&input);
    let output = to_html(&input, &options)?;
    io::stdout().write_all(output.as_bytes())?;
    Ok(())
}
