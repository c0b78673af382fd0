//! Open-url command importing the data carried by a share link.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use url::Url;

use lt_core::codec;

use crate::Session;
use crate::commands::import;

pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    session: &mut Session,
    link: &str,
    assume_yes: bool,
) -> Result<bool> {
    let url = Url::parse(link.trim()).with_context(|| format!("{link:?} is not a valid link"))?;
    if codec::import_param(&url).is_none() {
        anyhow::bail!("link carries no tracker data (expected a `d` or `import` parameter)");
    }
    let stripped = codec::strip_import_params(&url);

    // The import parameters are dropped whether or not the payload decodes.
    let snapshot = match lt_core::decode_transport(url.as_str()) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            writeln!(writer, "Page address: {stripped}")?;
            return Err(err).context("link does not carry valid tracker data");
        }
    };

    let applied = import::apply(input, writer, session, snapshot, assume_yes)?;
    writeln!(writer, "Page address: {stripped}")?;
    Ok(applied)
}
