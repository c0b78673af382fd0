//! Clear command for wiping all contractions and notes.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::Session;
use crate::commands::util::confirm_and_apply;

pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    session: &mut Session,
    assume_yes: bool,
) -> Result<()> {
    if session.store.log().is_empty() && session.store.notes().is_empty() {
        writeln!(writer, "Nothing to clear.")?;
        return Ok(());
    }

    let offset = session.config.display_offset();
    let confirmation = session.store.request_clear();
    if confirm_and_apply(
        &mut session.store,
        &confirmation,
        input,
        writer,
        assume_yes,
        &offset,
    )? {
        writeln!(writer, "All data cleared.")?;
    }
    Ok(())
}
