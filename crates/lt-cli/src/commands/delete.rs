//! Delete command for removing one contraction.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::Session;
use crate::commands::util::{confirm_and_apply, entry_index};

pub fn run<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    session: &mut Session,
    number: usize,
    assume_yes: bool,
) -> Result<()> {
    let offset = session.config.display_offset();
    let index = entry_index(number)?;
    let confirmation = session.store.request_delete(index)?;

    if confirm_and_apply(
        &mut session.store,
        &confirmation,
        input,
        writer,
        assume_yes,
        &offset,
    )? {
        writeln!(writer, "Deleted contraction #{number}.")?;
    }
    Ok(())
}
