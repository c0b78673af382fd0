//! Share command printing a link that carries all data.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use url::Url;

use lt_core::codec;

use crate::Session;

pub fn run<W: Write>(writer: &mut W, session: &Session, now: DateTime<Utc>) -> Result<Url> {
    let base = Url::parse(&session.config.share_base_url).with_context(|| {
        format!(
            "share_base_url {:?} is not a valid URL",
            session.config.share_base_url
        )
    })?;
    let snapshot = session.store.export_snapshot_at(now);
    let url = codec::share_url(&base, &snapshot)
        .context("too much data for a share link; use `lt export` instead")?;

    tracing::debug!(len = url.as_str().len(), "share link built");
    writeln!(writer, "{url}")?;
    Ok(url)
}
