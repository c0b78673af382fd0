//! Notes command for reading and changing the free-text notes.

use std::io::Write;

use anyhow::Result;

use crate::{NotesAction, Session};

pub fn run<W: Write>(writer: &mut W, session: &mut Session, action: &NotesAction) -> Result<()> {
    match action {
        NotesAction::Show => {
            let notes = session.store.notes();
            if notes.is_empty() {
                writeln!(writer, "No notes.")?;
            } else {
                writeln!(writer, "{notes}")?;
            }
        }
        NotesAction::Set { text } => {
            session.store.set_notes(text.as_str());
            writeln!(writer, "Notes saved ({} characters).", text.chars().count())?;
        }
        NotesAction::Append { text } => {
            let current = session.store.notes();
            let updated = if current.is_empty() {
                text.clone()
            } else {
                format!("{current}\n{text}")
            };
            let len = updated.chars().count();
            session.store.set_notes(updated);
            writeln!(writer, "Notes saved ({len} characters).")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::session::test_support::session_in;

    fn notes(session: &mut Session, action: NotesAction) -> String {
        let mut output = Vec::new();
        run(&mut output, session, &action).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn notes_set_append_show() {
        let temp = tempfile::tempdir().unwrap();
        let mut session = session_in(temp.path());

        assert_eq!(notes(&mut session, NotesAction::Show), "No notes.\n");
        notes(
            &mut session,
            NotesAction::Append {
                text: "08:40 waters broke".to_string(),
            },
        );
        notes(
            &mut session,
            NotesAction::Append {
                text: "09:30 called midwife".to_string(),
            },
        );
        assert_eq!(
            notes(&mut session, NotesAction::Show),
            "08:40 waters broke\n09:30 called midwife\n"
        );
        session.finish().unwrap();

        let mut session = session_in(temp.path());
        assert_eq!(
            notes(
                &mut session,
                NotesAction::Set {
                    text: String::new()
                }
            ),
            "Notes saved (0 characters).\n"
        );
        assert_eq!(notes(&mut session, NotesAction::Show), "No notes.\n");
    }
}
