use std::sync::OnceLock;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::dom::document::Document;
use crate::error::FormResult;
use crate::extract::page_model::{ButtonDescriptor, FieldDescriptor, FieldOptions, UploadKind};
use crate::profile::Profile;
use crate::resolve::decision::FieldOutcome;
use crate::resolve::interact::Interactor;

// ============================================================================
// Picker queue
// ============================================================================

#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

/// FIFO ticket lock. Callers are served in the order they asked.
#[derive(Debug, Default)]
pub struct TicketLock {
    tickets: Mutex<Tickets>,
    turn: Condvar,
}

/// Held while the OS file picker belongs to one caller.
pub struct PickerTurn<'a> {
    lock: &'a TicketLock,
    pub ticket: u64,
}

impl TicketLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every earlier ticket has been released.
    pub fn acquire(&self) -> PickerTurn<'_> {
        let mut tickets = self.tickets.lock();
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            self.turn.wait(&mut tickets);
        }
        debug!(ticket, "file picker acquired");
        PickerTurn { lock: self, ticket }
    }
}

impl Drop for PickerTurn<'_> {
    fn drop(&mut self) {
        let mut tickets = self.lock.tickets.lock();
        tickets.serving += 1;
        self.lock.turn.notify_all();
        debug!(ticket = self.ticket, "file picker released");
    }
}

/// The one picker queue shared by every session in the process.
pub fn picker_queue() -> &'static TicketLock {
    static QUEUE: OnceLock<TicketLock> = OnceLock::new();
    QUEUE.get_or_init(TicketLock::new)
}

// ============================================================================
// Uploads
// ============================================================================

fn file_name_shown(doc: &Document, name: &str) -> bool {
    doc.page_text().contains(name)
}

fn through_picker(io: &mut Interactor<'_>, locator: &str, path: &str) -> FormResult<()> {
    let _turn = picker_queue().acquire();
    io.browser().choose_file(locator, path)
}

/// Attach the resume (or, for a required field, whatever the profile has)
/// to a file input. The file is set directly; if the page does not show it
/// afterwards, the picker is used.
pub fn upload_field(
    io: &mut Interactor<'_>,
    field: &FieldDescriptor,
    locator: &str,
    profile: &Profile,
) -> FormResult<FieldOutcome> {
    let kind = match field.options {
        FieldOptions::Upload { upload } => upload,
        _ => UploadKind::Other,
    };
    if kind == UploadKind::Other && !field.required {
        info!(label = field.display_label(), "optional upload skipped");
        return Ok(FieldOutcome::Skipped);
    }
    let (Some(path), Some(name)) = (profile.resume_path(), profile.resume_file_name()) else {
        warn!("profile has no resume path");
        return Ok(if field.required {
            FieldOutcome::Failed("no resume in profile".to_string())
        } else {
            FieldOutcome::Skipped
        });
    };

    let doc = io.capture_now()?;
    if file_name_shown(&doc, &name) {
        info!(file = %name, "file already uploaded");
        return Ok(FieldOutcome::Skipped);
    }

    io.browser().set_files(locator, &path)?;
    let doc = io.capture()?;
    let attached = io.browser().locate(locator)?.value.is_some_and(|v| v.contains(&name));
    if attached || file_name_shown(&doc, &name) {
        info!(file = %name, "file attached");
        return Ok(FieldOutcome::Resolved);
    }

    warn!(file = %name, "direct attach not reflected in page, using the file picker");
    through_picker(io, locator, &path)?;
    Ok(FieldOutcome::Resolved)
}

/// Upload through a button that opens the OS picker. Only resume buttons are
/// answered; others are skipped.
pub fn upload_button(
    io: &mut Interactor<'_>,
    button: &ButtonDescriptor,
    locator: &str,
    profile: &Profile,
) -> FormResult<FieldOutcome> {
    if button.name.as_deref() != Some("Resume") {
        debug!(text = button.display_text(), "non-resume upload button skipped");
        return Ok(FieldOutcome::Skipped);
    }
    let (Some(path), Some(name)) = (profile.resume_path(), profile.resume_file_name()) else {
        return Ok(FieldOutcome::Failed("no resume in profile".to_string()));
    };
    let doc = io.capture_now()?;
    if file_name_shown(&doc, &name) {
        return Ok(FieldOutcome::Skipped);
    }
    through_picker(io, locator, &path)?;
    info!(file = %name, "resume queued through the file picker");
    Ok(FieldOutcome::Resolved)
}
