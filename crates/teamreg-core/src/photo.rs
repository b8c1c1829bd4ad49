// Photo attachments: boundary validation of chosen files and asynchronous
// preview decoding keyed by slot identity.
//
// Each selection spawns one tokio task that encodes the image into a `data:`
// URL. Completions come back over an mpsc channel tagged with the slot's
// `SlotId` and the selection generation, so a completion can only land on the
// slot it was issued for, and only if no newer selection superseded it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::PhotoError;
use crate::roster::{PhotoTicket, RosterBuilder, SlotId};

// ---------------------------------------------------------------------------
// Boundary types
// ---------------------------------------------------------------------------

/// A file exactly as a file-selection input produced it, before any checks.
#[derive(Debug, Clone)]
pub struct ChosenFile {
    pub name: String,
    /// MIME type declared by the browser (may be empty).
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl ChosenFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        ChosenFile {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Validate into an [`ImageFile`]. Only the declared type is checked;
    /// the bytes are not sniffed.
    pub fn image(self) -> Result<ImageFile, PhotoError> {
        let mime = self.declared_type.trim().to_ascii_lowercase();
        if !is_image_type(&mime) {
            return Err(PhotoError::NotAnImage {
                declared_type: self.declared_type,
            });
        }
        if self.bytes.is_empty() {
            return Err(PhotoError::Empty);
        }
        Ok(ImageFile {
            file_name: self.name,
            mime_type: mime,
            bytes: Arc::from(self.bytes),
        })
    }
}

/// `image/<subtype>` with a non-empty subtype token, parameters allowed.
fn is_image_type(mime: &str) -> bool {
    let Some(rest) = mime.strip_prefix("image/") else {
        return false;
    };
    let subtype = rest.split(';').next().unwrap_or_default().trim();
    !subtype.is_empty() && !subtype.contains(|c: char| c.is_whitespace() || c == '/')
}

/// A validated image. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    file_name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A displayable preview of an image (`data:<mime>;base64,<body>`).
#[derive(Clone, PartialEq, Eq)]
pub struct Preview(String);

impl Preview {
    pub fn encode(file: &ImageFile) -> Preview {
        Preview(format!(
            "data:{};base64,{}",
            file.mime_type(),
            STANDARD.encode(file.bytes())
        ))
    }

    pub fn as_data_url(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Data URLs are large; show only the header.
        let header = self.0.split(',').next().unwrap_or_default();
        write!(f, "Preview({header},…)")
    }
}

/// Completion of one preview decode. `preview` is `None` when decoding failed.
#[derive(Debug, Clone)]
pub struct PreviewReady {
    pub slot: SlotId,
    pub generation: u64,
    pub preview: Option<Preview>,
}

// ---------------------------------------------------------------------------
// PhotoAttachmentManager
// ---------------------------------------------------------------------------

/// Owns the in-flight preview tasks for one roster form.
///
/// Dropping the manager aborts every outstanding task.
pub struct PhotoAttachmentManager {
    tx: mpsc::UnboundedSender<PreviewReady>,
    rx: mpsc::UnboundedReceiver<PreviewReady>,
    tasks: HashMap<SlotId, (u64, JoinHandle<()>)>,
}

impl PhotoAttachmentManager {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        PhotoAttachmentManager {
            tx,
            rx,
            tasks: HashMap::new(),
        }
    }

    /// Attach `file` to the slot at `index` and start decoding its preview.
    ///
    /// Non-image files are rejected before anything changes. A previous
    /// decode still running for the same slot is aborted.
    pub fn select_photo(
        &mut self,
        roster: &mut RosterBuilder,
        index: usize,
        file: ChosenFile,
    ) -> Result<PhotoTicket, PhotoError> {
        let image = match file.image() {
            Ok(image) => image,
            Err(e) => {
                warn!(index, "rejected photo selection: {e}");
                return Err(e);
            }
        };

        let ticket = roster.attach_photo(index, image.clone())?;
        self.spawn_decode(ticket, image);
        Ok(ticket)
    }

    fn spawn_decode(&mut self, ticket: PhotoTicket, image: ImageFile) {
        if let Some((_, previous)) = self.tasks.remove(&ticket.slot) {
            previous.abort();
        }

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let preview = match tokio::task::spawn_blocking(move || Preview::encode(&image)).await
            {
                Ok(preview) => Some(preview),
                Err(e) => {
                    warn!(slot = %ticket.slot, "preview decode failed: {e}");
                    None
                }
            };
            // Receiver gone means the form was torn down.
            let _ = tx.send(PreviewReady {
                slot: ticket.slot,
                generation: ticket.generation,
                preview,
            });
        });
        self.tasks.insert(ticket.slot, (ticket.generation, handle));
    }

    /// Abort the decode for a slot, e.g. after the slot was removed.
    pub fn cancel(&mut self, slot: SlotId) {
        if let Some((_, handle)) = self.tasks.remove(&slot) {
            debug!(%slot, "cancelled preview decode");
            handle.abort();
        }
    }

    /// Abort every outstanding decode.
    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Number of decodes that have not reported back yet.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    fn finish(&mut self, ready: &PreviewReady) {
        let current = self
            .tasks
            .get(&ready.slot)
            .is_some_and(|(generation, _)| *generation == ready.generation);
        if current {
            self.tasks.remove(&ready.slot);
        }
    }

    /// Apply every completion that has already arrived. Returns how many
    /// previews were written.
    pub fn drain_ready(&mut self, roster: &mut RosterBuilder) -> usize {
        let mut applied = 0;
        while let Ok(ready) = self.rx.try_recv() {
            self.finish(&ready);
            if roster.apply_preview(ready) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next completion and apply it. Returns `None` when no
    /// decode is outstanding.
    pub async fn apply_next(&mut self, roster: &mut RosterBuilder) -> Option<bool> {
        if self.tasks.is_empty() {
            return None;
        }
        let ready = self.rx.recv().await?;
        self.finish(&ready);
        Some(roster.apply_preview(ready))
    }

    /// Wait until every outstanding decode has reported back, applying each.
    pub async fn settle(&mut self, roster: &mut RosterBuilder) {
        while self.apply_next(roster).await.is_some() {}
    }
}

impl Default for PhotoAttachmentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PhotoAttachmentManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
