//! End-to-end attachment flow tests against a mock upload service.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageBuffer, ImageFormat, Rgba};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::models::{
    FileId, FileMetadata, ResourceCategory, PROGRESS_DIMENSIONS_EXTRACTED, PROGRESS_PERSISTED,
    PROGRESS_REGISTERED,
};
use crate::preview::PreviewSource;
use crate::session::{AttachmentSession, FileSelection};
use crate::upload::{UploadReceipt, UploadRequest, UploadService};

/// Upload service double: acknowledges uploads with deterministic ids,
/// optionally holding or failing specific file names.
#[derive(Default)]
struct MockUploadService {
    acknowledged: AtomicUsize,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<UploadRequest>>,
}

impl MockUploadService {
    fn gate(&self, file_name: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Arc::clone(&notify));
        notify
    }

    fn fail(&self, file_name: &str) {
        self.failing.lock().unwrap().insert(file_name.to_string());
    }

    fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn acknowledged(&self) -> usize {
        self.acknowledged.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UploadService for MockUploadService {
    async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.gates.lock().unwrap().get(&request.file_name).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().unwrap().contains(&request.file_name) {
            return Err(Error::Transport(format!(
                "Upload failed with HTTP 502: {}",
                request.file_name
            )));
        }

        self.acknowledged.fetch_add(1, Ordering::SeqCst);
        Ok(UploadReceipt {
            temp_file_id: request.provisional_id.to_string(),
            file_id: FileId::from(format!("srv-{}", request.file_name)),
            filepath: format!("/uploads/user-1/{}", request.file_name),
        })
    }
}

fn session_with(service: &Arc<MockUploadService>) -> AttachmentSession {
    // Opt-in test logging via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let service: Arc<dyn UploadService> = service.clone();
    AttachmentSession::new(service, "agents")
}

fn text_selection(name: &str, category: Option<ResourceCategory>) -> FileSelection {
    FileSelection {
        file_name: name.to_string(),
        content_type: Some("text/plain".to_string()),
        bytes: b"plain text payload".to_vec(),
        category,
    }
}

fn png_selection(name: &str, width: u32, height: u32) -> FileSelection {
    let pixels = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_fn(width, height, |_x, _y| {
        Rgba([120, 90, 240, 255])
    });
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();

    FileSelection {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes: cursor.into_inner(),
        category: None,
    }
}

#[tokio::test]
async fn png_walks_every_milestone() {
    let service = Arc::new(MockUploadService::default());
    let gate = service.gate("photo.png");
    let session = session_with(&service);
    let mut snapshots = session.subscribe();

    let task = session.attach(png_selection("photo.png", 64, 48)).unwrap();

    // Registered immediately, before any async work.
    let records = session.snapshot();
    let first = &records[0];
    assert_eq!(first.progress, PROGRESS_REGISTERED);
    assert_eq!(first.width, None);
    assert_eq!(first.height, None);
    assert!(first.preview.is_some());

    // Dimensions land at the intermediate milestone while the submission is
    // still gated.
    snapshots
        .wait_for(|records| {
            records
                .first()
                .is_some_and(|record| record.progress >= PROGRESS_DIMENSIONS_EXTRACTED)
        })
        .await
        .unwrap();
    let records = session.snapshot();
    let probed = &records[0];
    assert_eq!(probed.progress, PROGRESS_DIMENSIONS_EXTRACTED);
    assert_eq!(probed.width, Some(64));
    assert_eq!(probed.height, Some(48));
    assert!(!probed.persisted);

    gate.notify_one();
    task.wait().await.unwrap();

    let records = session.snapshot();
    let done = &records[0];
    assert_eq!(done.progress, PROGRESS_PERSISTED);
    assert!(done.persisted);
    assert_eq!(done.file_id, Some(FileId::from("srv-photo.png")));
    assert_eq!(done.stored_path, "/uploads/user-1/photo.png");
    assert!(done.payload.is_none());

    // The submission carried the extracted dimensions.
    let requests = service.requests();
    let request = &requests[0];
    assert_eq!(request.width, Some(64));
    assert_eq!(request.height, Some(48));
}

#[tokio::test]
async fn text_file_skips_dimension_milestone() {
    let service = Arc::new(MockUploadService::default());
    let session = session_with(&service);

    let task = session
        .attach(text_selection("notes.txt", Some(ResourceCategory::Search)))
        .unwrap();
    task.wait().await.unwrap();

    let records = session.snapshot();
    let record = &records[0];
    assert_eq!(record.progress, PROGRESS_PERSISTED);
    assert_eq!(record.width, None);
    assert_eq!(record.height, None);

    let requests = service.requests();
    let request = &requests[0];
    assert_eq!(request.width, None);
    assert_eq!(request.tool_resource, Some(ResourceCategory::Search));

    let resources = session.tool_resources();
    assert_eq!(
        resources.get(ResourceCategory::Search).unwrap().file_ids,
        vec![FileId::from("srv-notes.txt")]
    );
}

#[tokio::test]
async fn out_of_order_completions_never_swap_identifiers() {
    let service = Arc::new(MockUploadService::default());
    let gate = service.gate("first.txt");
    let session = session_with(&service);

    let first = session.attach(text_selection("first.txt", None)).unwrap();
    let second = session.attach(text_selection("second.txt", None)).unwrap();

    // The second pipeline finishes while the first is still gated.
    second.wait().await.unwrap();
    let records = session.snapshot();
    assert_eq!(records[0].progress, PROGRESS_REGISTERED);
    assert_eq!(records[1].file_id, Some(FileId::from("srv-second.txt")));

    gate.notify_one();
    first.wait().await.unwrap();

    let records = session.snapshot();
    assert_eq!(records[0].display_name, "first.txt");
    assert_eq!(records[0].file_id, Some(FileId::from("srv-first.txt")));
    assert_eq!(records[1].file_id, Some(FileId::from("srv-second.txt")));
    assert!(session.all_ready());
}

#[tokio::test]
async fn registry_id_set_tracks_attach_and_detach() {
    let service = Arc::new(MockUploadService::default());
    let session = session_with(&service);

    let kept = session.attach(text_selection("kept.txt", None)).unwrap();
    let dropped = session.attach(text_selection("dropped.txt", None)).unwrap();
    let handles: HashSet<_> = session
        .snapshot()
        .into_iter()
        .map(|record| record.handle)
        .collect();
    assert_eq!(handles, HashSet::from([kept.handle, dropped.handle]));

    assert!(session.detach(dropped.handle));
    assert!(!session.detach(dropped.handle));

    let kept_handle = kept.handle;
    kept.wait().await.unwrap();
    let _ = dropped.wait().await;

    let remaining: Vec<_> = session.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].handle, kept_handle);
}

#[tokio::test]
async fn late_completion_after_detach_is_dropped() {
    let service = Arc::new(MockUploadService::default());
    let gate = service.gate("racy.txt");
    let session = session_with(&service);

    let task = session.attach(text_selection("racy.txt", None)).unwrap();
    assert!(session.detach(task.handle));

    gate.notify_one();
    task.wait().await.unwrap();

    assert!(session.snapshot().is_empty());
    assert_eq!(service.acknowledged(), 1);
}

#[tokio::test]
async fn transport_failure_leaves_record_for_retry() {
    let service = Arc::new(MockUploadService::default());
    service.fail("flaky.txt");
    let session = session_with(&service);

    let task = session.attach(text_selection("flaky.txt", None)).unwrap();
    let error = task.wait().await.unwrap_err();
    assert!(matches!(error, Error::Transport(_)));

    let records = session.snapshot();
    let record = &records[0];
    assert_eq!(record.progress, PROGRESS_REGISTERED);
    assert!(record.file_id.is_none());
    assert!(record.payload.is_some());
    assert!(!session.all_ready());
    assert_eq!(session.stats().uploading, 1);
}

#[tokio::test]
async fn abort_signals_in_flight_submissions_without_rollback() {
    let service = Arc::new(MockUploadService::default());
    let _held_forever = service.gate("stuck.txt");
    let session = session_with(&service);

    let task = session.attach(text_selection("stuck.txt", None)).unwrap();
    session.abort_uploads();

    let error = task.wait().await.unwrap_err();
    assert!(matches!(error, Error::Cancelled(_)));

    // The partially-registered record survives for manual retry or discard.
    let records = session.snapshot();
    assert_eq!(records[0].progress, PROGRESS_REGISTERED);

    // A fresh attach after the abort proceeds normally.
    let retry = session.attach(text_selection("after.txt", None)).unwrap();
    retry.wait().await.unwrap();
    assert_eq!(session.stats().uploading, 1);
}

#[tokio::test]
async fn attach_rejects_oversized_payload() {
    let service = Arc::new(MockUploadService::default());
    let session = session_with(&service).with_max_upload_bytes(4);

    let error = session
        .attach(text_selection("big.txt", None))
        .unwrap_err();
    assert!(matches!(error, Error::InvalidInput(_)));
    assert!(session.snapshot().is_empty());
}

#[tokio::test]
async fn all_ready_agrees_with_stats() {
    let service = Arc::new(MockUploadService::default());
    let session = session_with(&service);
    assert!(session.all_ready());

    let tasks = session
        .attach_all(vec![
            text_selection("a.txt", None),
            png_selection("b.png", 8, 8),
        ])
        .unwrap();
    for task in tasks {
        task.wait().await.unwrap();
    }

    let stats = session.stats();
    assert_eq!(stats.uploading, 0);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.images, 1);
    assert_eq!(stats.documents, 1);
    assert!(session.all_ready());
}

#[tokio::test]
async fn restore_round_trips_through_session() {
    let service = Arc::new(MockUploadService::default());
    let session = session_with(&service);

    let task = session
        .attach(text_selection("doc.txt", Some(ResourceCategory::Search)))
        .unwrap();
    task.wait().await.unwrap();
    let persisted = session.tool_resources();

    let mut lookup = HashMap::new();
    lookup.insert(
        FileId::from("srv-doc.txt"),
        FileMetadata {
            file_id: FileId::from("srv-doc.txt"),
            filename: "doc.txt".to_string(),
            mime_type: "text/plain".to_string(),
            byte_size: 18,
            filepath: "/uploads/user-1/doc.txt".to_string(),
            width: None,
            height: None,
        },
    );

    let other = session_with(&service);
    other.restore(&persisted, &lookup, &NeverResolves).await;

    assert!(other.all_ready());
    assert_eq!(other.tool_resources(), persisted);
    assert_eq!(other.snapshot()[0].display_name, "doc.txt");
}

#[tokio::test]
async fn reset_releases_previews_and_empties_registry() {
    let service = Arc::new(MockUploadService::default());
    let session = session_with(&service);

    let task = session.attach(png_selection("photo.png", 8, 8)).unwrap();
    task.wait().await.unwrap();

    let preview = session.snapshot()[0].preview.clone().unwrap();
    assert!(matches!(
        preview.source(),
        Some(PreviewSource::Memory { .. })
    ));

    session.reset();
    assert!(session.snapshot().is_empty());
    assert!(preview.is_released());
}

struct NeverResolves;

#[async_trait]
impl crate::media::BlobResolver for NeverResolves {
    async fn resolve(&self, _file_id: &FileId) -> Option<crate::preview::PreviewRef> {
        None
    }
}
