use super::*;

fn png(name: &str, len: usize) -> FileCandidate {
    FileCandidate::new(name, "image/png", vec![0x89; len])
}

#[test]
fn accepts_image_candidates() {
    let mut slot = FileSlot::new();
    let handle = slot
        .select(png("sig.png", 2048), &SizePolicy::default())
        .expect("select png")
        .clone();

    assert!(slot.is_populated());
    assert_eq!(handle.name(), "sig.png");
    assert_eq!(handle.mime_type(), "image/png");
    assert_eq!(handle.size_bytes(), 2048);
    assert_eq!(slot.file(), Some(&handle));
}

#[test]
fn non_image_selection_leaves_slot_unchanged() {
    let mut slot = FileSlot::new();
    let original = slot
        .select(png("first.png", 10), &SizePolicy::default())
        .expect("select png")
        .clone();

    for mime_type in ["application/pdf", "text/plain", "", "video/png", "imagex/png"] {
        let err = slot
            .select(
                FileCandidate::new("doc", mime_type, b"payload".to_vec()),
                &SizePolicy::default(),
            )
            .expect_err("non-image must be rejected");
        assert!(
            matches!(err, SlotError::InvalidFileType { .. }),
            "unexpected error for {mime_type:?}: {err:?}"
        );
        assert_eq!(slot.file(), Some(&original));
    }
}

#[test]
fn empty_slot_stays_empty_after_rejection() {
    let mut slot = FileSlot::new();
    let _ = slot.select(
        FileCandidate::new("notes.txt", "text/plain", b"hi".to_vec()),
        &SizePolicy::default(),
    );
    assert!(!slot.is_populated());
}

#[test]
fn mime_check_ignores_case_and_whitespace() {
    assert!(is_image_mime("IMAGE/JPEG"));
    assert!(is_image_mime(" image/webp"));
    assert!(!is_image_mime("application/octet-stream"));
}

#[test]
fn reselect_replaces_the_handle() {
    let mut slot = FileSlot::new();
    let first = slot
        .select(png("a.png", 1), &SizePolicy::default())
        .expect("first")
        .clone();
    let second = slot
        .select(png("a.png", 1), &SizePolicy::default())
        .expect("second")
        .clone();

    assert_ne!(first, second);
    assert_eq!(slot.file(), Some(&second));
}

#[test]
fn clear_is_idempotent() {
    let mut slot = FileSlot::new();
    slot.select(png("a.png", 1), &SizePolicy::default())
        .expect("select");

    assert!(slot.clear().is_some());
    assert!(slot.clear().is_none());
    assert!(!slot.is_populated());
}

#[test]
fn advisory_size_limit_accepts_large_files() {
    let policy = SizePolicy {
        limit_bytes: 100,
        enforce: false,
    };
    let mut slot = FileSlot::new();
    let handle = slot.select(png("big.png", 101), &policy).expect("accepted");
    assert!(policy.exceeds(handle.size_bytes()));
}

#[test]
fn enforced_size_limit_rejects_large_files() {
    let policy = SizePolicy {
        limit_bytes: 100,
        enforce: true,
    };
    let mut slot = FileSlot::new();
    let err = slot
        .select(png("big.png", 101), &policy)
        .expect_err("too large");
    assert_eq!(
        err,
        SlotError::FileTooLarge {
            name: "big.png".into(),
            size_bytes: 101,
            limit_bytes: 100,
        }
    );
    assert!(!slot.is_populated());

    slot.select(png("ok.png", 100), &policy)
        .expect("at the limit is fine");
}
