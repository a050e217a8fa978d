#![allow(clippy::unwrap_used, clippy::expect_used)]

use zipsync_core::diff::{
    ChangeKind, DiffMessage, EditOperation, IndexPath, RawChange, SectionChange,
};
use zipsync_core::ZipSyncError;
use zipsync_engine::DiffWorker;

#[test]
fn test_batches_arrive_whole_and_in_order() {
    // GIVEN a running diff worker
    let worker = DiffWorker::<String>::spawn().unwrap();

    // WHEN a batch with a moved row and a new section is sent
    worker.begin_batch().unwrap();
    worker
        .push(RawChange::moved(
            IndexPath::new(0, 0),
            IndexPath::new(0, 2),
            "row".to_string(),
        ))
        .unwrap();
    worker.push_section(SectionChange::Insert(1)).unwrap();
    worker.end_batch().unwrap();

    // THEN one edit list arrives with update, move and the section insert
    let batch = worker.recv_batch().unwrap();
    assert_eq!(
        batch,
        vec![
            EditOperation::Update {
                at: IndexPath::new(0, 0),
                payload: "row".to_string()
            },
            EditOperation::Move {
                from: IndexPath::new(0, 0),
                to: IndexPath::new(0, 2)
            },
            EditOperation::InsertSection { index: 1 },
        ]
    );
    assert_eq!(worker.finish().unwrap(), 1);
}

#[test]
fn test_change_source_on_another_thread() {
    let worker = DiffWorker::<u32>::spawn().unwrap();
    let sender = worker.sender();

    let source = std::thread::spawn(move || {
        for n in 0..3 {
            sender.send(DiffMessage::BeginBatch).unwrap();
            sender
                .send(DiffMessage::Change(RawChange::insert(IndexPath::new(0, 0), n)))
                .unwrap();
            sender.send(DiffMessage::EndBatch).unwrap();
        }
    });
    source.join().unwrap();

    for n in 0..3 {
        assert_eq!(
            worker.recv_batch().unwrap(),
            vec![EditOperation::Insert {
                at: IndexPath::new(0, 0),
                payload: n
            }]
        );
    }
    assert_eq!(worker.finish().unwrap(), 3);
}

#[test]
fn test_unfinished_batch_is_not_delivered() {
    let worker = DiffWorker::<u32>::spawn().unwrap();
    worker.begin_batch().unwrap();
    worker
        .push(RawChange::delete(IndexPath::new(0, 1), 9))
        .unwrap();

    assert_eq!(worker.finish().unwrap(), 0);
}

#[test]
fn test_malformed_change_stops_the_emitter() {
    // GIVEN an insert notification without any position
    let worker = DiffWorker::<u32>::spawn().unwrap();
    worker.begin_batch().unwrap();
    worker
        .push(RawChange {
            kind: ChangeKind::Insert,
            old: None,
            new: None,
            payload: 1,
        })
        .unwrap();

    // THEN the emitter thread fails and reports it on finish
    assert!(matches!(
        worker.finish(),
        Err(ZipSyncError::WorkerUnavailable { .. })
    ));
}
