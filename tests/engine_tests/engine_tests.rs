//! Tests for engine command routing and validation

use std::sync::Arc;
use std::thread;

use msgsync::protocol::{Command, Status};
use msgsync::sink::MemorySink;
use msgsync::{Config, Engine, Record, SyncError, SyncReport};
use tempfile::TempDir;

use super::{delete, open_engine, post, put, send};

// =============================================================================
// Status Codes
// =============================================================================

#[test]
fn test_create_returns_created() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);

    assert_eq!(send(&engine, post("a", "alice", "hi", 0, None)), 201);
    assert_eq!(engine.record_count(), 1);
    assert_eq!(engine.pending(), 1);
}

#[test]
fn test_duplicate_create_conflicts() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);

    assert_eq!(send(&engine, post("x", "first", "E", 0, None)), 201);
    assert_eq!(send(&engine, post("x", "second", "E2", 0, None)), 409);
    assert_eq!(engine.pending(), 1);

    engine.sync().unwrap();
    assert_eq!(sink.lines(), vec!["x,first,E,0,".to_string()]);
}

#[test]
fn test_update_and_delete_missing_not_found() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);

    assert_eq!(send(&engine, put("ghost", "a", "m", 0, true, None)), 404);
    assert_eq!(send(&engine, delete("ghost")), 404);
    assert_eq!(engine.pending(), 0);
}

#[test]
fn test_update_and_delete_no_content() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);

    send(&engine, post("a", "alice", "hi", 0, None));
    assert_eq!(send(&engine, put("a", "alice", "edited", 1, false, None)), 204);
    assert_eq!(send(&engine, delete("a")), 204);
    assert_eq!(send(&engine, delete("a")), 404);
    assert_eq!(engine.pending(), 3);
}

#[test]
fn test_invalid_record_is_bad_request() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);

    assert_eq!(send(&engine, post("", "alice", "hi", 0, None)), 400);
    assert_eq!(send(&engine, post("a", "al,ice", "hi", 0, None)), 400);
    assert_eq!(send(&engine, post("a", "alice", "two\nlines", 0, None)), 400);
    assert_eq!(engine.record_count(), 0);
    assert_eq!(engine.pending(), 0);

    send(&engine, post("a", "alice", "hi", 0, None));
    assert_eq!(
        send(&engine, put("a", "alice", "hi", 0, true, Some("bad,image"))),
        400
    );
    assert_eq!(engine.pending(), 1);
}

// =============================================================================
// Reads
// =============================================================================

#[test]
fn test_get_reflects_accepted_mutations_before_sync() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);

    send(&engine, post("a", "alice", "hi", 0, Some("pic")));
    send(&engine, put("a", "alice", "edited", 5, false, None));

    let record = engine.get("a").unwrap();
    assert_eq!(record.message, "edited");
    assert_eq!(record.likes, 5);
    assert_eq!(record.image.as_deref(), Some("pic"));
    assert!(sink.rows().is_empty());
}

#[test]
fn test_get_command_payload() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);
    send(&engine, post("a", "alice", "hi", 2, None));

    let response = engine.execute(Command::Get { id: "a".to_string() }).unwrap();
    assert_eq!(response.status, Status::Ok);
    let record: Record = bincode::deserialize(&response.payload.unwrap()).unwrap();
    assert_eq!(record, Record::new("a", "alice", "hi", 2, None));

    let missing = engine.execute(Command::Get { id: "b".to_string() }).unwrap();
    assert_eq!(missing.status, Status::NotFound);
}

#[test]
fn test_list_is_id_ordered() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);
    for id in ["c", "a", "b"] {
        send(&engine, post(id, "x", "m", 0, None));
    }

    let ids: Vec<_> = engine.list().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_ping_and_sync_commands() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);
    send(&engine, post("a", "alice", "hi", 0, None));

    let pong = engine.execute(Command::Ping).unwrap();
    assert_eq!(pong.payload_text().as_deref(), Some("PONG"));

    let response = engine.execute(Command::Sync).unwrap();
    let report: SyncReport = bincode::deserialize(&response.payload.unwrap()).unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(report.rows_written, 1);
}

// =============================================================================
// Sync Passes
// =============================================================================

#[test]
fn test_empty_sync_is_noop() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);

    let report = engine.sync().unwrap();

    assert!(report.is_idle());
    assert_eq!(sink.write_count(), 0);
}

#[test]
fn test_sink_failure_keeps_batch_cached() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);
    send(&engine, post("a", "alice", "hi", 0, None));
    send(&engine, post("b", "bob", "yo", 0, None));

    sink.set_failing(true);
    assert!(matches!(engine.sync(), Err(SyncError::SinkWrite(_))));
    assert_eq!(engine.pending(), 2);
    assert!(sink.rows().is_empty());

    // Mutations keep being accepted while the sink is down
    send(&engine, delete("a"));

    sink.set_failing(false);
    let report = engine.sync().unwrap();
    assert_eq!(report.applied, 3);
    assert_eq!(sink.lines(), vec!["b,bob,yo,0,".to_string()]);
}

#[test]
fn test_sync_failure_status_is_server_error() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 10, &sink);
    send(&engine, post("a", "alice", "hi", 0, None));
    sink.set_failing(true);

    assert_eq!(send(&engine, Command::Sync), 500);
}

#[test]
fn test_sync_all_drains_every_batch() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = open_engine(&temp, 3, &sink);
    for i in 0..8 {
        send(&engine, post(&format!("r{}", i), "x", "m", i, None));
    }

    let report = engine.sync_all().unwrap();

    assert_eq!(report.applied, 8);
    assert_eq!(report.remaining, 0);
    assert_eq!(sink.rows().len(), 8);
    assert_eq!(sink.write_count(), 3);
}

#[test]
fn test_zero_batch_capacity_rejected() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .batch_capacity(0)
        .build();

    assert!(matches!(Engine::open(config), Err(SyncError::Config(_))));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_creates_same_id_single_winner() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(open_engine(&temp, 10, &sink));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || send(&engine, post("same", &format!("t{}", t), "m", 0, None)))
        })
        .collect();
    let codes: Vec<u16> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(codes.iter().filter(|&&c| c == 201).count(), 1);
    assert_eq!(codes.iter().filter(|&&c| c == 409).count(), 7);
    assert_eq!(engine.pending(), 1);
}

#[test]
fn test_sync_concurrent_with_mutations() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(open_engine(&temp, 7, &sink));

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..25 {
                    let id = format!("{}-{:02}", t, i);
                    assert_eq!(send(&engine, post(&id, "x", "m", 0, None)), 201);
                }
            })
        })
        .collect();
    let syncer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..20 {
                engine.sync().unwrap();
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    syncer.join().unwrap();
    engine.sync_all().unwrap();

    assert_eq!(engine.pending(), 0);
    assert_eq!(sink.rows().len(), 100);
    let ids: Vec<_> = engine.list().into_iter().map(|r| r.id).collect();
    let synced: Vec<_> = sink.rows().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, synced);
}
