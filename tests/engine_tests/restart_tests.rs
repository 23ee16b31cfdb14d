//! Tests for engine restart and recovery

use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use msgsync::protocol::Command;
use msgsync::sink::{MemorySink, SinkRow, TabularSink};
use msgsync::{Config, Engine, Record, Result, SyncError};
use tempfile::TempDir;

use super::{delete, open_engine, post, put, send};

#[test]
fn test_pending_mutations_survive_restart() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    {
        let engine = open_engine(&temp, 100, &sink);
        send(&engine, post("a", "x", "m", 0, None));
        send(&engine, post("b", "x", "m", 0, None));
        engine.sync().unwrap();
        send(&engine, post("c", "x", "m", 0, None));
        send(&engine, put("a", "x", "edited", 1, false, None));
    }

    let engine = open_engine(&temp, 100, &sink);

    assert_eq!(engine.pending(), 2);
    assert_eq!(engine.record_count(), 3);
    assert_eq!(engine.get("a").unwrap().message, "edited");

    // Validation sees both the sink rows and the pending mutations
    assert_eq!(send(&engine, post("b", "x", "m", 0, None)), 409);
    assert_eq!(send(&engine, post("c", "x", "m", 0, None)), 409);

    engine.sync().unwrap();
    assert_eq!(
        sink.lines(),
        vec![
            "a,x,edited,1,".to_string(),
            "b,x,m,0,".to_string(),
            "c,x,m,0,".to_string(),
        ]
    );
}

#[test]
fn test_committed_mutations_not_reapplied_after_restart() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    {
        let engine = open_engine(&temp, 100, &sink);
        send(&engine, post("a", "x", "m", 0, None));
        send(&engine, delete("a"));
        engine.sync().unwrap();
    }

    let engine = open_engine(&temp, 100, &sink);

    assert_eq!(engine.pending(), 0);
    assert!(engine.get("a").is_none());
    assert!(engine.sync().unwrap().is_idle());
}

#[test]
fn test_partial_drain_remainder_survives_restart() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    {
        let engine = open_engine(&temp, 2, &sink);
        for id in ["a", "b", "c", "d", "e"] {
            send(&engine, post(id, "x", "m", 0, None));
        }
        engine.sync().unwrap();
    }

    let engine = open_engine(&temp, 2, &sink);
    assert_eq!(engine.pending(), 3);

    engine.sync_all().unwrap();
    let ids: Vec<_> = sink.rows().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn test_csv_engine_rebuilds_from_sink_file() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp.path()).build();
    {
        let engine = Engine::open(config.clone()).unwrap();
        send(&engine, post("a", "x", "hello, world", 3, Some("pic")));
        engine.sync().unwrap();
    }

    let engine = Engine::open(config).unwrap();

    let record = engine.get("a").unwrap();
    assert_eq!(record.message, "hello, world");
    assert_eq!(record.image.as_deref(), Some("pic"));
    assert_eq!(engine.pending(), 0);
}

#[test]
fn test_torn_cache_tail_after_crash() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(MemorySink::new());
    let cache_path = {
        let engine = open_engine(&temp, 100, &sink);
        send(&engine, post("a", "x", "m", 0, None));
        send(&engine, post("b", "x", "m", 0, None));
        engine.cache_path().to_path_buf()
    };

    // Simulate a crash in the middle of the next append
    let mut file = fs::OpenOptions::new().append(true).open(&cache_path).unwrap();
    file.write_all(&[0x07; 11]).unwrap();
    drop(file);

    let engine = open_engine(&temp, 100, &sink);

    assert_eq!(engine.pending(), 2);
    assert_eq!(send(&engine, post("c", "x", "m", 0, None)), 201);
    engine.sync().unwrap();
    assert_eq!(sink.rows().len(), 3);
}

/// Sink whose writes land but are reported as failed, like a crash between
/// the sink write and the cache commit
#[derive(Default)]
struct LostAckSink {
    rows: MemorySink,
    lose_ack: AtomicBool,
}

impl TabularSink for LostAckSink {
    fn load(&self) -> Result<Vec<SinkRow>> {
        self.rows.load()
    }

    fn replace(&self, rows: &[SinkRow]) -> Result<()> {
        self.rows.replace(rows)?;
        if self.lose_ack.load(Ordering::SeqCst) {
            return Err(SyncError::SinkWrite("acknowledgement lost".to_string()));
        }
        Ok(())
    }
}

fn open_with(dir: &TempDir, sink: &Arc<LostAckSink>) -> Engine {
    let config = Config::builder().data_dir(dir.path()).build();
    let sink: Arc<dyn TabularSink> = Arc::<LostAckSink>::clone(sink);
    Engine::with_sink(config, sink).unwrap()
}

#[test]
fn test_replayed_batch_after_uncommitted_sink_write() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(LostAckSink::default());
    {
        let engine = open_with(&temp, &sink);
        send(&engine, post("a", "x", "m1", 1, Some("p")));
        send(&engine, put("a", "x", "m2", 1, false, None));
        send(&engine, post("b", "x", "m", 0, None));
        send(&engine, delete("b"));

        sink.lose_ack.store(true, Ordering::SeqCst);
        assert!(matches!(engine.sync(), Err(SyncError::SinkWrite(_))));
    }
    let written = sink.rows.lines();
    assert_eq!(written, vec!["a,x,m2,1,p".to_string()]);

    sink.lose_ack.store(false, Ordering::SeqCst);
    let engine = open_with(&temp, &sink);

    assert_eq!(engine.pending(), 4);
    assert_eq!(engine.get("a").unwrap().message, "m2");
    assert!(engine.get("b").is_none());

    let report = engine.sync().unwrap();
    assert_eq!(report.applied, 4);
    assert_eq!(sink.rows.lines(), written);
    assert_eq!(engine.pending(), 0);
}

#[test]
fn test_empty_image_reads_the_same_after_restart() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp.path()).build();
    let before = {
        let engine = Engine::open(config.clone()).unwrap();
        let record = Record {
            id: "a".to_string(),
            author: "x".to_string(),
            message: "m".to_string(),
            likes: 0,
            image: Some(String::new()),
        };
        assert_eq!(send(&engine, Command::Create { record }), 201);
        send(&engine, post("b", "x", "m", 0, Some("pic")));
        send(&engine, put("b", "x", "m", 0, true, Some("")));
        engine.sync().unwrap();
        (engine.get("a"), engine.get("b"))
    };

    assert_eq!(before.0.as_ref().unwrap().image, None);
    assert_eq!(before.1.as_ref().unwrap().image, None);

    let engine = Engine::open(config).unwrap();
    assert_eq!((engine.get("a"), engine.get("b")), before);
}
