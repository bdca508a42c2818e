//! Property tests for the queue naming protocol
//!
//! File names are the only carrier of entry state, so two properties must hold
//! for any timestamps the downloader can produce:
//! 1. an entry name parses back to exactly the range it was built from
//! 2. sorting names sorts entries by `range_end`

use chrono::{TimeZone, Utc};
use osmsync_queue::{QueueDirs, QueueEntry, ReplicationCursor, ReplicationTimestamp};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

// 1970-01-01 .. 9999-12-31
const MAX_SECS: i64 = 253_402_300_799;

fn timestamp(secs: i64) -> ReplicationTimestamp {
    ReplicationTimestamp::from_datetime(Utc.timestamp_opt(secs, 0).unwrap())
}

proptest! {
    #[test]
    fn entry_name_round_trips(start in 0i64..MAX_SECS, len in 0i64..10_000_000) {
        let end = (start + len).min(MAX_SECS);
        let (start, end) = (timestamp(start), timestamp(end));

        let name = QueueEntry::file_name(&start, &end);
        let parsed = QueueEntry::parse_file_name(&name).unwrap();
        prop_assert_eq!(parsed, (start, end));
    }

    #[test]
    fn name_order_is_time_order(a in 0i64..MAX_SECS, b in 0i64..MAX_SECS) {
        let (a, b) = (timestamp(a), timestamp(b));
        prop_assert_eq!(a.cmp(&b), a.to_string().cmp(&b.to_string()));
    }
}

#[test]
fn contiguous_chain_derives_cursor_from_newest_entry() {
    let tmp = TempDir::new().unwrap();
    let dirs = QueueDirs::new(tmp.path().join("queue"), tmp.path().join("done"));
    fs::create_dir(dirs.queue_dir()).unwrap();
    fs::create_dir(dirs.done_dir()).unwrap();

    let days: Vec<ReplicationTimestamp> = (0..5)
        .map(|d| timestamp(1_672_531_200 + d * 86_400))
        .collect();

    // Written out of order on purpose
    for i in [3usize, 0, 2, 1] {
        fs::write(dirs.queue_dir().join(QueueEntry::file_name(&days[i], &days[i + 1])), b"x").unwrap();
    }

    let pending = dirs.pending().unwrap();
    let ends: Vec<_> = pending.iter().map(QueueEntry::range_end).collect();
    assert_eq!(ends, days[1..].to_vec());

    for pair in pending.windows(2) {
        assert_eq!(pair[0].range_end(), pair[1].range_start());
    }

    let cursor = ReplicationCursor::from_queue(&dirs).unwrap().unwrap();
    assert_eq!(cursor.timestamp, days[4]);
}
