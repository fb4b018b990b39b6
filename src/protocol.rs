//! Addon wire format.
//!
//! A message is `<prefix>\t<payload>`. Payloads:
//!
//! * `SYNC:<entry>,<count>;<entry>,<count>...` full vault contents (`SYNC:` when empty)
//! * `UPD:<entry>,<count>` item now holds `count`
//! * `DEL:<entry>` item is gone from the vault
//!
//! Messages longer than the byte budget are split between records, never inside one, and
//! every chunk repeats the prefix and the payload header. Counts are absolute, so chunks can
//! be applied independently and in any order.

use crate::models::types::ItemEntry;
use std::collections::BTreeMap;
use thiserror::Error;

mod mirror;

pub use mirror::VaultMirror;

pub const SEPARATOR: char = '\t';
const RECORD_DELIMITER: char = ';';

/// Longest payload header (`SYNC:`)
const MAX_HEADER_LEN: usize = 5;
/// Longest single record, `<u32>,<u32>`
pub const MAX_RECORD_LEN: usize = 21;

/// Smallest budget under which every chunk for `prefix` still fits, whatever the records hold.
pub fn min_message_len(prefix: &str) -> usize {
    prefix.len() + SEPARATOR.len_utf8() + MAX_HEADER_LEN + MAX_RECORD_LEN
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultMessage {
    Sync(Vec<(ItemEntry, u32)>),
    Update { entry: ItemEntry, count: u32 },
    Delete { entry: ItemEntry },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("missing separator")]
    MissingSeparator,

    #[error("unexpected prefix '{0}'")]
    WrongPrefix(String),

    #[error("unknown message kind '{0}'")]
    UnknownKind(String),

    #[error("malformed record '{0}'")]
    MalformedRecord(String),
}

impl VaultMessage {
    pub fn sync(snapshot: &BTreeMap<ItemEntry, u32>) -> Self {
        VaultMessage::Sync(snapshot.iter().map(|(e, c)| (*e, *c)).collect())
    }

    /// The record for an item that now holds `count` (a zero count means it was removed).
    pub fn for_count(entry: ItemEntry, count: u32) -> Self {
        if count == 0 {
            VaultMessage::Delete { entry }
        } else {
            VaultMessage::Update { entry, count }
        }
    }

    pub fn encode(&self) -> String {
        match self {
            VaultMessage::Sync(records) => {
                let body: Vec<String> = records.iter().map(|(e, c)| format!("{e},{c}")).collect();
                format!("SYNC:{}", body.join(";"))
            }
            VaultMessage::Update { entry, count } => format!("UPD:{entry},{count}"),
            VaultMessage::Delete { entry } => format!("DEL:{entry}"),
        }
    }

    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        let (kind, body) = payload
            .split_once(':')
            .ok_or_else(|| ProtocolError::UnknownKind(payload.to_string()))?;

        match kind {
            "SYNC" => body
                .split(RECORD_DELIMITER)
                .filter(|r| !r.is_empty())
                .map(parse_record)
                .collect::<Result<Vec<_>, _>>()
                .map(VaultMessage::Sync),
            "UPD" => {
                let (entry, count) = parse_record(body)?;
                Ok(VaultMessage::Update { entry, count })
            }
            "DEL" => {
                let entry = body
                    .parse()
                    .map_err(|_| ProtocolError::MalformedRecord(body.to_string()))?;
                Ok(VaultMessage::Delete { entry })
            }
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

fn parse_record(record: &str) -> Result<(ItemEntry, u32), ProtocolError> {
    let malformed = || ProtocolError::MalformedRecord(record.to_string());
    let (entry, count) = record.split_once(',').ok_or_else(malformed)?;
    let entry = entry.parse::<ItemEntry>().map_err(|_| malformed())?;
    let count = count.parse::<u32>().map_err(|_| malformed())?;
    Ok((entry, count))
}

/// Packs payloads into prefixed messages that fit the per-message byte budget.
#[derive(Debug, Clone)]
pub struct AddonFramer {
    prefix: String,
    max_len: usize,
}

impl AddonFramer {
    pub fn new(prefix: impl Into<String>, max_len: usize) -> Self {
        Self {
            prefix: prefix.into(),
            max_len,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn frame_message(&self, message: &VaultMessage) -> Vec<String> {
        self.frame(&message.encode())
    }

    pub fn frame(&self, payload: &str) -> Vec<String> {
        let full = format!("{}{SEPARATOR}{payload}", self.prefix);
        if full.len() <= self.max_len {
            return vec![full];
        }

        let Some(header_end) = payload.find(':') else {
            tracing::warn!(len = full.len(), budget = self.max_len, "unstructured addon payload truncated");
            return vec![truncate_at_char_boundary(full, self.max_len)];
        };

        let (header, body) = payload.split_at(header_end + 1);
        let route = format!("{}{SEPARATOR}{header}", self.prefix);

        let mut chunks = Vec::new();
        let mut chunk = route.clone();
        for record in body.split(RECORD_DELIMITER).filter(|r| !r.is_empty()) {
            let has_records = chunk.len() > route.len();
            if has_records && chunk.len() + 1 + record.len() > self.max_len {
                chunks.push(std::mem::replace(&mut chunk, route.clone()));
            }

            if chunk.len() > route.len() {
                chunk.push(RECORD_DELIMITER);
            } else if route.len() + record.len() > self.max_len {
                tracing::warn!(record, budget = self.max_len, "single addon record exceeds budget");
            }
            chunk.push_str(record);
        }

        if chunk.len() > route.len() {
            chunks.push(chunk);
        }
        chunks
    }

    /// Client side: recover the payload of one received message.
    pub fn decode(&self, message: &str) -> Result<VaultMessage, ProtocolError> {
        let (prefix, payload) = message.split_once(SEPARATOR).ok_or(ProtocolError::MissingSeparator)?;
        if prefix != self.prefix {
            return Err(ProtocolError::WrongPrefix(prefix.to_string()));
        }
        VaultMessage::parse(payload)
    }
}

fn truncate_at_char_boundary(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framer() -> AddonFramer {
        AddonFramer::new("ABYS", 240)
    }

    fn records(n: u32) -> BTreeMap<ItemEntry, u32> {
        (0..n).map(|i| (ItemEntry(10_000 + i), 1 + i * 7)).collect()
    }

    #[test]
    fn small_messages_are_sent_whole() {
        let f = framer();
        assert_eq!(f.frame_message(&VaultMessage::Sync(Vec::new())), vec!["ABYS\tSYNC:"]);
        assert_eq!(
            f.frame_message(&VaultMessage::Update { entry: ItemEntry(2589), count: 40 }),
            vec!["ABYS\tUPD:2589,40"]
        );
        assert_eq!(f.frame_message(&VaultMessage::Delete { entry: ItemEntry(2589) }), vec!["ABYS\tDEL:2589"]);
    }

    #[test]
    fn exact_budget_is_not_split() {
        let f = AddonFramer::new("ABYS", "ABYS\tUPD:2589,40".len());
        assert_eq!(f.frame("UPD:2589,40").len(), 1);
    }

    #[test]
    fn large_sync_is_chunked_between_records() {
        let f = framer();
        let snapshot = records(60);
        let original = VaultMessage::sync(&snapshot);
        assert!(original.encode().len() + 5 > f.max_len());

        let chunks = f.frame_message(&original);
        assert!(chunks.len() > 1);

        let mut seen = Vec::new();
        for chunk in &chunks {
            assert!(chunk.len() <= f.max_len(), "chunk over budget: {}", chunk.len());
            assert!(chunk.starts_with("ABYS\tSYNC:"));
            match f.decode(chunk).unwrap() {
                VaultMessage::Sync(recs) => {
                    assert!(!recs.is_empty());
                    seen.extend(recs);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        assert_eq!(VaultMessage::Sync(seen), original);
    }

    #[test]
    fn chunks_are_packed_greedily() {
        let f = AddonFramer::new("ABYS", 32);
        // "ABYS\tSYNC:" is 10 bytes, each record "1000x,5" is 7 bytes
        let payload = "SYNC:10001,5;10002,5;10003,5;10004,5";
        let chunks = f.frame(payload);
        assert_eq!(chunks, vec!["ABYS\tSYNC:10001,5;10002,5", "ABYS\tSYNC:10003,5;10004,5"]);
    }

    #[test]
    fn smallest_valid_budget_keeps_every_chunk_in_bounds() {
        let prefix = "ABYSSAL_STORAGE_SYNC_CHANNEL";
        let budget = min_message_len(prefix);
        let f = AddonFramer::new(prefix, budget);

        let snapshot: BTreeMap<ItemEntry, u32> = (0..5).map(|i| (ItemEntry(u32::MAX - i), u32::MAX)).collect();
        let chunks = f.frame_message(&VaultMessage::sync(&snapshot));
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.len() <= budget), "{chunks:?}");
        assert!(chunks.iter().any(|c| c.len() == budget));
    }

    #[test]
    fn unstructured_payload_is_truncated() {
        let f = AddonFramer::new("ABYS", 32);
        let chunks = f.frame(&"x".repeat(100));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 32);
        assert!(chunks[0].starts_with("ABYS\txxx"));
    }

    #[test]
    fn decode_rejects_garbage() {
        let f = framer();
        assert_eq!(f.decode("ABYS SYNC:"), Err(ProtocolError::MissingSeparator));
        assert_eq!(f.decode("OTHR\tSYNC:"), Err(ProtocolError::WrongPrefix("OTHR".into())));
        assert_eq!(f.decode("ABYS\tPING:1"), Err(ProtocolError::UnknownKind("PING".into())));
        assert_eq!(
            f.decode("ABYS\tUPD:12"),
            Err(ProtocolError::MalformedRecord("12".into()))
        );
    }

    #[test]
    fn payload_split_uses_first_separator_only() {
        let f = framer();
        // Tabs after the first belong to the payload and make it malformed, not re-routed
        assert!(matches!(f.decode("ABYS\tDEL:1\t2"), Err(ProtocolError::MalformedRecord(_))));
    }

    #[test]
    fn for_count_picks_delete_at_zero() {
        assert_eq!(VaultMessage::for_count(ItemEntry(3), 0), VaultMessage::Delete { entry: ItemEntry(3) });
        assert_eq!(
            VaultMessage::for_count(ItemEntry(3), 2),
            VaultMessage::Update { entry: ItemEntry(3), count: 2 }
        );
    }
}
