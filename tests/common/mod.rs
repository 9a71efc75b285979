#![allow(dead_code)]

use nyaya_rag::{vector::l2_norm, Embed, Result};
use std::net::TcpListener;
use std::path::Path;

pub const DIM: usize = 384;

/// Deterministic stand-in for the sentence model: a normalized bag of
/// lowercase words, each word hashed (FNV-1a) into one of `DIM` buckets.
/// Texts sharing more words end up closer together.
pub struct BagOfWords;

impl BagOfWords {
    fn bucket(word: &str) -> usize {
        let mut hash: u32 = 0x811c9dc5;
        for byte in word.bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x01000193);
        }
        hash as usize % DIM
    }
}

impl Embed for BagOfWords {
    fn dimension(&self) -> usize {
        DIM
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; DIM];
                for word in text
                    .to_lowercase()
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    v[Self::bucket(word)] += 1.0;
                }
                l2_norm(&v).unwrap_or(v)
            })
            .collect())
    }
}

pub const CLAUSES: &[(&str, &str)] = &[
    ("1", "A contract requires offer and acceptance between the parties."),
    ("3", "Breach of contract occurs when a party fails to perform its obligations."),
    ("4", "Negligence is the failure to take reasonable care."),
    ("5", "A tenant must pay rent on the agreed date."),
    ("6", "The court may grant an injunction to restrain a nuisance."),
    ("7", "An employer is vicariously liable for acts of employees."),
    ("8", "A will must be signed in the presence of two witnesses."),
    ("9", "Consideration must move from the promisee."),
];

/// Writes a CSV with an `id,text` header.
pub fn write_csv(path: &Path, rows: &[(&str, &str)]) {
    let mut wtr = String::from("id,text\n");
    for (id, text) in rows {
        wtr.push_str(&format!("{},\"{}\"\n", id, text.replace('"', "\"\"")));
    }
    std::fs::write(path, wtr).unwrap();
}

/// Find a free port by binding to port 0
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
