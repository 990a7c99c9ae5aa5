use crate::store::entry::Entry;
use crate::store::DataStore;
use crate::types::list::LineList;
use crate::types::rstring::LineString;
use crate::types::Value;
use std::io::{self, Read, Write};

const MAGIC: &[u8] = b"LKV1";
const VERSION: u8 = 1;

const OP_SELECTDB: u8 = 0xFE;
const OP_EXPIRETIME_MS: u8 = 0xFC;

const TYPE_STRING: u8 = 0;
const TYPE_LIST: u8 = 1;

/// Dump the store to `path`, atomically (temp file + rename) so readers
/// never observe a partially-written snapshot (spec §4.F).
pub fn save(store: &DataStore, path: &str) -> io::Result<()> {
    let tmp_path = format!("{path}.tmp");
    let mut file = std::fs::File::create(&tmp_path)?;
    save_to_writer(&mut file, store)?;
    file.flush()?;
    drop(file);
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn save_to_writer(w: &mut impl Write, store: &DataStore) -> io::Result<()> {
    w.write_all(MAGIC)?;
    w.write_all(&[VERSION])?;

    for (db_index, db) in store.databases.iter().enumerate() {
        let entries: Vec<_> = db.iter().collect();
        if entries.is_empty() {
            continue;
        }

        w.write_all(&[OP_SELECTDB])?;
        write_length(w, db_index as u64)?;

        for (key, entry) in entries {
            if let Some(exp) = entry.expires_at {
                w.write_all(&[OP_EXPIRETIME_MS])?;
                w.write_all(&exp.to_le_bytes())?;
            }

            match &entry.value {
                Value::String(s) => {
                    w.write_all(&[TYPE_STRING])?;
                    write_string(w, key.as_bytes())?;
                    write_string(w, s.as_str().as_bytes())?;
                }
                Value::List(list) => {
                    w.write_all(&[TYPE_LIST])?;
                    write_string(w, key.as_bytes())?;
                    let items: Vec<_> = list.iter().collect();
                    write_length(w, items.len() as u64)?;
                    for item in items {
                        write_string(w, item.as_bytes())?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Load a snapshot from `path`. All-or-nothing: any parse failure bubbles
/// up as an `io::Error`; the caller falls back to an empty store and logs
/// a warning (spec §4.F) rather than installing partial state.
pub fn load(path: &str, num_databases: usize) -> io::Result<DataStore> {
    let mut file = std::fs::File::open(path)?;
    load_from_reader(&mut file, num_databases)
}

fn load_from_reader(r: &mut impl Read, num_databases: usize) -> io::Result<DataStore> {
    let mut store = DataStore::new(num_databases);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != *MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "bad snapshot magic"));
    }
    let mut version = [0u8; 1];
    r.read_exact(&mut version)?;

    let mut current_db = 0usize;
    let mut pending_expiry: Option<u64> = None;

    loop {
        let mut op = [0u8; 1];
        if r.read_exact(&mut op).is_err() {
            break;
        }

        match op[0] {
            OP_SELECTDB => {
                current_db = read_length(r)? as usize;
                if current_db >= num_databases {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "db index out of range"));
                }
            }
            OP_EXPIRETIME_MS => {
                let mut buf = [0u8; 8];
                r.read_exact(&mut buf)?;
                pending_expiry = Some(u64::from_le_bytes(buf));
            }
            type_byte => {
                let key = read_string_as_string(r)?;
                let value = read_value(r, type_byte)?;
                let mut entry = Entry::new(value);
                if let Some(exp) = pending_expiry.take() {
                    entry.expires_at = Some(exp);
                }
                store.db(current_db).set(key, entry);
            }
        }
    }

    Ok(store)
}

fn write_length(w: &mut impl Write, len: u64) -> io::Result<()> {
    if len < 64 {
        w.write_all(&[len as u8])
    } else if len < 16384 {
        w.write_all(&[0x40 | (len >> 8) as u8, len as u8])
    } else {
        w.write_all(&[0x80])?;
        w.write_all(&(len as u32).to_be_bytes())
    }
}

fn write_string(w: &mut impl Write, data: &[u8]) -> io::Result<()> {
    write_length(w, data.len() as u64)?;
    w.write_all(data)
}

fn read_length(r: &mut impl Read) -> io::Result<u64> {
    let mut byte = [0u8; 1];
    r.read_exact(&mut byte)?;
    match byte[0] >> 6 {
        0 => Ok((byte[0] & 0x3F) as u64),
        1 => {
            let mut next = [0u8; 1];
            r.read_exact(&mut next)?;
            Ok((((byte[0] & 0x3F) as u64) << 8) | next[0] as u64)
        }
        2 => {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            Ok(u32::from_be_bytes(buf) as u64)
        }
        _ => Err(io::Error::new(io::ErrorKind::InvalidData, "unsupported length encoding")),
    }
}

fn read_string(r: &mut impl Read) -> io::Result<Vec<u8>> {
    let len = read_length(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_string_as_string(r: &mut impl Read) -> io::Result<String> {
    String::from_utf8(read_string(r)?).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn read_value(r: &mut impl Read, type_byte: u8) -> io::Result<Value> {
    match type_byte {
        TYPE_STRING => {
            let data = read_string_as_string(r)?;
            Ok(Value::String(LineString::new(data)))
        }
        TYPE_LIST => {
            let len = read_length(r)?;
            let mut list = LineList::new();
            for _ in 0..len {
                list.rpush(read_string_as_string(r)?);
            }
            Ok(Value::List(list))
        }
        other => Err(io::Error::new(io::ErrorKind::InvalidData, format!("unknown value type byte: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_string_and_list() {
        let mut store = DataStore::new(2);
        store.db(0).set("greeting".to_string(), Entry::new(Value::String(LineString::new("hi".to_string()))));
        let mut list = LineList::new();
        list.rpush("a".to_string());
        list.rpush("b".to_string());
        store.db(1).set("L".to_string(), Entry::new(Value::List(list)));

        let mut buf = Vec::new();
        save_to_writer(&mut buf, &store).unwrap();
        let mut cursor = io::Cursor::new(buf);
        let loaded = load_from_reader(&mut cursor, 2).unwrap();

        assert_eq!(loaded.databases[0].peek("greeting").unwrap().value.as_string().unwrap().as_str(), "hi");
        let list = loaded.databases[1].peek("L").unwrap().value.as_list().unwrap();
        let items: Vec<&str> = list.iter().map(|s| s.as_str()).collect();
        assert_eq!(items, vec!["a", "b"]);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut cursor = io::Cursor::new(b"nope".to_vec());
        assert!(load_from_reader(&mut cursor, 1).is_err());
    }

    #[test]
    fn preserves_expiry() {
        let mut store = DataStore::new(1);
        store.db(0).set("k".to_string(), Entry::with_expiry(Value::String(LineString::new("v".to_string())), 123456));

        let mut buf = Vec::new();
        save_to_writer(&mut buf, &store).unwrap();
        let mut cursor = io::Cursor::new(buf);
        let loaded = load_from_reader(&mut cursor, 1).unwrap();

        assert_eq!(loaded.databases[0].iter().next().unwrap().1.expires_at, Some(123456));
    }
}
