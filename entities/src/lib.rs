// sea-orm entities backing the tracker's persistent store

pub mod kv_entry;
