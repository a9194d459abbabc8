//! Shared tests for storage backends.
//!
//! This module provides a generic test suite that can be run against any
//! `StorageBackend` implementation to verify correct behavior.
//!
//! Note: These tests use simple text keys (e.g., `b"test_put_get_key"`) rather
//! than real chain data. Backends that depend on specific key widths should add
//! their own tests with realistic keys.

use crate::api::{StorageBackend, TableFlags};
use crate::backend::InMemoryBackend;

/// A table with one value per key.
pub const PLAIN_TABLE: &str = "TestPlain";
/// A DupSort table.
pub const DUP_TABLE: &str = "TestDup";

/// An in-memory backend with [`PLAIN_TABLE`] and [`DUP_TABLE`].
pub fn test_backend() -> InMemoryBackend {
    let backend = InMemoryBackend::new();
    backend.create_table(PLAIN_TABLE, TableFlags::DEFAULT);
    backend.create_table(DUP_TABLE, TableFlags::DUP_SORT);
    backend
}

/// Run the full test suite against a backend.
///
/// The backend must already contain [`PLAIN_TABLE`] and [`DUP_TABLE`].
pub fn run_backend_tests(backend: &dyn StorageBackend) {
    test_put_and_get(backend);
    test_delete(backend);
    test_prefix_iterator(backend);
    test_nonexistent_key(backend);
    test_unknown_table(backend);
    test_delete_then_put(backend);
    test_put_then_delete(backend);
    test_multiple_tables(backend);
    test_seek(backend);
    test_dup_values(backend);
    test_delete_dup(backend);
}

fn test_put_and_get(backend: &dyn StorageBackend) {
    // Write data
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![(b"test_put_get_key".to_vec(), b"value1".to_vec())],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    // Read data
    {
        let view = backend.begin_read().unwrap();
        let value = view.get(PLAIN_TABLE, b"test_put_get_key").unwrap();
        assert_eq!(value, Some(b"value1".to_vec()));
    }
}

fn test_delete(backend: &dyn StorageBackend) {
    // Write data
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![(b"test_delete_key".to_vec(), b"value1".to_vec())],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    // Delete data
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .delete_batch(PLAIN_TABLE, vec![b"test_delete_key".to_vec()])
            .unwrap();
        batch.commit().unwrap();
    }

    // Verify deleted
    {
        let view = backend.begin_read().unwrap();
        let value = view.get(PLAIN_TABLE, b"test_delete_key").unwrap();
        assert_eq!(value, None);
    }
}

fn test_prefix_iterator(backend: &dyn StorageBackend) {
    // Write data with common prefix
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![
                    (b"test_prefix:b".to_vec(), b"2".to_vec()),
                    (b"test_prefix:a".to_vec(), b"1".to_vec()),
                    (b"test_other:x".to_vec(), b"3".to_vec()),
                ],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    // Query by prefix; results come back in key order
    {
        let view = backend.begin_read().unwrap();
        let results: Vec<_> = view
            .prefix_iterator(PLAIN_TABLE, b"test_prefix:")
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(&*results[0].0, b"test_prefix:a");
        assert_eq!(&*results[1].0, b"test_prefix:b");
    }
}

fn test_nonexistent_key(backend: &dyn StorageBackend) {
    let view = backend.begin_read().unwrap();
    let value = view.get(PLAIN_TABLE, b"test_nonexistent_key_12345").unwrap();
    assert_eq!(value, None);
}

fn test_unknown_table(backend: &dyn StorageBackend) {
    let view = backend.begin_read().unwrap();
    assert!(view.get("TestMissingTable", b"key").is_err());
    drop(view);

    let mut batch = backend.begin_write().unwrap();
    batch
        .put_batch("TestMissingTable", vec![(b"key".to_vec(), b"value".to_vec())])
        .unwrap();
    assert!(batch.commit().is_err());
}

fn test_delete_then_put(backend: &dyn StorageBackend) {
    // Initial value
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![(b"test_del_put_key".to_vec(), b"old".to_vec())],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    // Delete then put in same batch - put should win
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .delete_batch(PLAIN_TABLE, vec![b"test_del_put_key".to_vec()])
            .unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![(b"test_del_put_key".to_vec(), b"new".to_vec())],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    let view = backend.begin_read().unwrap();
    assert_eq!(
        view.get(PLAIN_TABLE, b"test_del_put_key").unwrap(),
        Some(b"new".to_vec())
    );
}

fn test_put_then_delete(backend: &dyn StorageBackend) {
    // Put then delete in same batch - delete should win
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![(b"test_put_del_key".to_vec(), b"value".to_vec())],
            )
            .unwrap();
        batch
            .delete_batch(PLAIN_TABLE, vec![b"test_put_del_key".to_vec()])
            .unwrap();
        batch.commit().unwrap();
    }

    let view = backend.begin_read().unwrap();
    assert_eq!(view.get(PLAIN_TABLE, b"test_put_del_key").unwrap(), None);
}

fn test_multiple_tables(backend: &dyn StorageBackend) {
    // Write to different tables
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![(b"test_multi_key".to_vec(), b"plain".to_vec())],
            )
            .unwrap();
        batch
            .put_batch(
                DUP_TABLE,
                vec![(b"test_multi_key".to_vec(), b"dup".to_vec())],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    // Verify isolation
    {
        let view = backend.begin_read().unwrap();
        assert_eq!(
            view.get(PLAIN_TABLE, b"test_multi_key").unwrap(),
            Some(b"plain".to_vec())
        );
        assert_eq!(
            view.get(DUP_TABLE, b"test_multi_key").unwrap(),
            Some(b"dup".to_vec())
        );
    }
}

fn test_seek(backend: &dyn StorageBackend) {
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                PLAIN_TABLE,
                vec![
                    (b"test_seek:10".to_vec(), b"a".to_vec()),
                    (b"test_seek:30".to_vec(), b"b".to_vec()),
                ],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    let view = backend.begin_read().unwrap();
    assert_eq!(
        view.seek(PLAIN_TABLE, b"test_seek:20").unwrap(),
        Some((b"test_seek:30".to_vec(), b"b".to_vec()))
    );
    assert_eq!(
        view.seek(PLAIN_TABLE, b"test_seek:10").unwrap(),
        Some((b"test_seek:10".to_vec(), b"a".to_vec()))
    );
    assert_eq!(view.seek(PLAIN_TABLE, b"zzzz").unwrap(), None);
}

fn test_dup_values(backend: &dyn StorageBackend) {
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                DUP_TABLE,
                vec![
                    (b"test_dup_key".to_vec(), b"c".to_vec()),
                    (b"test_dup_key".to_vec(), b"a".to_vec()),
                    (b"test_dup_key".to_vec(), b"b".to_vec()),
                    (b"test_dup_key".to_vec(), b"a".to_vec()),
                ],
            )
            .unwrap();
        batch.commit().unwrap();
    }

    let view = backend.begin_read().unwrap();
    // Duplicates are kept sorted and deduplicated
    let values: Vec<_> = view
        .prefix_iterator(DUP_TABLE, b"test_dup_key")
        .unwrap()
        .map(|res| res.unwrap().1.to_vec())
        .collect();
    assert_eq!(values, [b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

    assert_eq!(
        view.get(DUP_TABLE, b"test_dup_key").unwrap(),
        Some(b"a".to_vec())
    );
    assert_eq!(
        view.seek_both_range(DUP_TABLE, b"test_dup_key", b"bb").unwrap(),
        Some(b"c".to_vec())
    );
    assert_eq!(
        view.seek_both_range(DUP_TABLE, b"test_dup_key", b"d").unwrap(),
        None
    );
}

fn test_delete_dup(backend: &dyn StorageBackend) {
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .put_batch(
                DUP_TABLE,
                vec![
                    (b"test_del_dup_key".to_vec(), b"x".to_vec()),
                    (b"test_del_dup_key".to_vec(), b"y".to_vec()),
                ],
            )
            .unwrap();
        batch
            .delete_dup(DUP_TABLE, b"test_del_dup_key".to_vec(), b"x".to_vec())
            .unwrap();
        batch.commit().unwrap();
    }

    {
        let view = backend.begin_read().unwrap();
        assert_eq!(
            view.get(DUP_TABLE, b"test_del_dup_key").unwrap(),
            Some(b"y".to_vec())
        );
    }

    // Deleting the key removes every value
    {
        let mut batch = backend.begin_write().unwrap();
        batch
            .delete_batch(DUP_TABLE, vec![b"test_del_dup_key".to_vec()])
            .unwrap();
        batch.commit().unwrap();
    }

    let view = backend.begin_read().unwrap();
    assert_eq!(view.get(DUP_TABLE, b"test_del_dup_key").unwrap(), None);
}
